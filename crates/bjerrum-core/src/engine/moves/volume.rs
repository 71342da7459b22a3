use super::{MoveError, MoveStatistics, TrialMove};
use crate::core::models::group::GroupKind;
use crate::core::models::space::{Frame, Space};
use crate::core::stats::Average;
use crate::engine::hamiltonian::{ExternalEnergy, Hamiltonian};
use rand::Rng;
use rand::rngs::StdRng;

/// Isobaric volume move.
///
/// Displaces the volume log-uniformly, `V' = exp(ln V + delta dV)` with
/// delta drawn from [-1/2, 1/2], and rescales coordinates so fractional
/// positions are invariant: atomic groups rescale every particle, molecular
/// groups translate rigidly with their rescaled mass center. Constructing
/// the move registers the external pressure term with the Hamiltonian, so
/// the energy change carries the pV work and the ideal-gas volume terms
/// through the full system energy.
#[derive(Debug, Clone)]
pub struct Isobaric {
    volume_displacement: f64,
    run_fraction: f64,
    old_volume: f64,
    new_volume: f64,
    statistics: MoveStatistics,
    average_volume: Average,
}

impl Isobaric {
    /// `pressure` in kT per cubic angstrom.
    pub fn new(volume_displacement: f64, pressure: f64, hamiltonian: &mut Hamiltonian) -> Self {
        hamiltonian.add_external(ExternalEnergy::Pressure { pressure });
        Self {
            volume_displacement,
            run_fraction: 1.0,
            old_volume: 0.0,
            new_volume: 0.0,
            statistics: MoveStatistics::default(),
            average_volume: Average::new(),
        }
    }

    pub fn with_run_fraction(mut self, run_fraction: f64) -> Self {
        self.run_fraction = run_fraction;
        self
    }

    /// Volume proposed by the current trial.
    pub fn trial_volume(&self) -> f64 {
        self.new_volume
    }

    pub fn average_volume(&self) -> &Average {
        &self.average_volume
    }
}

impl TrialMove for Isobaric {
    fn label(&self) -> &'static str {
        "volume"
    }

    fn run_fraction(&self) -> f64 {
        self.run_fraction
    }

    fn statistics(&self) -> &MoveStatistics {
        &self.statistics
    }

    fn statistics_mut(&mut self) -> &mut MoveStatistics {
        &mut self.statistics
    }

    fn propose(&mut self, space: &mut Space, rng: &mut StdRng) -> Result<(), MoveError> {
        self.old_volume = space.geometry.volume();
        self.new_volume =
            (self.old_volume.ln() + rng.gen_range(-0.5..0.5) * self.volume_displacement).exp();

        for g in 0..space.groups.len() {
            let group = &space.groups[g];
            match group.kind {
                GroupKind::Atomic => {
                    for i in group.range.clone() {
                        space.trial[i].position = space.geometry.scale_position(
                            &space.particles[i].position,
                            self.old_volume,
                            self.new_volume,
                        );
                    }
                }
                GroupKind::Molecular => {
                    let cm = group.cm;
                    let cm_scaled =
                        space
                            .geometry
                            .scale_position(&cm, self.old_volume, self.new_volume);
                    let shift = cm_scaled - cm;
                    for i in group.range.clone() {
                        space.trial[i].position = space.particles[i].position + shift;
                    }
                    space.groups[g].cm_trial = cm_scaled;
                }
            }
        }
        Ok(())
    }

    fn energy_change(&mut self, space: &mut Space, hamiltonian: &Hamiltonian) -> f64 {
        let u_old = hamiltonian.system_energy(space, Frame::Current);
        space.geometry.set_volume(self.new_volume);
        let u_new = hamiltonian.system_energy(space, Frame::Trial);
        u_new - u_old
    }

    fn accept(&mut self, space: &mut Space) {
        space.commit_all();
        let dv = self.new_volume - self.old_volume;
        self.statistics.mean_square_displacement.add(dv * dv);
        self.average_volume.add(self.new_volume);
    }

    fn reject(&mut self, space: &mut Space) {
        space.geometry.set_volume(self.old_volume);
        space.restore_all();
        self.average_volume.add(self.old_volume);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{Cuboid, Geometry};
    use crate::core::models::particle::Particle;
    use crate::core::models::species::{Species, SpeciesRegistry};
    use crate::core::potential::dispatch::PotentialMap;
    use crate::core::potential::pair::{HardSphere, PairPotential};
    use crate::engine::moves::perform;
    use nalgebra::Point3;
    use rand::SeedableRng;

    fn registry() -> SpeciesRegistry {
        let mut registry = SpeciesRegistry::new();
        registry
            .register(Species {
                name: "bead".into(),
                charge: 0.0,
                radius: 1.0,
                eps: 0.0,
                hydrophobic: false,
                alpha: 0.0,
                activity: None,
            })
            .unwrap();
        registry
    }

    fn mixed_space(registry: &SpeciesRegistry) -> Space {
        let mut space = Space::new(Geometry::Cuboid(Cuboid::cubic(30.0).unwrap()));
        let bead = registry.get(0).unwrap();
        space
            .enroll(
                "dimer",
                GroupKind::Molecular,
                vec![
                    Particle::from_species(0, bead, Point3::new(-1.5, 0.0, 0.0)),
                    Particle::from_species(0, bead, Point3::new(1.5, 0.0, 0.0)),
                ],
            )
            .unwrap();
        space
            .enroll(
                "gas",
                GroupKind::Atomic,
                vec![
                    Particle::from_species(0, bead, Point3::new(10.0, 0.0, 0.0)),
                    Particle::from_species(0, bead, Point3::new(0.0, 10.0, 0.0)),
                ],
            )
            .unwrap();
        space
    }

    #[test]
    fn accepted_trials_commit_the_proposed_volume_exactly() {
        let registry = registry();
        let mut space = mixed_space(&registry);
        let mut hamiltonian = Hamiltonian::new(PotentialMap::new(PairPotential::from(HardSphere)));
        let mut mv = Isobaric::new(0.2, 1e-4, &mut hamiltonian);
        let mut rng = StdRng::seed_from_u64(1);

        mv.propose(&mut space, &mut rng).unwrap();
        let proposed = mv.trial_volume();
        let _ = mv.energy_change(&mut space, &hamiltonian);
        mv.accept(&mut space);

        assert_eq!(space.geometry.volume(), proposed);
    }

    #[test]
    fn rejected_trials_restore_the_previous_volume_exactly() {
        let registry = registry();
        let mut space = mixed_space(&registry);
        let before = space.geometry.volume();
        let mut hamiltonian = Hamiltonian::new(PotentialMap::new(PairPotential::from(HardSphere)));
        let mut mv = Isobaric::new(0.2, 1e-4, &mut hamiltonian);
        let mut rng = StdRng::seed_from_u64(2);

        mv.propose(&mut space, &mut rng).unwrap();
        let _ = mv.energy_change(&mut space, &hamiltonian);
        mv.reject(&mut space);

        assert_eq!(space.geometry.volume(), before);
        assert_eq!(space.particles, space.trial);
    }

    #[test]
    fn molecular_groups_keep_internal_distances_under_volume_scaling() {
        let registry = registry();
        let mut space = mixed_space(&registry);
        let mut hamiltonian = Hamiltonian::new(PotentialMap::new(PairPotential::from(HardSphere)));
        let mut mv = Isobaric::new(0.3, 1e-4, &mut hamiltonian);
        let mut rng = StdRng::seed_from_u64(3);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 100).unwrap();

        let bond = space
            .geometry
            .dist(&space.particles[0].position, &space.particles[1].position);
        assert!((bond - 3.0).abs() < 1e-9);
        assert!(mv.statistics().accepted > 0);
    }

    #[test]
    fn volume_statistics_accumulate_over_the_run() {
        let registry = registry();
        let mut space = mixed_space(&registry);
        let mut hamiltonian = Hamiltonian::new(PotentialMap::new(PairPotential::from(HardSphere)));
        let mut mv = Isobaric::new(0.1, 1e-4, &mut hamiltonian);
        let mut rng = StdRng::seed_from_u64(4);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 50).unwrap();

        assert_eq!(mv.average_volume().count(), 50);
        assert!(mv.average_volume().avg() > 0.0);
    }
}
