use super::{AcceptanceMap, MoveError, MoveStatistics, TrialMove};
use crate::core::models::space::{Frame, Space};
use crate::core::models::species::SpeciesId;
use crate::engine::hamiltonian::Hamiltonian;
use nalgebra::Vector3;
use rand::Rng;
use rand::rngs::StdRng;

/// Translation of atomic particles.
///
/// Works in two modes: move one fixed particle set by [`set_particle`], or
/// move randomly selected particles of a group set by [`set_group`]. Move
/// directions can be masked per axis; to translate in the xy plane only,
/// zero the z component of `direction`.
///
/// [`set_particle`]: AtomicTranslation::set_particle
/// [`set_group`]: AtomicTranslation::set_group
#[derive(Debug, Clone)]
pub struct AtomicTranslation {
    displacement: f64,
    pub direction: Vector3<f64>,
    run_fraction: f64,
    group: Option<usize>,
    particle: Option<usize>,
    current: usize,
    statistics: MoveStatistics,
    per_species: AcceptanceMap<SpeciesId>,
}

impl AtomicTranslation {
    pub fn new(displacement: f64) -> Self {
        Self {
            displacement,
            direction: Vector3::new(1.0, 1.0, 1.0),
            run_fraction: 1.0,
            group: None,
            particle: None,
            current: usize::MAX,
            statistics: MoveStatistics::default(),
            per_species: AcceptanceMap::new(),
        }
    }

    pub fn with_run_fraction(mut self, run_fraction: f64) -> Self {
        self.run_fraction = run_fraction;
        self
    }

    /// Selects the group to randomly pick particles from.
    pub fn set_group(&mut self, group_index: usize) {
        self.group = Some(group_index);
        self.particle = None;
    }

    /// Selects one specific particle to move.
    pub fn set_particle(&mut self, particle_index: usize) {
        self.particle = Some(particle_index);
        self.group = None;
    }

    pub fn per_species(&self) -> &AcceptanceMap<SpeciesId> {
        &self.per_species
    }
}

impl TrialMove for AtomicTranslation {
    fn label(&self) -> &'static str {
        "translate"
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
        self.current = match (self.particle, self.group) {
            (Some(index), _) => index,
            (None, Some(group)) => space.groups[group].random_index(rng),
            (None, None) => return Err(MoveError::NoTarget(self.label())),
        };
        let delta = Vector3::new(
            self.displacement * rng.gen_range(-0.5..0.5) * self.direction.x,
            self.displacement * rng.gen_range(-0.5..0.5) * self.direction.y,
            self.displacement * rng.gen_range(-0.5..0.5) * self.direction.z,
        );
        space.trial[self.current].position += delta;
        space
            .geometry
            .boundary(&mut space.trial[self.current].position);
        Ok(())
    }

    fn energy_change(&mut self, space: &mut Space, hamiltonian: &Hamiltonian) -> f64 {
        let u_new = hamiltonian.particle_energy(space, Frame::Trial, self.current);
        if u_new.is_infinite() {
            return f64::INFINITY;
        }
        let u_old = hamiltonian.particle_energy(space, Frame::Current, self.current);
        u_new - u_old
    }

    fn accept(&mut self, space: &mut Space) {
        let moved = space
            .geometry
            .sqdist(
                &space.particles[self.current].position,
                &space.trial[self.current].position,
            );
        let species = space.particles[self.current].species;
        self.statistics.mean_square_displacement.add(moved);
        self.per_species.accept(species, moved);
        space.commit([self.current]);
    }

    fn reject(&mut self, space: &mut Space) {
        let species = space.particles[self.current].species;
        self.per_species.reject(species);
        space.restore([self.current]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{Cuboid, Geometry, Sphere};
    use crate::core::models::group::GroupKind;
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
                name: "ball".into(),
                charge: 0.0,
                radius: 2.0,
                eps: 0.0,
                hydrophobic: false,
                alpha: 0.0,
                activity: None,
            })
            .unwrap();
        registry
    }

    fn hard_sphere_hamiltonian() -> Hamiltonian {
        Hamiltonian::new(PotentialMap::new(PairPotential::from(HardSphere)))
    }

    fn ball(registry: &SpeciesRegistry, position: Point3<f64>) -> Particle {
        Particle::from_species(0, registry.get(0).unwrap(), position)
    }

    #[test]
    fn moving_without_a_target_is_a_fatal_error() {
        let registry = registry();
        let mut space = Space::new(Geometry::Cuboid(Cuboid::cubic(20.0).unwrap()));
        space
            .enroll(
                "balls",
                GroupKind::Atomic,
                vec![ball(&registry, Point3::origin())],
            )
            .unwrap();
        let hamiltonian = hard_sphere_hamiltonian();
        let mut mv = AtomicTranslation::new(1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let result = perform(&mut mv, &mut space, &hamiltonian, &mut rng, 1);
        assert!(matches!(result, Err(MoveError::NoTarget(_))));
    }

    #[test]
    fn free_particle_moves_are_always_accepted() {
        let registry = registry();
        let mut space = Space::new(Geometry::Cuboid(Cuboid::cubic(50.0).unwrap()));
        let group = space
            .enroll(
                "balls",
                GroupKind::Atomic,
                vec![ball(&registry, Point3::origin())],
            )
            .unwrap();
        let hamiltonian = hard_sphere_hamiltonian();
        let mut mv = AtomicTranslation::new(1.0);
        mv.set_group(group);
        let mut rng = StdRng::seed_from_u64(2);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 500).unwrap();
        assert_eq!(mv.statistics().accepted, 500);
        assert!(mv.statistics().mean_square_displacement.avg() > 0.0);
    }

    #[test]
    fn overlapping_trials_are_rejected_every_time() {
        let registry = registry();
        let mut space = Space::new(Geometry::Cuboid(Cuboid::cubic(100.0).unwrap()));
        // Two hard spheres just beyond contact; every overlapping trial
        // must be rejected with probability one.
        space
            .enroll(
                "balls",
                GroupKind::Atomic,
                vec![
                    ball(&registry, Point3::origin()),
                    ball(&registry, Point3::new(4.05, 0.0, 0.0)),
                ],
            )
            .unwrap();
        let hamiltonian = hard_sphere_hamiltonian();
        let mut mv = AtomicTranslation::new(0.2);
        mv.set_particle(1);
        let mut rng = StdRng::seed_from_u64(3);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 1000).unwrap();

        // Every committed configuration must be overlap-free.
        let r2 = space.geometry.sqdist(
            &space.particles[0].position,
            &space.particles[1].position,
        );
        assert!(r2 >= 16.0);
        // And every rejected trial left the buffers in sync.
        assert_eq!(space.particles, space.trial);
    }

    #[test]
    fn trials_escaping_a_hard_wall_are_rejected() {
        let registry = registry();
        let mut space = Space::new(Geometry::Sphere(Sphere::new(5.0).unwrap()));
        space
            .enroll(
                "balls",
                GroupKind::Atomic,
                vec![ball(&registry, Point3::new(4.9, 0.0, 0.0))],
            )
            .unwrap();
        let hamiltonian = hard_sphere_hamiltonian();
        let mut mv = AtomicTranslation::new(1.0);
        mv.set_particle(0);
        let mut rng = StdRng::seed_from_u64(4);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 500).unwrap();
        assert!(space.particles[0].position.coords.norm() <= 5.0);
    }

    #[test]
    fn direction_mask_confines_motion_to_unmasked_axes() {
        let registry = registry();
        let mut space = Space::new(Geometry::Cuboid(Cuboid::cubic(50.0).unwrap()));
        space
            .enroll(
                "balls",
                GroupKind::Atomic,
                vec![ball(&registry, Point3::origin())],
            )
            .unwrap();
        let hamiltonian = hard_sphere_hamiltonian();
        let mut mv = AtomicTranslation::new(2.0);
        mv.set_particle(0);
        mv.direction = Vector3::new(1.0, 1.0, 0.0);
        let mut rng = StdRng::seed_from_u64(5);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 200).unwrap();
        assert_eq!(space.particles[0].position.z, 0.0);
        assert_ne!(space.particles[0].position.x, 0.0);
    }

    #[test]
    fn run_fraction_skips_attempts_but_counts_them() {
        let registry = registry();
        let mut space = Space::new(Geometry::Cuboid(Cuboid::cubic(50.0).unwrap()));
        space
            .enroll(
                "balls",
                GroupKind::Atomic,
                vec![ball(&registry, Point3::origin())],
            )
            .unwrap();
        let hamiltonian = hard_sphere_hamiltonian();
        let mut mv = AtomicTranslation::new(1.0).with_run_fraction(0.0);
        mv.set_particle(0);
        let mut rng = StdRng::seed_from_u64(6);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 100).unwrap();
        assert_eq!(mv.statistics().attempts, 100);
        assert_eq!(mv.statistics().accepted, 0);
        assert_eq!(space.particles[0].position, Point3::origin());
    }
}
