use super::{AcceptanceMap, MoveError, MoveStatistics, TrialMove, random_unit_vector};
use crate::core::geometry::AxisRotation;
use crate::core::models::space::{Frame, Space};
use crate::engine::hamiltonian::Hamiltonian;
use nalgebra::Vector3;
use rand::Rng;
use rand::rngs::StdRng;

/// Combined rigid translation and rotation of a molecular group.
///
/// The rotation axis passes through the group's mass center along a
/// uniformly random direction; the angle is drawn uniformly from a bounded
/// range. Internal distances are preserved, so only the group's interaction
/// with the rest of the system enters the energy change.
#[derive(Debug, Clone)]
pub struct TranslateRotate {
    displacement: f64,
    rotation: f64,
    pub direction: Vector3<f64>,
    run_fraction: f64,
    group: Option<usize>,
    statistics: MoveStatistics,
    per_group: AcceptanceMap<String>,
}

impl TranslateRotate {
    /// `displacement` in angstrom, `rotation` as the maximum angle in
    /// radians.
    pub fn new(displacement: f64, rotation: f64) -> Self {
        Self {
            displacement,
            rotation,
            direction: Vector3::new(1.0, 1.0, 1.0),
            run_fraction: 1.0,
            group: None,
            statistics: MoveStatistics::default(),
            per_group: AcceptanceMap::new(),
        }
    }

    pub fn with_run_fraction(mut self, run_fraction: f64) -> Self {
        self.run_fraction = run_fraction;
        self
    }

    pub fn set_group(&mut self, group_index: usize) {
        self.group = Some(group_index);
    }

    pub fn per_group(&self) -> &AcceptanceMap<String> {
        &self.per_group
    }

    fn group_index(&self) -> Result<usize, MoveError> {
        self.group.ok_or(MoveError::NoTarget(self.label()))
    }
}

impl TrialMove for TranslateRotate {
    fn label(&self) -> &'static str {
        "transrot"
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
        let group_index = self.group_index()?;
        let angle = self.rotation * rng.gen_range(-0.5..0.5);
        let translation = Vector3::new(
            self.displacement * rng.gen_range(-0.5..0.5) * self.direction.x,
            self.displacement * rng.gen_range(-0.5..0.5) * self.direction.y,
            self.displacement * rng.gen_range(-0.5..0.5) * self.direction.z,
        );

        let cm = space.groups[group_index].cm;
        let axis_end = cm + random_unit_vector(rng);
        let rotation = AxisRotation::new(&space.geometry, cm, axis_end, angle);

        for i in space.groups[group_index].range.clone() {
            let rotated = rotation.rotate(&space.geometry, space.particles[i].position);
            let mut position = rotated + translation;
            space.geometry.boundary(&mut position);
            space.trial[i].position = position;
        }
        let mut cm_trial = cm + translation;
        space.geometry.boundary(&mut cm_trial);
        space.groups[group_index].cm_trial = cm_trial;
        Ok(())
    }

    fn energy_change(&mut self, space: &mut Space, hamiltonian: &Hamiltonian) -> f64 {
        let group_index = self.group.expect("propose ran first");
        let u_new = hamiltonian.group_energy(space, Frame::Trial, group_index);
        if u_new.is_infinite() {
            return f64::INFINITY;
        }
        let u_old = hamiltonian.group_energy(space, Frame::Current, group_index);
        u_new - u_old
    }

    fn accept(&mut self, space: &mut Space) {
        let group_index = self.group.expect("propose ran first");
        let group = &space.groups[group_index];
        let moved = space.geometry.sqdist(&group.cm, &group.cm_trial);
        let name = group.name.clone();
        self.statistics.mean_square_displacement.add(moved);
        self.per_group.accept(name, moved);
        space.commit_group(group_index);
    }

    fn reject(&mut self, space: &mut Space) {
        let group_index = self.group.expect("propose ran first");
        let name = space.groups[group_index].name.clone();
        self.per_group.reject(name);
        space.restore_group(group_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{Cuboid, Geometry};
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

    fn dimer_space(registry: &SpeciesRegistry) -> (Space, usize) {
        let mut space = Space::new(Geometry::Cuboid(Cuboid::cubic(50.0).unwrap()));
        let bead = registry.get(0).unwrap();
        let group = space
            .enroll(
                "dimer",
                GroupKind::Molecular,
                vec![
                    Particle::from_species(0, bead, Point3::new(-1.5, 0.0, 0.0)),
                    Particle::from_species(0, bead, Point3::new(1.5, 0.0, 0.0)),
                ],
            )
            .unwrap();
        (space, group)
    }

    #[test]
    fn moving_without_a_group_is_a_fatal_error() {
        let registry = registry();
        let (mut space, _) = dimer_space(&registry);
        let hamiltonian = Hamiltonian::new(PotentialMap::new(PairPotential::from(HardSphere)));
        let mut mv = TranslateRotate::new(1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let result = perform(&mut mv, &mut space, &hamiltonian, &mut rng, 1);
        assert!(matches!(result, Err(MoveError::NoTarget(_))));
    }

    #[test]
    fn rigid_moves_preserve_internal_distances() {
        let registry = registry();
        let (mut space, group) = dimer_space(&registry);
        let hamiltonian = Hamiltonian::new(PotentialMap::new(PairPotential::from(HardSphere)));
        let mut mv = TranslateRotate::new(2.0, std::f64::consts::PI);
        mv.set_group(group);
        let mut rng = StdRng::seed_from_u64(2);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 200).unwrap();

        let bond = space
            .geometry
            .dist(&space.particles[0].position, &space.particles[1].position);
        assert!((bond - 3.0).abs() < 1e-9);
        assert!(mv.statistics().accepted > 0);
    }

    #[test]
    fn mass_center_cache_follows_accepted_moves() {
        let registry = registry();
        let (mut space, group) = dimer_space(&registry);
        let hamiltonian = Hamiltonian::new(PotentialMap::new(PairPotential::from(HardSphere)));
        let mut mv = TranslateRotate::new(2.0, 0.5);
        mv.set_group(group);
        let mut rng = StdRng::seed_from_u64(3);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 100).unwrap();

        let cm = space.mass_center(Frame::Current, group);
        let cached = space.groups[group].cm;
        assert!((cm - cached).norm() < 1e-9);
    }

    #[test]
    fn per_group_acceptance_is_recorded_under_the_group_name() {
        let registry = registry();
        let (mut space, group) = dimer_space(&registry);
        let hamiltonian = Hamiltonian::new(PotentialMap::new(PairPotential::from(HardSphere)));
        let mut mv = TranslateRotate::new(1.0, 0.5);
        mv.set_group(group);
        let mut rng = StdRng::seed_from_u64(4);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 50).unwrap();
        assert!(mv.per_group().acceptance_of(&"dimer".to_string()).is_some());
    }
}
