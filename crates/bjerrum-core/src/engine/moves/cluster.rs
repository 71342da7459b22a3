use super::{AcceptanceMap, MoveError, MoveStatistics, TrialMove, random_unit_vector};
use crate::core::geometry::{AxisRotation, Geometry};
use crate::core::models::particle::Particle;
use crate::core::models::space::{Frame, Space};
use crate::core::stats::Average;
use crate::engine::hamiltonian::Hamiltonian;
use nalgebra::{Point3, Vector3};
use rand::Rng;
use rand::rngs::StdRng;

/// Probability that a mobile particle is dragged along with the cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClusterProbability {
    /// Step function: probability one within `distance` of any cluster
    /// particle, zero beyond.
    Threshold { distance: f64 },
    /// Linear decay from one inside `inner` to zero beyond `outer`.
    Linear { inner: f64, outer: f64 },
}

impl ClusterProbability {
    fn probability(&self, geometry: &Geometry, group: &[Point3<f64>], p: &Point3<f64>) -> f64 {
        let min_sqdist = group
            .iter()
            .map(|g| geometry.sqdist(g, p))
            .fold(f64::INFINITY, f64::min);
        match self {
            Self::Threshold { distance } => {
                if min_sqdist < distance * distance {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Linear { inner, outer } => {
                let r = min_sqdist.sqrt();
                if r <= *inner {
                    1.0
                } else if r >= *outer {
                    0.0
                } else {
                    (outer - r) / (outer - inner)
                }
            }
        }
    }
}

/// Rigid translation and rotation of a group together with mobile particles
/// dragged along by a cluster-detection probability.
///
/// Forward and reverse cluster detection probabilities differ, so detailed
/// balance needs a bias correction in the acceptance ratio. For a rigid
/// transform the member factors cancel and the bias reduces to
/// `sum ln[(1 - p_fwd) / (1 - p_rev)]` over the mobile particles left
/// behind; with the step-function probability this rejects any trial that
/// captures a previously free particle.
#[derive(Debug, Clone)]
pub struct TranslateRotateCluster {
    displacement: f64,
    rotation: f64,
    probability: ClusterProbability,
    run_fraction: f64,
    group: Option<usize>,
    mobile: Option<usize>,
    cluster: Vec<usize>,
    statistics: MoveStatistics,
    per_group: AcceptanceMap<String>,
    cluster_size: Average,
    bias: Average,
}

impl TranslateRotateCluster {
    pub fn new(displacement: f64, rotation: f64, probability: ClusterProbability) -> Self {
        Self {
            displacement,
            rotation,
            probability,
            run_fraction: 1.0,
            group: None,
            mobile: None,
            cluster: Vec::new(),
            statistics: MoveStatistics::default(),
            per_group: AcceptanceMap::new(),
            cluster_size: Average::new(),
            bias: Average::new(),
        }
    }

    pub fn with_run_fraction(mut self, run_fraction: f64) -> Self {
        self.run_fraction = run_fraction;
        self
    }

    pub fn set_group(&mut self, group_index: usize) {
        self.group = Some(group_index);
    }

    /// Selects the atomic group whose particles may join the cluster.
    pub fn set_mobile(&mut self, group_index: usize) {
        self.mobile = Some(group_index);
    }

    pub fn average_cluster_size(&self) -> &Average {
        &self.cluster_size
    }

    pub fn average_bias(&self) -> &Average {
        &self.bias
    }

    fn group_positions(&self, space: &Space, frame: Frame, group_index: usize) -> Vec<Point3<f64>> {
        space.groups[group_index]
            .range
            .clone()
            .map(|i| space.frame(frame)[i].position)
            .collect()
    }
}

impl TrialMove for TranslateRotateCluster {
    fn label(&self) -> &'static str {
        "transrot-cluster"
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
        let group_index = self.group.ok_or(MoveError::NoTarget(self.label()))?;
        let mobile_index = self.mobile.ok_or(MoveError::NoTarget(self.label()))?;
        if space.groups[mobile_index].is_empty() {
            return Err(MoveError::EmptyMobileSet(self.label()));
        }

        let angle = self.rotation * rng.gen_range(-0.5..0.5);
        let translation = Vector3::new(
            self.displacement * rng.gen_range(-0.5..0.5),
            self.displacement * rng.gen_range(-0.5..0.5),
            self.displacement * rng.gen_range(-0.5..0.5),
        );

        let group_positions = self.group_positions(space, Frame::Current, group_index);
        self.cluster.clear();
        for i in space.groups[mobile_index].range.clone() {
            let p = self.probability.probability(
                &space.geometry,
                &group_positions,
                &space.particles[i].position,
            );
            if p > 0.0 && rng.gen_range(0.0..1.0) < p {
                self.cluster.push(i);
            }
        }

        let cm = space.groups[group_index].cm;
        let axis_end = cm + random_unit_vector(rng);
        let rotation = AxisRotation::new(&space.geometry, cm, axis_end, angle);
        let members: Vec<usize> = space.groups[group_index]
            .range
            .clone()
            .chain(self.cluster.iter().copied())
            .collect();
        for i in members {
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
        let mobile_index = self.mobile.expect("propose ran first");

        let moved: Vec<usize> = space.groups[group_index]
            .range
            .clone()
            .chain(self.cluster.iter().copied())
            .collect();

        let u_new = hamiltonian.indices_energy(space, Frame::Trial, &moved);
        if u_new.is_infinite() {
            return f64::INFINITY;
        }
        let u_old = hamiltonian.indices_energy(space, Frame::Current, &moved);

        // Detailed-balance bias over the mobile particles left behind.
        let group_before = self.group_positions(space, Frame::Current, group_index);
        let group_after = self.group_positions(space, Frame::Trial, group_index);
        let mut bias = 0.0;
        for i in space.groups[mobile_index].range.clone() {
            if self.cluster.contains(&i) {
                continue;
            }
            let position = &space.particles[i].position;
            let p_fwd = self
                .probability
                .probability(&space.geometry, &group_before, position);
            let p_rev = self
                .probability
                .probability(&space.geometry, &group_after, position);
            bias += (1.0 - p_fwd).ln() - (1.0 - p_rev).ln();
        }
        if !bias.is_finite() {
            return f64::INFINITY;
        }
        self.bias.add(bias);
        u_new - u_old + bias
    }

    fn accept(&mut self, space: &mut Space) {
        let group_index = self.group.expect("propose ran first");
        let group = &space.groups[group_index];
        let moved = space.geometry.sqdist(&group.cm, &group.cm_trial);
        let name = group.name.clone();
        self.statistics.mean_square_displacement.add(moved);
        self.per_group.accept(name, moved);
        self.cluster_size.add(self.cluster.len() as f64);
        space.commit_group(group_index);
        let cluster = self.cluster.clone();
        space.commit(cluster);
    }

    fn reject(&mut self, space: &mut Space) {
        let group_index = self.group.expect("propose ran first");
        let name = space.groups[group_index].name.clone();
        self.per_group.reject(name);
        space.restore_group(group_index);
        let cluster = self.cluster.clone();
        space.restore(cluster);
    }
}

/// Non-rejective cluster translation for fully periodic molecular systems.
///
/// The moved/unmoved partition is grown iteratively: a resting molecule
/// joins the moved set when it would overlap a moved molecule in either the
/// old or the new position. Growth stops when no inclusion triggers, which
/// makes the transition matrix symmetric and the move unconditionally
/// acceptable.
///
/// With `skip_energy_update` the pair energy difference is not computed;
/// this does not affect the Markov chain but shows up as apparent energy
/// drift.
#[derive(Debug, Clone)]
pub struct ClusterTranslateNR {
    displacement: f64,
    pub skip_energy_update: bool,
    run_fraction: f64,
    translation: Vector3<f64>,
    moved: Vec<usize>,
    booked_energy: f64,
    statistics: MoveStatistics,
    moved_fraction: Average,
}

impl ClusterTranslateNR {
    pub fn new(displacement: f64) -> Self {
        Self {
            displacement,
            skip_energy_update: false,
            run_fraction: 1.0,
            translation: Vector3::zeros(),
            moved: Vec::new(),
            booked_energy: 0.0,
            statistics: MoveStatistics::default(),
            moved_fraction: Average::new(),
        }
    }

    pub fn with_run_fraction(mut self, run_fraction: f64) -> Self {
        self.run_fraction = run_fraction;
        self
    }

    pub fn moved_fraction(&self) -> &Average {
        &self.moved_fraction
    }

    fn overlaps(
        hamiltonian: &Hamiltonian,
        geometry: &Geometry,
        a: &[Particle],
        shift_a: &Vector3<f64>,
        b: &[Particle],
        shift_b: &Vector3<f64>,
    ) -> bool {
        for pa in a {
            let mut position_a = pa.position + shift_a;
            geometry.boundary(&mut position_a);
            for pb in b {
                let mut position_b = pb.position + shift_b;
                geometry.boundary(&mut position_b);
                let r2 = geometry.sqdist(&position_a, &position_b);
                if hamiltonian.nonbonded().energy(pa, pb, r2).is_infinite() {
                    return true;
                }
            }
        }
        false
    }
}

impl TrialMove for ClusterTranslateNR {
    fn label(&self) -> &'static str {
        "cluster-nr"
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
        if !matches!(space.geometry, Geometry::Cuboid(_)) {
            return Err(MoveError::RequiresPeriodic(self.label()));
        }
        self.translation = Vector3::new(
            self.displacement * rng.gen_range(-0.5..0.5),
            self.displacement * rng.gen_range(-0.5..0.5),
            self.displacement * rng.gen_range(-0.5..0.5),
        );
        self.moved.clear();
        self.moved.push(rng.gen_range(0..space.groups.len()));
        Ok(())
    }

    fn energy_change(&mut self, space: &mut Space, hamiltonian: &Hamiltonian) -> f64 {
        // Grow the moved set until no overlap-triggered inclusion remains. A
        // resting molecule joins when it would overlap a moved one in either
        // the old or the new relative position.
        let zero = Vector3::zeros();
        loop {
            let mut grown = false;
            for candidate in 0..space.groups.len() {
                if self.moved.contains(&candidate) {
                    continue;
                }
                let joins = self.moved.iter().any(|&m| {
                    let moved_particles = &space.particles[space.groups[m].range.clone()];
                    let resting = &space.particles[space.groups[candidate].range.clone()];
                    Self::overlaps(
                        hamiltonian,
                        &space.geometry,
                        moved_particles,
                        &self.translation,
                        resting,
                        &zero,
                    ) || Self::overlaps(
                        hamiltonian,
                        &space.geometry,
                        moved_particles,
                        &zero,
                        resting,
                        &self.translation,
                    )
                });
                if joins {
                    self.moved.push(candidate);
                    grown = true;
                }
            }
            if !grown {
                break;
            }
        }

        for &g in &self.moved {
            for i in space.groups[g].range.clone() {
                let mut position = space.particles[i].position + self.translation;
                space.geometry.boundary(&mut position);
                space.trial[i].position = position;
            }
            let mut cm_trial = space.groups[g].cm + self.translation;
            space.geometry.boundary(&mut cm_trial);
            space.groups[g].cm_trial = cm_trial;
        }

        if self.skip_energy_update {
            self.booked_energy = 0.0;
        } else {
            let indices: Vec<usize> = self
                .moved
                .iter()
                .flat_map(|&g| space.groups[g].range.clone())
                .collect();
            let u_new = hamiltonian.indices_energy(space, Frame::Trial, &indices);
            let u_old = hamiltonian.indices_energy(space, Frame::Current, &indices);
            self.booked_energy = u_new - u_old;
        }
        // The cluster growth made the transition matrix symmetric; the move
        // is accepted unconditionally.
        0.0
    }

    fn accept(&mut self, space: &mut Space) {
        let mut moved_particles = 0;
        for &g in &self.moved {
            moved_particles += space.groups[g].len();
            space.commit_group(g);
        }
        self.moved_fraction
            .add(moved_particles as f64 / space.len() as f64);
        self.statistics
            .mean_square_displacement
            .add(self.translation.norm_squared());
    }

    fn reject(&mut self, space: &mut Space) {
        for &g in &self.moved {
            space.restore_group(g);
        }
    }

    fn alternate_energy(&self) -> Option<f64> {
        Some(self.booked_energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{Cuboid, Sphere};
    use crate::core::models::group::GroupKind;
    use crate::core::models::species::{Species, SpeciesRegistry};
    use crate::core::potential::dispatch::PotentialMap;
    use crate::core::potential::pair::{HardSphere, PairPotential};
    use crate::engine::moves::perform;
    use rand::SeedableRng;

    fn registry() -> SpeciesRegistry {
        let mut registry = SpeciesRegistry::new();
        for (name, radius) in [("colloid", 4.0), ("ion", 1.0)] {
            registry
                .register(Species {
                    name: name.into(),
                    charge: 0.0,
                    radius,
                    eps: 0.0,
                    hydrophobic: false,
                    alpha: 0.0,
                    activity: None,
                })
                .unwrap();
        }
        registry
    }

    fn particle(registry: &SpeciesRegistry, name: &str, x: f64, y: f64, z: f64) -> Particle {
        let id = registry.id_of(name).unwrap();
        Particle::from_species(id, registry.get(id).unwrap(), Point3::new(x, y, z))
    }

    fn hamiltonian() -> Hamiltonian {
        Hamiltonian::new(PotentialMap::new(PairPotential::from(HardSphere)))
    }

    #[test]
    fn dragged_particles_keep_their_distance_to_the_cluster() {
        let registry = registry();
        let mut space = Space::new(Geometry::Cuboid(Cuboid::cubic(60.0).unwrap()));
        let colloid = space
            .enroll(
                "colloid",
                GroupKind::Molecular,
                vec![particle(&registry, "colloid", 0.0, 0.0, 0.0)],
            )
            .unwrap();
        let mobile = space
            .enroll(
                "ions",
                GroupKind::Atomic,
                vec![particle(&registry, "ion", 6.0, 0.0, 0.0)],
            )
            .unwrap();
        let hamiltonian = hamiltonian();

        // The lone mobile ion starts inside the capture threshold and is
        // dragged on every accepted trial.
        let mut mv = TranslateRotateCluster::new(
            3.0,
            1.0,
            ClusterProbability::Threshold { distance: 10.0 },
        );
        mv.set_group(colloid);
        mv.set_mobile(mobile);
        let mut rng = StdRng::seed_from_u64(41);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 200).unwrap();

        assert!(mv.statistics().accepted > 0);
        assert!((mv.average_cluster_size().avg() - 1.0).abs() < 1e-12);
        let separation = space
            .geometry
            .dist(&space.particles[0].position, &space.particles[1].position);
        assert!((separation - 6.0).abs() < 1e-9);
    }

    #[test]
    fn free_particles_are_never_captured_inside_the_threshold() {
        let registry = registry();
        let mut space = Space::new(Geometry::Cuboid(Cuboid::cubic(30.0).unwrap()));
        let colloid = space
            .enroll(
                "colloid",
                GroupKind::Molecular,
                vec![particle(&registry, "colloid", -10.0, 0.0, 0.0)],
            )
            .unwrap();
        let mobile = space
            .enroll(
                "ions",
                GroupKind::Atomic,
                vec![particle(&registry, "ion", 10.0, 0.0, 0.0)],
            )
            .unwrap();
        let hamiltonian = hamiltonian();

        let threshold = 8.0;
        let mut mv = TranslateRotateCluster::new(
            10.0,
            1.0,
            ClusterProbability::Threshold {
                distance: threshold,
            },
        );
        mv.set_group(colloid);
        mv.set_mobile(mobile);
        let mut rng = StdRng::seed_from_u64(42);

        // Large displacements in a small box: without the bias term the
        // colloid would routinely land on top of the free ion.
        for _ in 0..300 {
            perform(&mut mv, &mut space, &hamiltonian, &mut rng, 1).unwrap();
            let separation = space
                .geometry
                .dist(&space.particles[0].position, &space.particles[1].position);
            assert!(separation >= threshold - 1e-9);
        }
    }

    #[test]
    fn cluster_moves_require_group_and_mobile_set() {
        let registry = registry();
        let mut space = Space::new(Geometry::Cuboid(Cuboid::cubic(30.0).unwrap()));
        space
            .enroll(
                "colloid",
                GroupKind::Molecular,
                vec![particle(&registry, "colloid", 0.0, 0.0, 0.0)],
            )
            .unwrap();
        let hamiltonian = hamiltonian();
        let mut mv = TranslateRotateCluster::new(
            1.0,
            1.0,
            ClusterProbability::Threshold { distance: 5.0 },
        );
        let mut rng = StdRng::seed_from_u64(43);
        let result = perform(&mut mv, &mut space, &hamiltonian, &mut rng, 1);
        assert!(matches!(result, Err(MoveError::NoTarget(_))));
    }

    #[test]
    fn nonrejective_translation_accepts_everything_without_creating_overlap() {
        let registry = registry();
        let mut space = Space::new(Geometry::Cuboid(Cuboid::cubic(50.0).unwrap()));
        // Two colloids barely beyond contact: single-molecule translations
        // would overlap them, so the overlap test must keep dragging the
        // partner along instead.
        for (index, x) in [-4.25, 4.25].into_iter().enumerate() {
            space
                .enroll(
                    &format!("colloid{}", index),
                    GroupKind::Molecular,
                    vec![particle(&registry, "colloid", x, 0.0, 0.0)],
                )
                .unwrap();
        }
        let hamiltonian = hamiltonian();
        let contact = 8.0;
        let mut mv = ClusterTranslateNR::new(3.0);
        let mut rng = StdRng::seed_from_u64(44);

        for _ in 0..100 {
            perform(&mut mv, &mut space, &hamiltonian, &mut rng, 1).unwrap();
            let separation = space
                .geometry
                .dist(&space.particles[0].position, &space.particles[1].position);
            assert!(separation >= contact - 1e-9);
        }

        // Non-rejective: every attempt is accepted.
        assert_eq!(mv.statistics().accepted, 100);
        assert!(mv.moved_fraction().avg() > 0.0);
    }

    #[test]
    fn nonrejective_translation_requires_a_periodic_cell() {
        let registry = registry();
        let mut space = Space::new(Geometry::Sphere(Sphere::new(30.0).unwrap()));
        space
            .enroll(
                "colloid",
                GroupKind::Molecular,
                vec![particle(&registry, "colloid", 0.0, 0.0, 0.0)],
            )
            .unwrap();
        let hamiltonian = hamiltonian();
        let mut mv = ClusterTranslateNR::new(1.0);
        let mut rng = StdRng::seed_from_u64(45);
        let result = perform(&mut mv, &mut space, &hamiltonian, &mut rng, 1);
        assert!(matches!(result, Err(MoveError::RequiresPeriodic(_))));
    }
}
