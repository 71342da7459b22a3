use super::{AcceptanceMap, MoveError, MoveStatistics, TrialMove, random_unit_vector};
use crate::core::geometry::AxisRotation;
use crate::core::models::space::{Frame, Space};
use crate::engine::hamiltonian::Hamiltonian;
use rand::Rng;
use rand::rngs::StdRng;

/// Crank-shaft rotation of a contiguous sub-chain of a linear polymer.
///
/// Two chain nodes spanning at least `min_len` and at most `max_len` bonds
/// define the rotation axis; the monomers strictly between them rotate by a
/// bounded random angle. Bonds to the two pivots are preserved exactly.
#[derive(Debug, Clone)]
pub struct CrankShaft {
    rotation: f64,
    pub min_len: usize,
    pub max_len: usize,
    run_fraction: f64,
    group: Option<usize>,
    index: Vec<usize>,
    statistics: MoveStatistics,
    per_group: AcceptanceMap<String>,
}

impl CrankShaft {
    pub fn new(rotation: f64) -> Self {
        Self {
            rotation,
            min_len: 1,
            max_len: 10,
            run_fraction: 1.0,
            group: None,
            index: Vec::new(),
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

    fn rotate_indices(
        space: &mut Space,
        axis_start: usize,
        axis_end: usize,
        indices: &[usize],
        angle: f64,
    ) {
        let rotation = AxisRotation::new(
            &space.geometry,
            space.particles[axis_start].position,
            space.particles[axis_end].position,
            angle,
        );
        for &i in indices {
            space.trial[i].position = rotation.rotate(&space.geometry, space.particles[i].position);
        }
    }

    fn moved_energy(space: &mut Space, hamiltonian: &Hamiltonian, indices: &[usize]) -> f64 {
        let u_new = hamiltonian.indices_energy(space, Frame::Trial, indices);
        if u_new.is_infinite() {
            return f64::INFINITY;
        }
        u_new - hamiltonian.indices_energy(space, Frame::Current, indices)
    }

    fn record_accept(
        statistics: &mut MoveStatistics,
        per_group: &mut AcceptanceMap<String>,
        space: &mut Space,
        group_index: usize,
        indices: &[usize],
    ) {
        let moved: f64 = indices
            .iter()
            .map(|&i| {
                space
                    .geometry
                    .sqdist(&space.particles[i].position, &space.trial[i].position)
            })
            .sum::<f64>()
            / indices.len().max(1) as f64;
        statistics.mean_square_displacement.add(moved);
        per_group.accept(space.groups[group_index].name.clone(), moved);
        space.commit(indices.to_vec());
        space.update_mass_center(group_index);
    }
}

impl TrialMove for CrankShaft {
    fn label(&self) -> &'static str {
        "crankshaft"
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
        let range = space.groups[group_index].range.clone();
        if range.len() < self.min_len + 2 {
            return Err(MoveError::GroupTooSmall {
                move_name: self.label(),
                group: space.groups[group_index].name.clone(),
            });
        }

        let first = rng.gen_range(range.start..range.end - self.min_len - 1);
        let last_max = (first + self.max_len + 1).min(range.end - 1);
        let last = rng.gen_range(first + self.min_len + 1..=last_max);
        self.index = (first + 1..last).collect();

        let angle = self.rotation * rng.gen_range(-0.5..0.5);
        Self::rotate_indices(space, first, last, &self.index, angle);
        Ok(())
    }

    fn energy_change(&mut self, space: &mut Space, hamiltonian: &Hamiltonian) -> f64 {
        Self::moved_energy(space, hamiltonian, &self.index)
    }

    fn accept(&mut self, space: &mut Space) {
        let group_index = self.group.expect("propose ran first");
        let index = std::mem::take(&mut self.index);
        Self::record_accept(
            &mut self.statistics,
            &mut self.per_group,
            space,
            group_index,
            &index,
        );
    }

    fn reject(&mut self, space: &mut Space) {
        let group_index = self.group.expect("propose ran first");
        self.per_group
            .reject(space.groups[group_index].name.clone());
        let index = std::mem::take(&mut self.index);
        space.restore(index);
    }
}

/// Pivot rotation of one tail of a linear polymer.
///
/// The axis spans `min_len` to `max_len` bonds ending at the pivot node;
/// every monomer past the pivot rotates about it.
#[derive(Debug, Clone)]
pub struct Pivot {
    rotation: f64,
    pub min_len: usize,
    pub max_len: usize,
    run_fraction: f64,
    group: Option<usize>,
    index: Vec<usize>,
    statistics: MoveStatistics,
    per_group: AcceptanceMap<String>,
}

impl Pivot {
    pub fn new(rotation: f64) -> Self {
        Self {
            rotation,
            min_len: 1,
            max_len: 10,
            run_fraction: 1.0,
            group: None,
            index: Vec::new(),
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
}

impl TrialMove for Pivot {
    fn label(&self) -> &'static str {
        "pivot"
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
        let range = space.groups[group_index].range.clone();
        if range.len() < self.min_len + 2 {
            return Err(MoveError::GroupTooSmall {
                move_name: self.label(),
                group: space.groups[group_index].name.clone(),
            });
        }

        let axis_start = rng.gen_range(range.start..range.end - self.min_len - 1);
        let pivot_max = (axis_start + self.max_len).min(range.end - 2);
        let pivot = rng.gen_range(axis_start + self.min_len..=pivot_max);
        self.index = (pivot + 1..range.end).collect();

        let angle = self.rotation * rng.gen_range(-0.5..0.5);
        CrankShaft::rotate_indices(space, axis_start, pivot, &self.index, angle);
        Ok(())
    }

    fn energy_change(&mut self, space: &mut Space, hamiltonian: &Hamiltonian) -> f64 {
        CrankShaft::moved_energy(space, hamiltonian, &self.index)
    }

    fn accept(&mut self, space: &mut Space) {
        let group_index = self.group.expect("propose ran first");
        let index = std::mem::take(&mut self.index);
        CrankShaft::record_accept(
            &mut self.statistics,
            &mut self.per_group,
            space,
            group_index,
            &index,
        );
    }

    fn reject(&mut self, space: &mut Space) {
        let group_index = self.group.expect("propose ran first");
        self.per_group
            .reject(space.groups[group_index].name.clone());
        let index = std::mem::take(&mut self.index);
        space.restore(index);
    }
}

/// Slithering-snake move for linear homopolymers.
///
/// One chain end is removed and regrown at the opposite end at a fixed bond
/// length in a uniformly random direction; all interior monomers slide one
/// position along the chain.
#[derive(Debug, Clone)]
pub struct Reptation {
    bond_length: f64,
    run_fraction: f64,
    group: Option<usize>,
    removed: usize,
    grown: usize,
    statistics: MoveStatistics,
}

impl Reptation {
    pub fn new(bond_length: f64) -> Self {
        Self {
            bond_length,
            run_fraction: 1.0,
            group: None,
            removed: usize::MAX,
            grown: usize::MAX,
            statistics: MoveStatistics::default(),
        }
    }

    pub fn with_run_fraction(mut self, run_fraction: f64) -> Self {
        self.run_fraction = run_fraction;
        self
    }

    pub fn set_group(&mut self, group_index: usize) {
        self.group = Some(group_index);
    }
}

impl TrialMove for Reptation {
    fn label(&self) -> &'static str {
        "reptation"
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
        let range = space.groups[group_index].range.clone();
        if range.len() < 2 {
            return Err(MoveError::GroupTooSmall {
                move_name: self.label(),
                group: space.groups[group_index].name.clone(),
            });
        }

        let head_to_tail = rng.gen_range(0.0..1.0) < 0.5;
        let (removed, grown) = if head_to_tail {
            (range.start, range.end - 1)
        } else {
            (range.end - 1, range.start)
        };
        self.removed = removed;
        self.grown = grown;

        // Slide every monomer one slot towards the removed end.
        if head_to_tail {
            for i in range.start..range.end - 1 {
                space.trial[i].position = space.particles[i + 1].position;
            }
        } else {
            for i in (range.start + 1..range.end).rev() {
                space.trial[i].position = space.particles[i - 1].position;
            }
        }
        let mut new_end =
            space.particles[grown].position + self.bond_length * random_unit_vector(rng);
        space.geometry.boundary(&mut new_end);
        space.trial[grown].position = new_end;
        Ok(())
    }

    fn energy_change(&mut self, space: &mut Space, hamiltonian: &Hamiltonian) -> f64 {
        // Only the removed end disappears and the regrown end appears; all
        // other positions are relabeled, not changed.
        let mut phantom = space.particles[self.grown].clone();
        phantom.position = space.trial[self.grown].position;
        let u_new = hamiltonian.phantom_energy(space, Frame::Current, &phantom, &[self.removed]);
        if u_new.is_infinite() {
            return f64::INFINITY;
        }
        let u_old = hamiltonian.particle_energy(space, Frame::Current, self.removed);
        u_new - u_old
    }

    fn accept(&mut self, space: &mut Space) {
        let group_index = self.group.expect("propose ran first");
        let moved = space.geometry.sqdist(
            &space.particles[self.removed].position,
            &space.trial[self.grown].position,
        );
        self.statistics.mean_square_displacement.add(moved);
        let range = space.groups[group_index].range.clone();
        space.commit(range);
        space.update_mass_center(group_index);
    }

    fn reject(&mut self, space: &mut Space) {
        let group_index = self.group.expect("propose ran first");
        let range = space.groups[group_index].range.clone();
        space.restore(range);
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

    const BOND: f64 = 3.0;

    fn registry() -> SpeciesRegistry {
        let mut registry = SpeciesRegistry::new();
        registry
            .register(Species {
                name: "monomer".into(),
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

    fn chain_space(registry: &SpeciesRegistry, monomers: usize) -> (Space, usize) {
        let mut space = Space::new(Geometry::Cuboid(Cuboid::cubic(100.0).unwrap()));
        let monomer = registry.get(0).unwrap();
        let chain: Vec<Particle> = (0..monomers)
            .map(|i| {
                Particle::from_species(0, monomer, Point3::new(i as f64 * BOND - 15.0, 0.0, 0.0))
            })
            .collect();
        let group = space.enroll("chain", GroupKind::Molecular, chain).unwrap();
        (space, group)
    }

    fn hamiltonian() -> Hamiltonian {
        Hamiltonian::new(PotentialMap::new(PairPotential::from(HardSphere)))
    }

    fn bond_lengths(space: &Space, group: usize) -> Vec<f64> {
        let range = space.groups[group].range.clone();
        range
            .clone()
            .zip(range.skip(1))
            .map(|(i, j)| {
                space
                    .geometry
                    .dist(&space.particles[i].position, &space.particles[j].position)
            })
            .collect()
    }

    #[test]
    fn crankshaft_preserves_every_bond_length() {
        let registry = registry();
        let (mut space, group) = chain_space(&registry, 10);
        let hamiltonian = hamiltonian();
        let mut mv = CrankShaft::new(2.0);
        mv.set_group(group);
        let mut rng = StdRng::seed_from_u64(11);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 200).unwrap();

        assert!(mv.statistics().accepted > 0);
        for bond in bond_lengths(&space, group) {
            assert!((bond - BOND).abs() < 1e-9);
        }
    }

    #[test]
    fn pivot_preserves_every_bond_length() {
        let registry = registry();
        let (mut space, group) = chain_space(&registry, 10);
        let hamiltonian = hamiltonian();
        let mut mv = Pivot::new(2.0);
        mv.set_group(group);
        let mut rng = StdRng::seed_from_u64(12);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 200).unwrap();

        assert!(mv.statistics().accepted > 0);
        for bond in bond_lengths(&space, group) {
            assert!((bond - BOND).abs() < 1e-9);
        }
    }

    #[test]
    fn pivot_actually_bends_the_chain() {
        let registry = registry();
        let (mut space, group) = chain_space(&registry, 10);
        let hamiltonian = hamiltonian();
        let mut mv = Pivot::new(3.0);
        mv.set_group(group);
        let mut rng = StdRng::seed_from_u64(13);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 100).unwrap();

        let range = space.groups[group].range.clone();
        let end_to_end = space.geometry.dist(
            &space.particles[range.start].position,
            &space.particles[range.end - 1].position,
        );
        assert!(end_to_end < (10 - 1) as f64 * BOND - 1e-6);
    }

    #[test]
    fn reptation_keeps_the_chain_connected_at_fixed_bond_length() {
        let registry = registry();
        let (mut space, group) = chain_space(&registry, 8);
        let hamiltonian = hamiltonian();
        let mut mv = Reptation::new(BOND);
        mv.set_group(group);
        let mut rng = StdRng::seed_from_u64(14);

        perform(&mut mv, &mut space, &hamiltonian, &mut rng, 200).unwrap();

        assert!(mv.statistics().accepted > 0);
        for bond in bond_lengths(&space, group) {
            assert!((bond - BOND).abs() < 1e-9);
        }
    }

    #[test]
    fn chain_moves_need_a_group_and_enough_monomers() {
        let registry = registry();
        let (mut space, group) = chain_space(&registry, 2);
        let hamiltonian = hamiltonian();
        let mut rng = StdRng::seed_from_u64(15);

        let mut unset = CrankShaft::new(1.0);
        let result = perform(&mut unset, &mut space, &hamiltonian, &mut rng, 1);
        assert!(matches!(result, Err(MoveError::NoTarget(_))));

        let mut small = CrankShaft::new(1.0);
        small.set_group(group);
        let result = perform(&mut small, &mut space, &hamiltonian, &mut rng, 1);
        assert!(matches!(result, Err(MoveError::GroupTooSmall { .. })));
    }
}
