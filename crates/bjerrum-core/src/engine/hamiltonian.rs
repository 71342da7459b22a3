use crate::core::geometry::CollisionKind;
use crate::core::models::particle::Particle;
use crate::core::models::space::{Frame, Space};
use crate::core::models::species::SpeciesRegistry;
use crate::core::potential::dispatch::PotentialMap;
use crate::core::potential::pair_matrix::PairMatrix;
use itertools::Itertools;
use nalgebra::Vector3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Energy contributions that depend on the cell rather than on particle
/// pair distances.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalEnergy {
    /// Isobaric-ensemble term `P V - (N + 1) ln V`. The extra power of the
    /// volume comes from the log-uniform volume sampling of the volume move.
    Pressure {
        /// Pressure in kT per cubic angstrom.
        pressure: f64,
    },
}

impl ExternalEnergy {
    fn energy(&self, space: &Space) -> f64 {
        match self {
            Self::Pressure { pressure } => {
                let volume = space.geometry.volume();
                pressure * volume - (space.len() as f64 + 1.0) * volume.ln()
            }
        }
    }
}

/// The system Hamiltonian: a nonbonded pair potential plus external terms.
///
/// All pair energies go through the geometry's minimum-image metric. An
/// optional precomputed cutoff table lets the double loops skip pairs that
/// every composed term treats as zero.
#[derive(Debug, Clone)]
pub struct Hamiltonian {
    nonbonded: PotentialMap,
    external: Vec<ExternalEnergy>,
    cutoff: Option<PairMatrix<f64>>,
}

impl Hamiltonian {
    pub fn new(nonbonded: PotentialMap) -> Self {
        Self {
            nonbonded,
            external: Vec::new(),
            cutoff: None,
        }
    }

    /// Precomputes the combined cutoff table for pair skipping.
    pub fn with_cutoff_table(mut self, registry: &SpeciesRegistry) -> Self {
        self.cutoff = Some(self.nonbonded.cutoff_squared(registry));
        self
    }

    pub fn add_external(&mut self, term: ExternalEnergy) {
        self.external.push(term);
    }

    pub fn nonbonded(&self) -> &PotentialMap {
        &self.nonbonded
    }

    pub fn nonbonded_mut(&mut self) -> &mut PotentialMap {
        &mut self.nonbonded
    }

    /// Recalibrates density-dependent screening from the committed
    /// configuration. Must only run between trials.
    pub fn rescale_screening(&mut self, space: &Space) {
        self.nonbonded.rescale_screening(space);
    }

    #[inline]
    fn pair(&self, space: &Space, a: &Particle, b: &Particle) -> f64 {
        let r2 = space.geometry.sqdist(&a.position, &b.position);
        if let Some(cutoff) = &self.cutoff {
            if r2 > cutoff.get(a.species, b.species) {
                return 0.0;
            }
        }
        self.nonbonded.energy(a, b, r2)
    }

    /// Force on `b` from `a` through the minimum-image displacement.
    pub fn pair_force(&self, space: &Space, a: &Particle, b: &Particle) -> Vector3<f64> {
        let dr = space.geometry.vdist(&b.position, &a.position);
        self.nonbonded.force(a, b, dr.norm_squared(), &dr)
    }

    /// Energy of a particle not (or no longer) part of the collection,
    /// interacting with every stored particle except the excluded indices.
    /// A boundary collision yields an infinite energy.
    pub fn phantom_energy(
        &self,
        space: &Space,
        frame: Frame,
        particle: &Particle,
        exclude: &[usize],
    ) -> f64 {
        if space.geometry.collision(particle, CollisionKind::Boundary) {
            return f64::INFINITY;
        }
        let particles = space.frame(frame);
        let mut energy = 0.0;
        for (j, other) in particles.iter().enumerate() {
            if exclude.contains(&j) {
                continue;
            }
            energy += self.pair(space, particle, other);
        }
        energy
    }

    /// Energy of one stored particle with the rest of the system.
    pub fn particle_energy(&self, space: &Space, frame: Frame, index: usize) -> f64 {
        let particle = &space.frame(frame)[index];
        self.phantom_energy(space, frame, particle, &[index])
    }

    /// Energy between a set of particle indices and everything outside the
    /// set. Pairs inside the set are not counted; rigid moves of the whole
    /// set leave them unchanged.
    pub fn indices_energy(&self, space: &Space, frame: Frame, indices: &[usize]) -> f64 {
        let particles = space.frame(frame);
        let mut in_set = vec![false; particles.len()];
        for &i in indices {
            in_set[i] = true;
        }
        let mut energy = 0.0;
        for &i in indices {
            let particle = &particles[i];
            if space.geometry.collision(particle, CollisionKind::Boundary) {
                return f64::INFINITY;
            }
            for (j, other) in particles.iter().enumerate() {
                if in_set[j] {
                    continue;
                }
                energy += self.pair(space, particle, other);
            }
        }
        energy
    }

    /// Energy of a whole group with the rest of the system.
    pub fn group_energy(&self, space: &Space, frame: Frame, group_index: usize) -> f64 {
        let range = space.groups[group_index].range.clone();
        let indices: Vec<usize> = range.collect();
        self.indices_energy(space, frame, &indices)
    }

    /// Interaction energy between two groups.
    pub fn group_to_group(&self, space: &Space, frame: Frame, first: usize, second: usize) -> f64 {
        let particles = space.frame(frame);
        let mut energy = 0.0;
        for i in space.groups[first].range.clone() {
            for j in space.groups[second].range.clone() {
                energy += self.pair(space, &particles[i], &particles[j]);
            }
        }
        energy
    }

    /// Pairwise energy inside one group.
    pub fn group_internal(&self, space: &Space, frame: Frame, group_index: usize) -> f64 {
        let particles = space.frame(frame);
        let range = space.groups[group_index].range.clone();
        let mut energy = 0.0;
        for (i, j) in range.tuple_combinations() {
            energy += self.pair(space, &particles[i], &particles[j]);
        }
        energy
    }

    /// Energy of phantom particles inserted into the system: interactions
    /// with every stored particle plus the pairs among the inserted set.
    pub fn insertion_energy(&self, space: &Space, frame: Frame, inserted: &[Particle]) -> f64 {
        let mut energy = 0.0;
        for particle in inserted {
            energy += self.phantom_energy(space, frame, particle, &[]);
        }
        for (a, b) in inserted.iter().tuple_combinations() {
            let r2 = space.geometry.sqdist(&a.position, &b.position);
            energy += self.nonbonded.energy(a, b, r2);
        }
        energy
    }

    /// Energy carried by a set of stored particles about to be deleted:
    /// their interactions with the rest plus the pairs among themselves.
    pub fn deletion_energy(&self, space: &Space, frame: Frame, indices: &[usize]) -> f64 {
        let particles = space.frame(frame);
        let mut energy = self.indices_energy(space, frame, indices);
        for (&i, &j) in indices.iter().tuple_combinations() {
            energy += self.pair(space, &particles[i], &particles[j]);
        }
        energy
    }

    /// Total system energy: all group pair interactions, all group internal
    /// energies and the external terms, recomputed from scratch.
    ///
    /// The group-pair double loop is read-only and is reduced in parallel
    /// when the `parallel` feature is enabled.
    pub fn system_energy(&self, space: &Space, frame: Frame) -> f64 {
        let group_pairs: Vec<(usize, usize)> =
            (0..space.groups.len()).tuple_combinations().collect();

        #[cfg(feature = "parallel")]
        let pair_energy: f64 = group_pairs
            .par_iter()
            .map(|&(i, j)| self.group_to_group(space, frame, i, j))
            .sum();

        #[cfg(not(feature = "parallel"))]
        let pair_energy: f64 = group_pairs
            .iter()
            .map(|&(i, j)| self.group_to_group(space, frame, i, j))
            .sum();

        let internal: f64 = (0..space.groups.len())
            .map(|g| self.group_internal(space, frame, g))
            .sum();

        pair_energy + internal + self.external_energy(space)
    }

    /// Sum of the configured external terms.
    pub fn external_energy(&self, space: &Space) -> f64 {
        self.external.iter().map(|term| term.energy(space)).sum()
    }
}
