use super::{MoveError, MoveStatistics, TrialMove};
use crate::core::models::particle::Particle;
use crate::core::models::space::{Frame, Space};
use crate::core::models::species::{Species, SpeciesId, SpeciesRegistry};
use crate::core::stats::Average;
use crate::engine::hamiltonian::Hamiltonian;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::index::sample;

#[derive(Debug, Clone)]
enum Trial {
    None,
    Insert(Vec<Particle>),
    Delete(Vec<usize>),
    /// Deletion was drawn but the reservoir group holds too few ions; the
    /// trial is rejected, not an error.
    Blocked,
}

/// Grand-canonical insertion and deletion of salt ion pairs.
///
/// Charge neutrality is maintained by always inserting or deleting the
/// minimal stoichiometric combination of cations and anions derived from
/// the two valencies. Acceptance includes the activity terms
/// `ln(z V / (N + 1))` per inserted ion and `ln(N / (z V))` per deleted
/// ion, with activities taken from the species registry.
#[derive(Debug, Clone)]
pub struct GrandCanonicalSalt {
    salt_group: usize,
    cation: SpeciesId,
    anion: SpeciesId,
    cation_template: Species,
    anion_template: Species,
    cation_count: usize,
    anion_count: usize,
    cation_activity: f64,
    anion_activity: f64,
    run_fraction: f64,
    trial: Trial,
    statistics: MoveStatistics,
    cation_density: Average,
    anion_density: Average,
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl GrandCanonicalSalt {
    pub fn new(
        registry: &SpeciesRegistry,
        salt_group: usize,
        cation_name: &str,
        anion_name: &str,
    ) -> Result<Self, MoveError> {
        let cation = registry
            .id_of(cation_name)
            .map_err(|_| MoveError::MissingActivity(cation_name.to_string()))?;
        let anion = registry
            .id_of(anion_name)
            .map_err(|_| MoveError::MissingActivity(anion_name.to_string()))?;
        let cation_species = registry.get(cation).unwrap().clone();
        let anion_species = registry.get(anion).unwrap().clone();

        let cation_activity = cation_species
            .activity
            .ok_or_else(|| MoveError::MissingActivity(cation_species.name.clone()))?;
        let anion_activity = anion_species
            .activity
            .ok_or_else(|| MoveError::MissingActivity(anion_species.name.clone()))?;

        let cation_valency = cation_species.charge.round().abs() as u64;
        let anion_valency = anion_species.charge.round().abs() as u64;
        let divisor = gcd(cation_valency.max(1), anion_valency.max(1));

        Ok(Self {
            salt_group,
            cation,
            anion,
            cation_template: cation_species,
            anion_template: anion_species,
            cation_count: (anion_valency.max(1) / divisor) as usize,
            anion_count: (cation_valency.max(1) / divisor) as usize,
            cation_activity,
            anion_activity,
            run_fraction: 1.0,
            trial: Trial::None,
            statistics: MoveStatistics::default(),
            cation_density: Average::new(),
            anion_density: Average::new(),
        })
    }

    pub fn with_run_fraction(mut self, run_fraction: f64) -> Self {
        self.run_fraction = run_fraction;
        self
    }

    pub fn cation_density(&self) -> &Average {
        &self.cation_density
    }

    pub fn anion_density(&self) -> &Average {
        &self.anion_density
    }

    fn members_of(&self, space: &Space, species: SpeciesId) -> Vec<usize> {
        space.groups[self.salt_group]
            .range
            .clone()
            .filter(|&i| space.particles[i].species == species)
            .collect()
    }

    fn sample_densities(&mut self, space: &Space) {
        let volume = space.geometry.volume();
        let cations = self.members_of(space, self.cation).len() as f64;
        let anions = self.members_of(space, self.anion).len() as f64;
        self.cation_density.add(cations / volume);
        self.anion_density.add(anions / volume);
    }
}

impl TrialMove for GrandCanonicalSalt {
    fn label(&self) -> &'static str {
        "saltbath"
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
        if rng.gen_range(0.0..1.0) < 0.5 {
            let mut inserted = Vec::with_capacity(self.cation_count + self.anion_count);
            for _ in 0..self.cation_count {
                let position = space.geometry.random_position(rng);
                inserted.push(Particle::from_species(
                    self.cation,
                    &self.cation_template,
                    position,
                ));
            }
            for _ in 0..self.anion_count {
                let position = space.geometry.random_position(rng);
                inserted.push(Particle::from_species(
                    self.anion,
                    &self.anion_template,
                    position,
                ));
            }
            self.trial = Trial::Insert(inserted);
        } else {
            let cations = self.members_of(space, self.cation);
            let anions = self.members_of(space, self.anion);
            if cations.len() < self.cation_count || anions.len() < self.anion_count {
                self.trial = Trial::Blocked;
                return Ok(());
            }
            let mut indices: Vec<usize> = sample(rng, cations.len(), self.cation_count)
                .iter()
                .map(|k| cations[k])
                .collect();
            indices.extend(
                sample(rng, anions.len(), self.anion_count)
                    .iter()
                    .map(|k| anions[k]),
            );
            self.trial = Trial::Delete(indices);
        }
        Ok(())
    }

    fn energy_change(&mut self, space: &mut Space, hamiltonian: &Hamiltonian) -> f64 {
        let volume = space.geometry.volume();
        let cations = self.members_of(space, self.cation).len() as f64;
        let anions = self.members_of(space, self.anion).len() as f64;

        match &self.trial {
            Trial::None | Trial::Blocked => f64::INFINITY,
            Trial::Insert(particles) => {
                let du = hamiltonian.insertion_energy(space, Frame::Current, particles);
                if du.is_infinite() {
                    return f64::INFINITY;
                }
                let mut chemical = 0.0;
                for k in 1..=self.cation_count {
                    chemical -= (self.cation_activity * volume / (cations + k as f64)).ln();
                }
                for k in 1..=self.anion_count {
                    chemical -= (self.anion_activity * volume / (anions + k as f64)).ln();
                }
                du + chemical
            }
            Trial::Delete(indices) => {
                let du = -hamiltonian.deletion_energy(space, Frame::Current, indices);
                let mut chemical = 0.0;
                for k in 0..self.cation_count {
                    chemical += (self.cation_activity * volume / (cations - k as f64)).ln();
                }
                for k in 0..self.anion_count {
                    chemical += (self.anion_activity * volume / (anions - k as f64)).ln();
                }
                du + chemical
            }
        }
    }

    fn accept(&mut self, space: &mut Space) {
        match std::mem::replace(&mut self.trial, Trial::None) {
            Trial::Insert(particles) => {
                space
                    .insert_particles(self.salt_group, &particles)
                    .expect("salt group exists");
            }
            Trial::Delete(indices) => {
                space
                    .remove_particles(self.salt_group, &indices)
                    .expect("salt group exists");
            }
            Trial::None | Trial::Blocked => {}
        }
        self.sample_densities(space);
    }

    fn reject(&mut self, space: &mut Space) {
        self.trial = Trial::None;
        self.sample_densities(space);
    }
}
