use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Index of a species in the [`SpeciesRegistry`].
pub type SpeciesId = usize;

#[derive(Debug, Error)]
pub enum SpeciesError {
    #[error("Species '{0}' is already registered")]
    Duplicate(String),
    #[error("Unknown species '{0}'")]
    Unknown(String),
    #[error("Species '{name}' has non-positive radius {radius}")]
    InvalidRadius { name: String, radius: f64 },
}

/// Per-type physical parameters for one particle species.
///
/// The Lennard-Jones diameter is taken as two times `radius`; `eps` is the
/// well depth in kT used by the mixing rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Species {
    pub name: String,
    /// Charge in elementary charge units.
    #[serde(default)]
    pub charge: f64,
    /// Hard-core radius in angstrom.
    pub radius: f64,
    /// Dispersion well depth in kT.
    #[serde(default)]
    pub eps: f64,
    #[serde(default)]
    pub hydrophobic: bool,
    /// Unitless excess polarizability.
    #[serde(default)]
    pub alpha: f64,
    /// Activity (number density, 1/angstrom cubed) for grand-canonical moves.
    #[serde(default)]
    pub activity: Option<f64>,
}

impl Species {
    /// Lennard-Jones diameter, sigma, in angstrom.
    #[inline]
    pub fn sigma(&self) -> f64 {
        2.0 * self.radius
    }
}

/// Registry of all particle species known to a simulation.
///
/// Built once at setup and passed by reference into every component that
/// needs per-type lookups (mixing rules, pair matrices, grand-canonical
/// moves). There is deliberately no global species table.
#[derive(Debug, Clone, Default)]
pub struct SpeciesRegistry {
    species: Vec<Species>,
    by_name: HashMap<String, SpeciesId>,
}

impl SpeciesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a species and returns its id.
    ///
    /// # Errors
    ///
    /// Fails on duplicate names or a non-positive radius; both indicate
    /// unusable configuration input.
    pub fn register(&mut self, species: Species) -> Result<SpeciesId, SpeciesError> {
        if species.radius <= 0.0 {
            return Err(SpeciesError::InvalidRadius {
                name: species.name.clone(),
                radius: species.radius,
            });
        }
        if self.by_name.contains_key(&species.name) {
            return Err(SpeciesError::Duplicate(species.name.clone()));
        }
        let id = self.species.len();
        self.by_name.insert(species.name.clone(), id);
        self.species.push(species);
        Ok(id)
    }

    pub fn get(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(id)
    }

    pub fn id_of(&self, name: &str) -> Result<SpeciesId, SpeciesError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| SpeciesError::Unknown(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &Species)> {
        self.species.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ion(name: &str, charge: f64) -> Species {
        Species {
            name: name.into(),
            charge,
            radius: 2.0,
            eps: 0.05,
            hydrophobic: false,
            alpha: 0.0,
            activity: None,
        }
    }

    #[test]
    fn register_assigns_sequential_ids() {
        let mut registry = SpeciesRegistry::new();
        let na = registry.register(ion("Na", 1.0)).unwrap();
        let cl = registry.register(ion("Cl", -1.0)).unwrap();
        assert_eq!(na, 0);
        assert_eq!(cl, 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn id_of_resolves_registered_names() {
        let mut registry = SpeciesRegistry::new();
        registry.register(ion("Na", 1.0)).unwrap();
        assert_eq!(registry.id_of("Na").unwrap(), 0);
        assert!(matches!(registry.id_of("K"), Err(SpeciesError::Unknown(_))));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = SpeciesRegistry::new();
        registry.register(ion("Na", 1.0)).unwrap();
        let result = registry.register(ion("Na", 1.0));
        assert!(matches!(result, Err(SpeciesError::Duplicate(_))));
    }

    #[test]
    fn non_positive_radius_is_rejected() {
        let mut registry = SpeciesRegistry::new();
        let mut bad = ion("ghost", 0.0);
        bad.radius = 0.0;
        assert!(matches!(
            registry.register(bad),
            Err(SpeciesError::InvalidRadius { .. })
        ));
    }

    #[test]
    fn sigma_is_twice_the_radius() {
        let species = ion("Ca", 2.0);
        assert_eq!(species.sigma(), 4.0);
    }
}
