use super::pair::PairPotential;
use super::pair_matrix::PairMatrix;
use crate::core::models::particle::Particle;
use crate::core::models::space::Space;
use crate::core::models::species::{SpeciesId, SpeciesRegistry};
use nalgebra::Vector3;
use std::collections::HashMap;

/// Per-pair kernel dispatch with a default fallback.
///
/// Maps an unordered pair of species ids to a dedicated potential; pairs
/// without an override use the default. This is how special ion-pair
/// corrections are mixed into an otherwise generic nonbonded potential.
#[derive(Debug, Clone)]
pub struct PotentialMap {
    default_potential: PairPotential,
    overrides: HashMap<(SpeciesId, SpeciesId), PairPotential>,
}

fn ordered(i: SpeciesId, j: SpeciesId) -> (SpeciesId, SpeciesId) {
    if i <= j { (i, j) } else { (j, i) }
}

impl PotentialMap {
    pub fn new(default_potential: PairPotential) -> Self {
        Self {
            default_potential,
            overrides: HashMap::new(),
        }
    }

    /// Registers a dedicated potential for one species pair.
    pub fn add(&mut self, i: SpeciesId, j: SpeciesId, potential: PairPotential) {
        self.overrides.insert(ordered(i, j), potential);
    }

    fn select(&self, i: SpeciesId, j: SpeciesId) -> &PairPotential {
        self.overrides
            .get(&ordered(i, j))
            .unwrap_or(&self.default_potential)
    }

    /// Energy in kT between two particles at squared distance `r2`.
    #[inline]
    pub fn energy(&self, a: &Particle, b: &Particle, r2: f64) -> f64 {
        self.select(a.species, b.species).energy(a, b, r2)
    }

    /// Force on particle `b`; `dr` is the minimum-image vector `b - a`.
    pub fn force(&self, a: &Particle, b: &Particle, r2: f64, dr: &Vector3<f64>) -> Vector3<f64> {
        self.select(a.species, b.species).force(a, b, r2, dr)
    }

    /// Squared cutoffs per species pair: the default's table with overridden
    /// entries replaced by their own cutoffs.
    pub fn cutoff_squared(&self, registry: &SpeciesRegistry) -> PairMatrix<f64> {
        let mut matrix = self.default_potential.cutoff_squared(registry);
        for (&(i, j), potential) in &self.overrides {
            let own = potential.cutoff_squared(registry);
            matrix.set(i, j, own.get(i, j));
        }
        matrix
    }

    /// Propagates a screening recalibration to every registered potential.
    pub fn rescale_screening(&mut self, space: &Space) {
        self.default_potential.rescale_screening(space);
        for potential in self.overrides.values_mut() {
            potential.rescale_screening(space);
        }
    }

    pub fn name(&self) -> String {
        if self.overrides.is_empty() {
            format!("{} (default)", self.default_potential.name())
        } else {
            format!(
                "{} (default, {} pair overrides)",
                self.default_potential.name(),
                self.overrides.len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::potential::pair::{Coulomb, Harmonic, SquareWell};
    use crate::core::models::species::{Species, SpeciesRegistry};
    use nalgebra::Point3;

    fn registry() -> SpeciesRegistry {
        let mut registry = SpeciesRegistry::new();
        for (name, charge) in [("Na", 1.0), ("Cl", -1.0), ("CH4", 0.0)] {
            registry
                .register(Species {
                    name: name.into(),
                    charge,
                    radius: 2.0,
                    eps: 0.1,
                    hydrophobic: false,
                    alpha: 0.0,
                    activity: None,
                })
                .unwrap();
        }
        registry
    }

    fn particle(registry: &SpeciesRegistry, name: &str) -> Particle {
        let id = registry.id_of(name).unwrap();
        Particle::from_species(id, registry.get(id).unwrap(), Point3::origin())
    }

    #[test]
    fn unregistered_pairs_fall_back_to_the_default() {
        let registry = registry();
        let map = PotentialMap::new(Coulomb::new(7.1).into());
        let na = particle(&registry, "Na");
        let cl = particle(&registry, "Cl");
        let expected = PairPotential::from(Coulomb::new(7.1)).energy(&na, &cl, 100.0);
        assert_eq!(map.energy(&na, &cl, 100.0), expected);
    }

    #[test]
    fn overrides_replace_the_default_for_their_pair_only() {
        let registry = registry();
        let mut map = PotentialMap::new(Coulomb::new(7.1).into());
        let na = particle(&registry, "Na");
        let cl = particle(&registry, "Cl");
        let methane = particle(&registry, "CH4");

        map.add(na.species, methane.species, Harmonic::new(1.0, 5.0).into());

        // Overridden pair: harmonic, evaluated at r = 7 -> k (r - req)^2 = 4.
        assert_eq!(map.energy(&na, &methane, 49.0), 4.0);
        // Lookup is unordered.
        assert_eq!(map.energy(&methane, &na, 49.0), 4.0);
        // Other pairs still see the default.
        let expected = PairPotential::from(Coulomb::new(7.1)).energy(&na, &cl, 49.0);
        assert_eq!(map.energy(&na, &cl, 49.0), expected);
    }

    #[test]
    fn cutoff_matrix_uses_override_cutoffs_where_registered() {
        let registry = registry();
        let mut map = PotentialMap::new(Coulomb::new(7.1).into());
        let i = registry.id_of("Na").unwrap();
        let j = registry.id_of("CH4").unwrap();
        map.add(i, j, SquareWell::new(3.0, 1.0).into());

        let matrix = map.cutoff_squared(&registry);
        // Coulomb has no cutoff.
        assert!(matrix.get(0, 1).is_infinite());
        // The square well cuts off at contact + width = 7.
        assert_eq!(matrix.get(i, j), 49.0);
    }
}
