use super::species::{Species, SpeciesId};
use nalgebra::Point3;

/// A point particle in the simulation cell.
///
/// Particles carry the physical properties evaluated by the pair-potential
/// kernels: position, charge, hard-core radius and the species they belong
/// to. They are owned by the particle collection in [`Space`] and mutated in
/// place by Monte Carlo moves; they are never allocated independently.
///
/// [`Space`]: crate::core::models::space::Space
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Position in angstrom.
    pub position: Point3<f64>,
    /// Charge in elementary charge units.
    pub charge: f64,
    /// Hard-core radius in angstrom.
    pub radius: f64,
    /// Species this particle belongs to.
    pub species: SpeciesId,
    /// Whether the particle participates in hydrophobic attraction.
    pub hydrophobic: bool,
    /// Unitless excess polarizability for charge-nonpolar interactions.
    pub alpha: f64,
}

impl Particle {
    /// Creates a particle of the given species at `position`, copying the
    /// species' physical properties.
    pub fn from_species(id: SpeciesId, species: &Species, position: Point3<f64>) -> Self {
        Self {
            position,
            charge: species.charge,
            radius: species.radius,
            species: id,
            hydrophobic: species.hydrophobic,
            alpha: species.alpha,
        }
    }

    /// Contact distance to another particle (sum of hard-core radii).
    #[inline]
    pub fn contact_distance(&self, other: &Self) -> f64 {
        self.radius + other.radius
    }
}
