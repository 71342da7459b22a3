use crate::core::geometry::{Cuboid, CuboidSlit, Cylinder, Geometry, GeometryError, Sphere};
use crate::core::models::species::{Species, SpeciesRegistry};
use crate::core::potential::kernels;
use crate::core::potential::pair::{
    Coulomb, CutShift, DebyeHuckel, HardSphere, LennardJonesMixed, PairPotential,
};
use nalgebra::Vector3;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid geometry: {source}")]
    Geometry {
        #[from]
        source: GeometryError,
    },
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

fn default_temperature() -> f64 {
    298.15
}

fn default_dielectric() -> f64 {
    78.7
}

fn default_sweeps() -> u64 {
    10
}

fn default_steps() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Absolute temperature in kelvin.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Relative dielectric constant of the implicit solvent.
    #[serde(default = "default_dielectric")]
    pub dielectric: f64,
    #[serde(default = "default_sweeps")]
    pub sweeps: u64,
    #[serde(default = "default_steps")]
    pub steps_per_sweep: u64,
    #[serde(default)]
    pub seed: u64,
}

impl SystemConfig {
    pub fn bjerrum_length(&self) -> f64 {
        kernels::bjerrum_length(self.dielectric, self.temperature)
    }
}

/// Box side specification: one number for a cube or three side lengths.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LengthSpec {
    Uniform(f64),
    Sides([f64; 3]),
}

impl LengthSpec {
    fn to_vector(&self) -> Vector3<f64> {
        match self {
            Self::Uniform(side) => Vector3::new(*side, *side, *side),
            Self::Sides([x, y, z]) => Vector3::new(*x, *y, *z),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GeometryConfig {
    Sphere { radius: f64 },
    Cuboid { length: LengthSpec },
    Cuboidslit { length: LengthSpec },
    Cylinder { length: f64, radius: f64 },
}

impl GeometryConfig {
    pub fn build(&self) -> Result<Geometry, ConfigError> {
        Ok(match self {
            Self::Sphere { radius } => Geometry::Sphere(Sphere::new(*radius)?),
            Self::Cuboid { length } => Geometry::Cuboid(Cuboid::new(length.to_vector())?),
            Self::Cuboidslit { length } => {
                Geometry::CuboidSlit(CuboidSlit::new(length.to_vector())?)
            }
            Self::Cylinder { length, radius } => {
                Geometry::Cylinder(Cylinder::new(*length, *radius)?)
            }
        })
    }
}

/// Nonbonded potential selection, mirroring the common pre-combined forms.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PotentialConfig {
    /// Bare Coulomb plus hard spheres.
    #[default]
    PrimitiveModel,
    Coulomb,
    LennardJones,
    CoulombLennardJones,
    DebyeHuckel {
        #[serde(default)]
        ionic_strength: Option<f64>,
        #[serde(default)]
        debye_length: Option<f64>,
    },
    DebyeHuckelLennardJones {
        #[serde(default)]
        ionic_strength: Option<f64>,
        #[serde(default)]
        debye_length: Option<f64>,
        #[serde(default)]
        cutoff: Option<f64>,
    },
}

impl PotentialConfig {
    fn screened(
        bjerrum: f64,
        ionic_strength: Option<f64>,
        debye_length: Option<f64>,
    ) -> Result<DebyeHuckel, ConfigError> {
        match (ionic_strength, debye_length) {
            (Some(ionic_strength), _) => {
                Ok(DebyeHuckel::from_ionic_strength(bjerrum, ionic_strength))
            }
            (None, Some(debye_length)) if debye_length > 0.0 => {
                Ok(DebyeHuckel::new(bjerrum, 1.0 / debye_length))
            }
            _ => Err(ConfigError::Validation(
                "debye-huckel potentials need 'ionic_strength' or a positive 'debye_length'"
                    .into(),
            )),
        }
    }

    pub fn build(
        &self,
        registry: &SpeciesRegistry,
        bjerrum: f64,
    ) -> Result<PairPotential, ConfigError> {
        Ok(match self {
            Self::PrimitiveModel => {
                PairPotential::from(Coulomb::new(bjerrum)) + PairPotential::from(HardSphere)
            }
            Self::Coulomb => Coulomb::new(bjerrum).into(),
            Self::LennardJones => LennardJonesMixed::new(registry).into(),
            Self::CoulombLennardJones => {
                PairPotential::from(Coulomb::new(bjerrum))
                    + PairPotential::from(LennardJonesMixed::new(registry))
            }
            Self::DebyeHuckel {
                ionic_strength,
                debye_length,
            } => Self::screened(bjerrum, *ionic_strength, *debye_length)?.into(),
            Self::DebyeHuckelLennardJones {
                ionic_strength,
                debye_length,
                cutoff,
            } => {
                let screened = Self::screened(bjerrum, *ionic_strength, *debye_length)?;
                let electrostatics = match cutoff {
                    Some(cutoff) => {
                        CutShift::precalculated(screened.into(), *cutoff, registry).into()
                    }
                    None => PairPotential::from(screened),
                };
                electrostatics + PairPotential::from(LennardJonesMixed::new(registry))
            }
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslateConfig {
    pub displacement: f64,
    #[serde(default = "default_run_fraction")]
    pub run_fraction: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslateRotateConfig {
    pub displacement: f64,
    /// Maximum rotation angle in radians.
    pub rotation: f64,
    #[serde(default = "default_run_fraction")]
    pub run_fraction: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeConfig {
    pub volume_displacement: f64,
    /// Pressure in kT per cubic angstrom.
    pub pressure: f64,
    #[serde(default = "default_run_fraction")]
    pub run_fraction: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaltConfig {
    pub cation: String,
    pub anion: String,
    #[serde(default = "default_run_fraction")]
    pub run_fraction: f64,
}

fn default_run_fraction() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovesConfig {
    pub translate: Option<TranslateConfig>,
    pub transrot: Option<TranslateRotateConfig>,
    pub volume: Option<VolumeConfig>,
    pub salt: Option<SaltConfig>,
}

/// One species entry of the run file: the physical parameters plus how many
/// particles to place at setup.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesConfig {
    #[serde(flatten)]
    pub species: Species,
    #[serde(default)]
    pub count: usize,
}

/// A complete simulation run description loaded from a TOML document.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub system: SystemConfig,
    pub geometry: GeometryConfig,
    pub species: Vec<SpeciesConfig>,
    #[serde(default)]
    pub potential: PotentialConfig,
    #[serde(default)]
    pub moves: MovesConfig,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.system.temperature <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "temperature must be positive, got {}",
                self.system.temperature
            )));
        }
        if self.system.dielectric <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "dielectric constant must be positive, got {}",
                self.system.dielectric
            )));
        }
        if self.species.is_empty() {
            return Err(ConfigError::Validation(
                "at least one species must be defined".into(),
            ));
        }
        Ok(())
    }

    pub fn build_registry(&self) -> Result<SpeciesRegistry, ConfigError> {
        let mut registry = SpeciesRegistry::new();
        for entry in &self.species {
            registry
                .register(entry.species.clone())
                .map_err(|e| ConfigError::Validation(e.to_string()))?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const RUN_FILE: &str = r#"
        [system]
        temperature = 298.15
        dielectric = 78.7
        sweeps = 5
        steps_per_sweep = 100
        seed = 7

        [geometry]
        kind = "cuboid"
        length = 80.0

        [[species]]
        name = "Na"
        charge = 1.0
        radius = 1.9
        activity = 1e-4
        count = 20

        [[species]]
        name = "Cl"
        charge = -1.0
        radius = 2.1
        activity = 1e-4
        count = 20

        [potential]
        kind = "debye-huckel"
        ionic_strength = 0.1

        [moves.translate]
        displacement = 0.5

        [moves.salt]
        cation = "Na"
        anion = "Cl"
    "#;

    fn write_run_file(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_a_complete_run_file() {
        let (_dir, path) = write_run_file(RUN_FILE);
        let config = RunConfig::load(&path).unwrap();

        assert_eq!(config.system.sweeps, 5);
        assert_eq!(config.system.seed, 7);
        assert_eq!(config.species.len(), 2);
        assert_eq!(config.species[0].count, 20);
        assert!(config.moves.translate.is_some());
        assert!(config.moves.volume.is_none());
        assert!(matches!(
            config.potential,
            PotentialConfig::DebyeHuckel { .. }
        ));
    }

    #[test]
    fn geometry_section_builds_the_right_variant() {
        let (_dir, path) = write_run_file(RUN_FILE);
        let config = RunConfig::load(&path).unwrap();
        let geometry = config.geometry.build().unwrap();
        assert!(matches!(geometry, Geometry::Cuboid(_)));
        assert!((geometry.volume() - 80f64.powi(3)).abs() < 1e-6);
    }

    #[test]
    fn defaults_fill_in_missing_system_keys() {
        let minimal = r#"
            [system]

            [geometry]
            kind = "sphere"
            radius = 50.0

            [[species]]
            name = "P"
            radius = 10.0
        "#;
        let (_dir, path) = write_run_file(minimal);
        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.system.temperature, 298.15);
        assert_eq!(config.system.steps_per_sweep, 1000);
        // Room-temperature water: the Bjerrum length comes out near 7 A.
        assert!((config.system.bjerrum_length() - 7.12).abs() < 0.02);
    }

    #[test]
    fn negative_temperature_is_rejected() {
        let broken = RUN_FILE.replace("temperature = 298.15", "temperature = -10.0");
        let (_dir, path) = write_run_file(&broken);
        let result = RunConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn debye_huckel_without_screening_input_is_rejected() {
        let (_dir, path) = write_run_file(RUN_FILE);
        let config = RunConfig::load(&path).unwrap();
        let registry = config.build_registry().unwrap();

        let incomplete = PotentialConfig::DebyeHuckel {
            ionic_strength: None,
            debye_length: None,
        };
        let result = incomplete.build(&registry, 7.1);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn anisotropic_box_lengths_are_accepted() {
        let slab = r#"
            [system]

            [geometry]
            kind = "cuboidslit"
            length = [60.0, 60.0, 30.0]

            [[species]]
            name = "P"
            radius = 2.0
        "#;
        let (_dir, path) = write_run_file(slab);
        let config = RunConfig::load(&path).unwrap();
        let geometry = config.geometry.build().unwrap();
        assert!((geometry.volume() - 60.0 * 60.0 * 30.0).abs() < 1e-6);
    }

    #[test]
    fn registry_rejects_duplicate_species_names() {
        let duplicated = RUN_FILE.replace("name = \"Cl\"", "name = \"Na\"");
        let (_dir, path) = write_run_file(&duplicated);
        let config = RunConfig::load(&path).unwrap();
        assert!(matches!(
            config.build_registry(),
            Err(ConfigError::Validation(_))
        ));
    }
}
