use crate::core::models::space::Space;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("TOML parsing error for '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Snapshot holds {snapshot} particles but the space holds {space}")]
    CountMismatch { snapshot: usize, space: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub species: usize,
    pub charge: f64,
    pub radius: f64,
    pub position: [f64; 3],
    #[serde(default)]
    pub hydrophobic: bool,
    #[serde(default)]
    pub alpha: f64,
}

/// Order-stable snapshot of the particle configuration and cell volume.
///
/// Particles are written in collection order so a snapshot can be applied
/// back onto the space that produced it. The format is plain TOML; it is a
/// persistence contract, not a trajectory format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceSnapshot {
    pub volume: f64,
    pub particles: Vec<ParticleRecord>,
}

impl SpaceSnapshot {
    /// Captures the committed configuration of a space.
    pub fn capture(space: &Space) -> Self {
        Self {
            volume: space.geometry.volume(),
            particles: space
                .particles
                .iter()
                .map(|p| ParticleRecord {
                    species: p.species,
                    charge: p.charge,
                    radius: p.radius,
                    position: [p.position.x, p.position.y, p.position.z],
                    hydrophobic: p.hydrophobic,
                    alpha: p.alpha,
                })
                .collect(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let content = toml::to_string(self)?;
        std::fs::write(path, content).map_err(|e| SnapshotError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|e| SnapshotError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| SnapshotError::Parse {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Applies the snapshot onto a space with matching particle count,
    /// restoring volume, coordinates and per-particle properties, and
    /// bringing the trial buffer and mass-center caches back in sync.
    pub fn apply(&self, space: &mut Space) -> Result<(), SnapshotError> {
        if self.particles.len() != space.len() {
            return Err(SnapshotError::CountMismatch {
                snapshot: self.particles.len(),
                space: space.len(),
            });
        }
        space.geometry.set_volume(self.volume);
        for (particle, record) in space.particles.iter_mut().zip(self.particles.iter()) {
            particle.species = record.species;
            particle.charge = record.charge;
            particle.radius = record.radius;
            particle.position = Point3::new(
                record.position[0],
                record.position[1],
                record.position[2],
            );
            particle.hydrophobic = record.hydrophobic;
            particle.alpha = record.alpha;
        }
        space.restore_all();
        for index in 0..space.groups.len() {
            space.update_mass_center(index);
        }
        Ok(())
    }
}
