use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Tabulated potential needs at least three samples, got {0}")]
    TooFewSamples(usize),
}

#[derive(Debug, Deserialize)]
struct TableRecord {
    distance: f64,
    energy: f64,
}

/// Pair potential interpolated from `(distance, energy)` samples.
///
/// Local quadratics are fitted through consecutive sample triples once at
/// construction; evaluation locates the bracketing interval and evaluates
/// its quadratic. Outside the tabulated domain the energy is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedPotential {
    x: Vec<f64>,
    // One (alpha, beta, gamma) triple per interior sample.
    coefficients: Vec<[f64; 3]>,
}

impl TabulatedPotential {
    /// Builds the interpolation from raw samples, in any order.
    ///
    /// # Errors
    ///
    /// Fails fatally with fewer than three samples.
    pub fn from_samples(mut samples: Vec<(f64, f64)>) -> Result<Self, TableError> {
        if samples.len() < 3 {
            return Err(TableError::TooFewSamples(samples.len()));
        }
        samples.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let x: Vec<f64> = samples.iter().map(|s| s.0).collect();
        let y: Vec<f64> = samples.iter().map(|s| s.1).collect();

        let mut coefficients = Vec::with_capacity(x.len() - 2);
        for i in 1..x.len() - 1 {
            let (x0, x1, x2) = (x[i - 1], x[i], x[i + 1]);
            let (y0, y1, y2) = (y[i - 1], y[i], y[i + 1]);
            let alpha = ((y1 - y0) * (x2 - x0) - (y2 - y0) * (x1 - x0))
                / ((x1 * x1 - x0 * x0) * (x2 - x0) - (x2 * x2 - x0 * x0) * (x1 - x0));
            let beta = ((y1 - y0) - alpha * (x1 * x1 - x0 * x0)) / (x1 - x0);
            let gamma = y0 - alpha * x0 * x0 - beta * x0;
            coefficients.push([alpha, beta, gamma]);
        }
        Ok(Self { x, coefficients })
    }

    /// Loads a two-column CSV table with `distance,energy` headers.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| TableError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let mut samples = Vec::new();
        for result in reader.deserialize::<TableRecord>() {
            let record = result.map_err(|e| TableError::Csv {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
            samples.push((record.distance, record.energy));
        }
        Self::from_samples(samples)
    }

    pub fn min_distance(&self) -> f64 {
        self.x[0]
    }

    pub fn max_distance(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    /// Energy in kT at squared distance `r2`; zero outside the domain.
    pub fn energy(&self, r2: f64) -> f64 {
        let r = r2.sqrt();
        if r < self.min_distance() || r > self.max_distance() {
            return 0.0;
        }
        // Number of samples strictly below r, clamped to an interior knot.
        let below = self.x.partition_point(|&x| x < r);
        let center = below.clamp(1, self.x.len() - 2);
        let [alpha, beta, gamma] = self.coefficients[center - 1];
        alpha * r * r + beta * r + gamma
    }
}
