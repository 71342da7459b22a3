use super::pair_matrix::PairMatrix;
use crate::core::models::species::{SpeciesId, SpeciesRegistry};

/// Rule deriving size/energy parameters for a heterogeneous species pair
/// from the per-species base values.
pub trait MixingRule {
    fn mix_sigma(&self, sigma1: f64, sigma2: f64) -> f64;
    fn mix_epsilon(&self, eps1: f64, eps2: f64) -> f64;
}

/// Arithmetic mean of diameters, geometric mean of well depths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LorentzBerthelot;

impl MixingRule for LorentzBerthelot {
    #[inline]
    fn mix_sigma(&self, sigma1: f64, sigma2: f64) -> f64 {
        0.5 * (sigma1 + sigma2)
    }

    #[inline]
    fn mix_epsilon(&self, eps1: f64, eps2: f64) -> f64 {
        (eps1 * eps2).sqrt()
    }
}

/// Pre-mixed sigma^2 / 4*epsilon tables for all species pairs.
///
/// Built once at potential construction; specific named pairs may be
/// overridden afterwards, bypassing the mixing rule.
#[derive(Debug, Clone, PartialEq)]
pub struct MixingTable {
    pub sigma_squared: PairMatrix<f64>,
    pub eps4: PairMatrix<f64>,
}

impl MixingTable {
    pub fn build(registry: &SpeciesRegistry, rule: &impl MixingRule) -> Self {
        let n = registry.len();
        let mut sigma_squared = PairMatrix::filled(n, 0.0);
        let mut eps4 = PairMatrix::filled(n, 0.0);
        for (i, a) in registry.iter() {
            for (j, b) in registry.iter() {
                if j < i {
                    continue;
                }
                let sigma = rule.mix_sigma(a.sigma(), b.sigma());
                let eps = rule.mix_epsilon(a.eps, b.eps);
                sigma_squared.set(i, j, sigma * sigma);
                eps4.set(i, j, 4.0 * eps);
            }
        }
        Self { sigma_squared, eps4 }
    }

    /// Overrides the mixed parameters for one species pair.
    pub fn override_pair(&mut self, i: SpeciesId, j: SpeciesId, sigma: f64, eps: f64) {
        self.sigma_squared.set(i, j, sigma * sigma);
        self.eps4.set(i, j, 4.0 * eps);
    }
}
