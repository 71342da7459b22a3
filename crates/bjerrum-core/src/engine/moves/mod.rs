//! # Move Engine Module
//!
//! Trial-move generation, energy-delta evaluation and Metropolis
//! acceptance.
//!
//! Every move follows the same life cycle, driven by [`perform`]:
//! propose a trial perturbation into the space's trial buffer, report the
//! **full** energy change of the trial (including auxiliary terms such as pV
//! work or chemical potentials), then commit or discard on the Metropolis
//! verdict. A trial is atomic; it always completes to accepted or rejected
//! before the next one begins.
//!
//! - [`translate`] - single-particle translation
//! - [`transrot`] - rigid group translation and rotation
//! - [`cluster`] - cluster drags and non-rejective cluster translation
//! - [`polymer`] - crank-shaft, pivot and reptation chain moves
//! - [`volume`] - isobaric volume displacement
//! - [`gcmc`] - grand-canonical salt insertion and deletion
//! - [`temper`] - replica exchange over an abstract transport

pub mod cluster;
pub mod gcmc;
pub mod polymer;
pub mod temper;
pub mod translate;
pub mod transrot;
pub mod volume;

use crate::core::models::space::Space;
use crate::core::stats::Average;
use crate::engine::hamiltonian::Hamiltonian;
use nalgebra::Vector3;
use rand::Rng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("Move '{0}' was run without a target group or particle")]
    NoTarget(&'static str),
    #[error("Move '{0}' requires a non-empty mobile set")]
    EmptyMobileSet(&'static str),
    #[error("Group '{group}' is too small for move '{move_name}'")]
    GroupTooSmall {
        move_name: &'static str,
        group: String,
    },
    #[error("Move '{0}' requires a fully periodic geometry")]
    RequiresPeriodic(&'static str),
    #[error("Species '{0}' has no activity configured")]
    MissingActivity(String),
    #[error("Replica transport failed: {source}")]
    Transport {
        #[from]
        source: temper::TransportError,
    },
}

/// Metropolis criterion: accept if the energy change is non-positive or
/// with probability `exp(-du)` otherwise.
///
/// Non-finite energy changes (overlap sentinels, NaN) always reject.
#[inline]
pub fn metropolis(du: f64, rng: &mut StdRng) -> bool {
    if du <= 0.0 {
        return true;
    }
    if !du.is_finite() {
        return false;
    }
    rng.gen_range(0.0..1.0) < (-du).exp()
}

/// Acceptance and displacement bookkeeping for one move.
///
/// Observational only; never consulted by acceptance decisions.
#[derive(Debug, Clone, Default)]
pub struct MoveStatistics {
    /// Total trial count, including attempts skipped by the run fraction.
    pub attempts: u64,
    pub accepted: u64,
    /// Sum of all accepted energy changes.
    pub energy_change_sum: f64,
    /// Mean-square displacement of whatever the move displaces.
    pub mean_square_displacement: Average,
}

impl MoveStatistics {
    pub fn acceptance(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.attempts as f64
    }
}

/// Acceptance ratio and mean-square displacement keyed by move identity
/// (species id, group name, partner rank).
#[derive(Debug, Clone, Default)]
pub struct AcceptanceMap<K: Ord> {
    acceptance: BTreeMap<K, Average>,
    displacement: BTreeMap<K, Average>,
}

impl<K: Ord + Clone> AcceptanceMap<K> {
    pub fn new() -> Self {
        Self {
            acceptance: BTreeMap::new(),
            displacement: BTreeMap::new(),
        }
    }

    pub fn accept(&mut self, key: K, square_displacement: f64) {
        self.acceptance.entry(key.clone()).or_default().add(1.0);
        self.displacement
            .entry(key)
            .or_default()
            .add(square_displacement);
    }

    pub fn reject(&mut self, key: K) {
        self.acceptance.entry(key).or_default().add(0.0);
    }

    pub fn acceptance_of(&self, key: &K) -> Option<f64> {
        self.acceptance.get(key).map(Average::avg)
    }

    pub fn mean_square_displacement_of(&self, key: &K) -> Option<f64> {
        self.displacement.get(key).map(Average::avg)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.acceptance.iter().map(|(k, avg)| (k, avg.avg()))
    }
}

/// Contract every Monte Carlo move implements.
///
/// `propose` writes a trial perturbation into the space's trial buffer,
/// `energy_change` returns the full energy change of that trial, and
/// `accept`/`reject` commit or restore so the space is consistent again.
/// The state machine is driven exclusively by [`perform`]; implementations
/// must not apply the Metropolis test themselves.
pub trait TrialMove {
    fn label(&self) -> &'static str;

    /// Fraction of `perform` iterations that actually attempt the move.
    fn run_fraction(&self) -> f64 {
        1.0
    }

    fn statistics(&self) -> &MoveStatistics;

    fn statistics_mut(&mut self) -> &mut MoveStatistics;

    fn propose(&mut self, space: &mut Space, rng: &mut StdRng) -> Result<(), MoveError>;

    fn energy_change(&mut self, space: &mut Space, hamiltonian: &Hamiltonian) -> f64;

    fn accept(&mut self, space: &mut Space);

    fn reject(&mut self, space: &mut Space);

    /// Energy booked on acceptance instead of the value returned by
    /// `energy_change`, for moves whose acceptance value is not the energy
    /// actually deposited in the chain (non-rejective cluster translation,
    /// replica exchange).
    fn alternate_energy(&self) -> Option<f64> {
        None
    }
}

/// Attempts a move `n` times and returns the summed accepted energy change.
///
/// Attempts skipped by the run-fraction gate count toward the trial total
/// but contribute no energy change.
pub fn perform(
    mv: &mut dyn TrialMove,
    space: &mut Space,
    hamiltonian: &Hamiltonian,
    rng: &mut StdRng,
    attempts: usize,
) -> Result<f64, MoveError> {
    let mut total = 0.0;
    for _ in 0..attempts {
        mv.statistics_mut().attempts += 1;
        let run_fraction = mv.run_fraction();
        if run_fraction < 1.0 && rng.gen_range(0.0..1.0) > run_fraction {
            continue;
        }
        mv.propose(space, rng)?;
        let du = mv.energy_change(space, hamiltonian);
        if metropolis(du, rng) {
            mv.accept(space);
            let booked = mv.alternate_energy().unwrap_or(du);
            let stats = mv.statistics_mut();
            stats.accepted += 1;
            stats.energy_change_sum += booked;
            total += booked;
        } else {
            mv.reject(space);
        }
    }
    Ok(total)
}

/// Uniformly distributed unit vector, by rejection from the unit cube.
pub(crate) fn random_unit_vector(rng: &mut StdRng) -> Vector3<f64> {
    loop {
        let v: Vector3<f64> = Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let norm_squared = v.norm_squared();
        if norm_squared > 1e-6 && norm_squared < 1.0 {
            return v / norm_squared.sqrt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn metropolis_always_accepts_downhill_moves() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            assert!(metropolis(-5.0, &mut rng));
            assert!(metropolis(0.0, &mut rng));
        }
    }

    #[test]
    fn metropolis_never_accepts_huge_barriers() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut accepted = 0;
        for _ in 0..10_000 {
            if metropolis(1e6, &mut rng) {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 0);
    }

    #[test]
    fn metropolis_rejects_infinite_and_nan_energies() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(!metropolis(f64::INFINITY, &mut rng));
        assert!(!metropolis(f64::NAN, &mut rng));
    }

    #[test]
    fn metropolis_accepts_small_barriers_at_the_boltzmann_rate() {
        let mut rng = StdRng::seed_from_u64(4);
        let du = 1.0;
        let n = 100_000;
        let accepted = (0..n).filter(|_| metropolis(du, &mut rng)).count();
        let ratio = accepted as f64 / n as f64;
        assert!((ratio - (-du).exp()).abs() < 0.01);
    }

    #[test]
    fn acceptance_map_tracks_ratio_and_displacement_per_key() {
        let mut map: AcceptanceMap<u32> = AcceptanceMap::new();
        map.accept(1, 4.0);
        map.accept(1, 16.0);
        map.reject(1);
        map.reject(2);

        assert!((map.acceptance_of(&1).unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(map.mean_square_displacement_of(&1), Some(10.0));
        assert_eq!(map.acceptance_of(&2), Some(0.0));
        assert_eq!(map.acceptance_of(&3), None);
    }

    #[test]
    fn random_unit_vectors_are_normalized() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let v = random_unit_vector(&mut rng);
            assert!((v.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn statistics_report_zero_acceptance_without_attempts() {
        let stats = MoveStatistics::default();
        assert_eq!(stats.acceptance(), 0.0);
    }
}
