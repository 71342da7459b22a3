use tracing::warn;

/// Detects cumulative floating-point drift between the incrementally
/// tracked system energy and a full recomputation.
///
/// Every accepted move's energy change is accumulated; at checkpoints the
/// caller recomputes the total energy from scratch and `check` reports the
/// discrepancy. Drift beyond the tolerance is logged, never auto-corrected.
#[derive(Debug, Clone)]
pub struct EnergyDrift {
    initial: f64,
    accumulated: f64,
    tolerance: f64,
}

impl EnergyDrift {
    const DEFAULT_TOLERANCE: f64 = 1e-9;

    /// Starts tracking from a freshly computed total energy.
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            accumulated: 0.0,
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Accumulates the energy change of an accepted move.
    pub fn track(&mut self, delta: f64) {
        if delta.is_finite() {
            self.accumulated += delta;
        }
    }

    /// The energy the running total predicts.
    pub fn expected(&self) -> f64 {
        self.initial + self.accumulated
    }

    /// Compares a freshly recomputed total against the running total and
    /// returns the drift. A breach of the relative tolerance is reported.
    pub fn check(&self, recomputed: f64) -> f64 {
        let drift = recomputed - self.expected();
        if drift.abs() > self.tolerance * recomputed.abs().max(1.0) {
            warn!(
                drift,
                expected = self.expected(),
                recomputed,
                "energy drift beyond tolerance"
            );
        }
        drift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_energy_follows_tracked_deltas() {
        let mut drift = EnergyDrift::new(10.0);
        drift.track(-2.5);
        drift.track(1.0);
        assert!((drift.expected() - 8.5).abs() < 1e-12);
    }

    #[test]
    fn check_returns_the_discrepancy() {
        let mut drift = EnergyDrift::new(0.0);
        drift.track(5.0);
        let d = drift.check(5.0 + 1e-3);
        assert!((d - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn infinite_deltas_are_ignored() {
        let mut drift = EnergyDrift::new(1.0);
        drift.track(f64::INFINITY);
        assert_eq!(drift.expected(), 1.0);
    }

    #[test]
    fn zero_drift_for_exact_bookkeeping() {
        let mut drift = EnergyDrift::new(-3.0);
        for delta in [0.5, -1.5, 2.0] {
            drift.track(delta);
        }
        assert_eq!(drift.check(-2.0), 0.0);
    }
}
