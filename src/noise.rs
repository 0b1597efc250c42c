/*
 * This source code is licensed under the Business Source License 1.1
 * (BUSL-1.1). Production use requires a commercial license.
 */

//! Adaptive noise floor.
//!
//! An exponential moving average of ambient jerk that only adapts toward
//! samples close to the current floor. Large, genuine motion falls outside
//! the adapt window and is ignored, so a shake cannot drag "quiet" upward.
//! This is an open-loop estimator, not a statistically optimal one.
//!
//! Out-of-range tuning is replaced field by field with the default, and an
//! update that would leave the floor non-finite is refused.

use tracing::warn;

/// Tuning for [`NoiseFloor`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NoiseConfig {
    /// Starting baseline in raw jerk units.
    pub initial_baseline: f32,
    /// EMA smoothing factor.
    pub alpha: f32,
    /// Jerk must be below `baseline + adapt_margin` to be learned from.
    pub adapt_margin: f32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            initial_baseline: 1500.0,
            alpha: 0.02,
            adapt_margin: 600.0,
        }
    }
}

impl NoiseConfig {
    /// Copy with every out-of-range field replaced by its default.
    ///
    /// `alpha` must lie in `[0, 1]`, `initial_baseline` must be finite and
    /// non-negative, and `adapt_margin` must be finite and non-negative.
    pub fn sanitized(&self) -> Self {
        let fallback = Self::default();
        let alpha = if self.alpha.is_finite() && (0.0..=1.0).contains(&self.alpha) {
            self.alpha
        } else {
            warn!(alpha = self.alpha, "noise alpha out of range, using default");
            fallback.alpha
        };
        let initial_baseline = if self.initial_baseline.is_finite() && self.initial_baseline >= 0.0
        {
            self.initial_baseline
        } else {
            warn!(baseline = self.initial_baseline, "initial baseline invalid, using default");
            fallback.initial_baseline
        };
        let adapt_margin = if self.adapt_margin.is_finite() && self.adapt_margin >= 0.0 {
            self.adapt_margin
        } else {
            warn!(margin = self.adapt_margin, "adapt margin invalid, using default");
            fallback.adapt_margin
        };
        Self { initial_baseline, alpha, adapt_margin }
    }
}

/// Running estimate of resting jitter.
#[derive(Clone, Debug)]
pub struct NoiseFloor {
    baseline: f32,
    initial: f32,
    alpha: f32,
    adapt_margin: f32,
}

impl NoiseFloor {
    /// Construct from configuration, sanitising it first.
    pub fn new(cfg: &NoiseConfig) -> Self {
        let cfg = cfg.sanitized();
        Self {
            baseline: cfg.initial_baseline,
            initial: cfg.initial_baseline,
            alpha: cfg.alpha,
            adapt_margin: cfg.adapt_margin,
        }
    }

    /// Feed one jerk magnitude. Returns `true` if the baseline moved.
    pub fn update(&mut self, jerk: f32) -> bool {
        if jerk < self.baseline + self.adapt_margin {
            let next = self.baseline + self.alpha * (jerk - self.baseline);
            if !next.is_finite() {
                return false;
            }
            self.baseline = next;
            true
        } else {
            false
        }
    }

    /// Drop everything learned and return to the initial baseline.
    pub fn reset(&mut self) {
        self.baseline = self.initial;
    }

    /// Current baseline.
    pub fn baseline(&self) -> f32 {
        self.baseline
    }

    #[cfg(test)]
    pub(crate) fn force_baseline(&mut self, baseline: f32) {
        self.baseline = baseline;
    }
}

impl Default for NoiseFloor {
    fn default() -> Self {
        Self::new(&NoiseConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_samples_pull_baseline() {
        let mut nf = NoiseFloor::default();
        assert!(nf.update(500.0));
        // 1500 + 0.02 * (500 - 1500) = 1480
        assert!((nf.baseline() - 1480.0).abs() < 1e-3, "got {}", nf.baseline());
    }

    #[test]
    fn test_large_jerk_is_ignored() {
        let mut nf = NoiseFloor::default();
        assert!(!nf.update(2100.0));
        assert_eq!(nf.baseline(), 1500.0);
    }

    #[test]
    fn test_converges_toward_ambient() {
        let mut nf = NoiseFloor::default();
        for _ in 0..500 {
            nf.update(200.0);
        }
        assert!((nf.baseline() - 200.0).abs() < 1.0, "got {}", nf.baseline());
    }

    #[test]
    fn test_burst_at_ten_times_baseline_does_not_drift() {
        let mut nf = NoiseFloor::default();
        let before = nf.baseline();
        for _ in 0..50 {
            nf.update(before * 10.0);
        }
        assert!((nf.baseline() - before).abs() < 1e-6);
    }

    #[test]
    fn test_runaway_alpha_is_replaced_and_floor_stays_finite() {
        let cfg = NoiseConfig { alpha: 1e38, ..NoiseConfig::default() };
        assert_eq!(cfg.sanitized().alpha, 0.02);
        let mut nf = NoiseFloor::new(&cfg);
        for jerk in [0.0, 2000.0, 0.0, 1e30, 0.0] {
            nf.update(jerk);
            assert!(nf.baseline().is_finite(), "got {}", nf.baseline());
        }
    }

    #[test]
    fn test_invalid_fields_fall_back_individually() {
        let cfg = NoiseConfig { initial_baseline: f32::NAN, alpha: -0.5, adapt_margin: 250.0 };
        let clean = cfg.sanitized();
        assert_eq!(clean.initial_baseline, 1500.0);
        assert_eq!(clean.alpha, 0.02);
        assert_eq!(clean.adapt_margin, 250.0);
    }

    #[test]
    fn test_update_refuses_non_finite_result() {
        let mut nf = NoiseFloor::new(&NoiseConfig { alpha: 1.0, ..NoiseConfig::default() });
        assert!(!nf.update(f32::NEG_INFINITY));
        assert_eq!(nf.baseline(), 1500.0);
    }

    #[test]
    fn test_reset_returns_to_initial_baseline() {
        let mut nf = NoiseFloor::default();
        for _ in 0..100 {
            nf.update(100.0);
        }
        assert!(nf.baseline() < 1000.0);
        nf.reset();
        assert_eq!(nf.baseline(), 1500.0);
    }
}
