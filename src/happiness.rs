/*
 * This source code is licensed under the Business Source License 1.1
 * (BUSL-1.1). Production use requires a commercial license.
 */

//! The happiness meter: bounded, asymmetric gain and loss.
//!
//! - [`MeterConfig::add`]: an unhappy companion recovers faster (×1.35 below 35).
//! - [`MeterConfig::reduce`]: a very happy companion shrugs off half the
//!   penalty (×0.5 above 75) and treats it as probably accidental.
//!
//! # Invariants
//!
//! - Every result is clamped to `[min, max]`; nothing over- or undershoots,
//!   even transiently. A NaN input collapses to `min`.

/// Meter bounds and base deltas.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MeterConfig {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
    /// Base gain per `add` at multiplier 1.
    pub happy_gain: f32,
    /// Base loss per `reduce` at multiplier 1.
    pub sad_loss: f32,
    /// Below this, gains are boosted.
    pub sad_boost_below: f32,
    /// Gain boost factor when unhappy.
    pub sad_boost: f32,
    /// Above this, losses are dampened.
    pub happy_damp_above: f32,
    /// Loss damping factor when very happy.
    pub happy_damp: f32,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
            happy_gain: 5.0,
            sad_loss: 10.0,
            sad_boost_below: 35.0,
            sad_boost: 1.35,
            happy_damp_above: 75.0,
            happy_damp: 0.5,
        }
    }
}

impl MeterConfig {
    /// Raise `value` by the base gain scaled by `multiplier`.
    pub fn add(&self, value: f32, multiplier: f32) -> f32 {
        let delta = if value < self.sad_boost_below {
            self.happy_gain * multiplier * self.sad_boost
        } else {
            self.happy_gain * multiplier
        };
        self.clamp(value + delta)
    }

    /// Lower `value` by the base loss scaled by `multiplier`.
    pub fn reduce(&self, value: f32, multiplier: f32) -> f32 {
        let delta = if value > self.happy_damp_above {
            self.sad_loss * multiplier * self.happy_damp
        } else {
            self.sad_loss * multiplier
        };
        self.clamp(value - delta)
    }

    /// Clamp into `[min, max]`; NaN becomes `min`.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }
}
