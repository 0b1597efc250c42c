/*
 * This source code is licensed under the Business Source License 1.1
 * (BUSL-1.1). Production use requires a commercial license.
 */

//! Movement classification from one jerk value, the jerk window, and the
//! noise baseline.
//!
//! Two signals are combined on purpose. A single large spike and a sustained
//! moderate vibration are different events: the windowed average must not
//! dilute a sharp shake, and one bad sample must not read as rough handling.
//! So shaking is decided by an instantaneous spike streak that is checked
//! first, and everything else by windowed statistics.
//!
//! # Priority (first match wins)
//!
//! 1. `Shaking`: `movement_sensitivity` consecutive ticks with
//!    `jerk >= rough_delta`.
//! 2. `Still`: flat window, or average at/below the gentle floor.
//! 3. `Gentle`: `gentle_min < avg <= gentle_max`.
//! 4. `Rough`: `avg >= rough_avg`.
//! 5. Dead zone: no classification this tick.

use crate::window::{JerkWindow, WindowStats};

/// Discrete motion tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Movement {
    /// Resting on a surface (or indistinguishable from it).
    Still,
    /// Being carried or rocked gently.
    Gentle,
    /// Sustained heavy handling.
    Rough,
    /// Confirmed shaking.
    Shaking,
}

/// Output of one classification tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    /// `None` when the average sits between the gentle and rough bands.
    pub movement: Option<Movement>,
    /// Window statistics the decision was made from.
    pub stats: WindowStats,
}

impl Classification {
    /// The classification used when the sensor failed this tick.
    pub fn degraded() -> Self {
        Self { movement: Some(Movement::Still), stats: WindowStats::default() }
    }
}

/// Thresholds in raw jerk units.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClassifierConfig {
    /// Margin above baseline for a window entry to count as active.
    pub active_margin: f32,
    /// Fewer active entries than this (with a flat window) reads as still.
    pub gentle_active_min_samples: usize,
    /// Window range below which motion is considered flat.
    pub still_range: f32,
    /// Lower bound (exclusive) of the gentle band.
    pub gentle_min: f32,
    /// Upper bound (inclusive) of the gentle band.
    pub gentle_max: f32,
    /// Window average at or above which handling is rough.
    pub rough_avg: f32,
    /// Single-tick jerk that counts toward the shake streak.
    pub rough_delta: f32,
    /// Consecutive spikes needed to confirm shaking.
    pub movement_sensitivity: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            active_margin: 500.0,
            gentle_active_min_samples: 2,
            still_range: 1200.0,
            gentle_min: 1000.0,
            gentle_max: 35_000.0,
            rough_avg: 80_000.0,
            rough_delta: 20_000.0,
            movement_sensitivity: 2,
        }
    }
}

/// Stateful classifier. The only state is the spike streak.
#[derive(Clone, Debug)]
pub struct MovementClassifier {
    cfg: ClassifierConfig,
    spike_streak: u32,
}

impl MovementClassifier {
    /// Construct with the given thresholds.
    pub fn new(cfg: ClassifierConfig) -> Self {
        Self { cfg, spike_streak: 0 }
    }

    /// Thresholds in use.
    pub fn config(&self) -> &ClassifierConfig {
        &self.cfg
    }

    /// Consecutive qualifying spikes so far.
    pub fn spike_streak(&self) -> u32 {
        self.spike_streak
    }

    /// Classify the current tick. `window` must already contain `jerk`.
    pub fn classify<const N: usize>(
        &mut self,
        jerk: f32,
        window: &JerkWindow<N>,
        baseline: f32,
    ) -> Classification {
        let c = &self.cfg;
        let stats = window.stats(baseline, c.active_margin);

        if jerk >= c.rough_delta {
            self.spike_streak += 1;
        } else {
            self.spike_streak = 0;
        }
        if self.spike_streak >= c.movement_sensitivity {
            self.spike_streak = 0;
            return Classification { movement: Some(Movement::Shaking), stats };
        }

        let flat = stats.range < c.still_range && stats.active_count < c.gentle_active_min_samples;
        let is_still = flat || stats.avg <= baseline + c.active_margin;

        let movement = if is_still || stats.avg <= c.gentle_min {
            Some(Movement::Still)
        } else if stats.avg <= c.gentle_max {
            Some(Movement::Gentle)
        } else if stats.avg >= c.rough_avg {
            Some(Movement::Rough)
        } else {
            None
        };
        Classification { movement, stats }
    }
}

impl Default for MovementClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}
