//! Top-level configuration record.
//!
//! Every tunable lives in one of the per-module records aggregated here.
//! Each record defaults field by field, so a JSON document only needs the
//! keys it wants to change:
//!
//! ```json
//! { "emotion": { "shake_threshold": 5 }, "muted": true }
//! ```

use crate::animation::AnimationConfig;
use crate::classifier::ClassifierConfig;
use crate::emotion::EmotionConfig;
#[cfg(feature = "serde")]
use crate::error::ConfigError;
use crate::noise::NoiseConfig;

/// Loop cadence.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoopConfig {
    /// Sensing period (20 Hz).
    pub sense_period_ms: u32,
    /// Render period (about 15 fps).
    pub render_period_ms: u32,
    /// Pause after a tick fault before trying again.
    pub error_backoff_ms: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { sense_period_ms: 50, render_period_ms: 68, error_backoff_ms: 1000 }
    }
}

/// Everything a [`Companion`](crate::runtime::Companion) can be tuned with.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SidekickConfig {
    /// Noise floor tracking.
    pub noise: NoiseConfig,
    /// Movement thresholds.
    pub classifier: ClassifierConfig,
    /// Reaction rules and the happiness meter.
    pub emotion: EmotionConfig,
    /// Face geometry, blink and transient timing.
    pub animation: AnimationConfig,
    /// Loop cadence.
    pub timing: LoopConfig,
    /// Silence the buzzer (cues keep their timing).
    pub muted: bool,
}

#[cfg(feature = "serde")]
impl SidekickConfig {
    /// Parse a JSON document, reporting where it went wrong.
    pub fn try_from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a JSON document, falling back to defaults when it is malformed.
    pub fn from_json(json: &str) -> Self {
        Self::try_from_json(json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "configuration rejected, using defaults");
            Self::default()
        })
    }
}
