/*
 * This source code is licensed under the Business Source License 1.1
 * (BUSL-1.1). Production use requires a commercial license.
 */

//! Per-tick jerk extraction.
//!
//! The sampler is primed by the first successful reading, so the very first
//! tick always reports a jerk of zero. A failed read yields
//! [`Reading::Degraded`] with zero jerk and leaves the previous sample in
//! place, so a sensor hiccup never shows up as motion.

use tracing::warn;

use crate::sensor::{MotionSensor, Sample};

/// Result of one sampling tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reading {
    /// A real sample arrived.
    Live {
        /// The raw sample.
        sample: Sample,
        /// Magnitude of change since the previous sample.
        jerk: f32,
    },
    /// The sensor was unavailable; downstream sees no motion.
    Degraded,
}

impl Reading {
    /// Jerk magnitude for this tick (zero when degraded).
    pub fn jerk(&self) -> f32 {
        match self {
            Reading::Live { jerk, .. } => *jerk,
            Reading::Degraded => 0.0,
        }
    }

    /// `true` if the sensor failed this tick.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Reading::Degraded)
    }
}

/// Turns successive samples into jerk magnitudes.
#[derive(Clone, Debug, Default)]
pub struct MotionSampler {
    prev: Option<Sample>,
    faults: u32,
}

impl MotionSampler {
    /// Construct an unprimed sampler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull one sample from `sensor` and compute its jerk.
    pub fn sample<S: MotionSensor + ?Sized>(&mut self, sensor: &mut S) -> Reading {
        match sensor.read() {
            Ok(sample) => {
                let jerk = match self.prev {
                    Some(prev) => sample.jerk_from(&prev),
                    None => 0.0,
                };
                self.prev = Some(sample);
                Reading::Live { sample, jerk }
            }
            Err(e) => {
                self.faults = self.faults.saturating_add(1);
                warn!(error = %e, faults = self.faults, "sensor read failed, substituting rest");
                Reading::Degraded
            }
        }
    }

    /// Total failed reads since construction.
    pub fn fault_count(&self) -> u32 {
        self.faults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorError;
    use alloc::vec::Vec;

    struct Scripted(Vec<Result<Sample, SensorError>>);

    impl MotionSensor for Scripted {
        fn read(&mut self) -> Result<Sample, SensorError> {
            self.0.remove(0)
        }
    }

    #[test]
    fn test_first_tick_is_zero_jerk() {
        let mut s = MotionSampler::new();
        let mut sensor = Scripted(alloc::vec![Ok(Sample::new(500, -200, 900))]);
        assert_eq!(s.sample(&mut sensor).jerk(), 0.0);
    }

    #[test]
    fn test_jerk_tracks_previous_sample() {
        let mut s = MotionSampler::new();
        let mut sensor = Scripted(alloc::vec![
            Ok(Sample::new(0, 0, 0)),
            Ok(Sample::new(0, 300, 400)),
            Ok(Sample::new(0, 300, 400)),
        ]);
        s.sample(&mut sensor);
        assert!((s.sample(&mut sensor).jerk() - 500.0).abs() < 1e-3);
        assert_eq!(s.sample(&mut sensor).jerk(), 0.0);
    }

    #[test]
    fn test_fault_keeps_previous_and_reads_zero() {
        let mut s = MotionSampler::new();
        let mut sensor = Scripted(alloc::vec![
            Ok(Sample::new(100, 0, 0)),
            Err(SensorError::Unavailable),
            Ok(Sample::new(100, 0, 0)),
        ]);
        s.sample(&mut sensor);
        let r = s.sample(&mut sensor);
        assert!(r.is_degraded());
        assert_eq!(r.jerk(), 0.0);
        // Previous sample survived the fault, so an identical reading is still.
        assert_eq!(s.sample(&mut sensor).jerk(), 0.0);
        assert_eq!(s.fault_count(), 1);
    }
}
