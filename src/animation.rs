/*
 * This source code is licensed under the Business Source License 1.1
 * (BUSL-1.1). Production use requires a commercial license.
 */

//! Mood-to-animation scheduler.
//!
//! Runs on its own render tick, independent of sensing. Everything is driven
//! by the absolute time passed in, so the output is the same whether the
//! scheduler is called every 10 ms or every 200 ms.
//!
//! ```text
//! Baseline(mood) ──trigger──▶ Transient(Dizzy | Headpat | Angry | Startled) ──elapsed──▶ Baseline(mood)
//!      │
//!      └─ Blinking overlay (Baseline only)
//! ```
//!
//! # Invariants
//!
//! - While a transient is active no blink starts and any blink in progress
//!   is cancelled.
//! - When a transient ends, blink scheduling restarts from that instant.
//! - Horizontal sway is a sinusoid of wall-clock time, never a frame count.

use alloc::string::String;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::face::{blink, FaceTable, Mood};

/// Time-boxed animations that pre-empt the baseline face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transient {
    /// Being shaken.
    Dizzy,
    /// Being petted.
    Headpat,
    /// Handled roughly while not very happy.
    Angry,
    /// Handled roughly while already happy.
    Startled,
}

impl Transient {
    /// Face sequence the transient draws from.
    pub fn mood(&self) -> Mood {
        match self {
            Transient::Dizzy => Mood::Dizzy,
            Transient::Headpat => Mood::Headpat,
            Transient::Angry => Mood::Angry,
            Transient::Startled => Mood::Surprised,
        }
    }
}

/// Geometry and timing for the face.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnimationConfig {
    /// Display width in pixels.
    pub screen_width: i32,
    /// Width of one glyph cell before scaling.
    pub glyph_width: i32,
    /// Integer glyph scale factor.
    pub glyph_scale: i32,
    /// Top edge of the face.
    pub face_y: i32,
    /// How long the eyes stay closed.
    pub blink_duration_ms: u32,
    /// Shortest gap between blinks.
    pub blink_interval_min_ms: u32,
    /// Longest gap between blinks.
    pub blink_interval_max_ms: u32,
    /// Length of the dizzy transient.
    pub dizzy_duration_ms: u32,
    /// Horizontal wobble per dizzy frame.
    pub dizzy_offsets: [i32; 3],
    /// Length of the headpat transient.
    pub headpat_duration_ms: u32,
    /// Horizontal nudge per headpat frame.
    pub headpat_offsets: [i32; 2],
    /// Length of the angry reaction to rough handling.
    pub angry_duration_ms: u32,
    /// Length of the startled reaction to rough handling.
    pub startled_duration_ms: u32,
    /// Full sway cycle.
    pub sway_period_ms: u32,
    /// Peak sway in pixels.
    pub sway_amplitude: f32,
    /// Seed for blink interval jitter.
    pub rng_seed: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            screen_width: 128,
            glyph_width: 8,
            glyph_scale: 2,
            face_y: 20,
            blink_duration_ms: 140,
            blink_interval_min_ms: 3000,
            blink_interval_max_ms: 6000,
            dizzy_duration_ms: 2000,
            dizzy_offsets: [-11, 0, 10],
            headpat_duration_ms: 1200,
            headpat_offsets: [-3, 2],
            angry_duration_ms: 1500,
            startled_duration_ms: 1500,
            sway_period_ms: 1800,
            sway_amplitude: 7.0,
            rng_seed: 0x5EED_F00D,
        }
    }
}

impl AnimationConfig {
    fn duration_of(&self, kind: Transient) -> u64 {
        match kind {
            Transient::Dizzy => u64::from(self.dizzy_duration_ms),
            Transient::Headpat => u64::from(self.headpat_duration_ms),
            Transient::Angry => u64::from(self.angry_duration_ms),
            Transient::Startled => u64::from(self.startled_duration_ms),
        }
    }

    /// Left edge that centres `face` horizontally.
    pub fn centred_x(&self, face: &str) -> i32 {
        let w = face.chars().count() as i32 * self.glyph_width * self.glyph_scale;
        ((self.screen_width - w) / 2).max(0)
    }
}

/// Scheduler state. Owned solely by [`AnimationScheduler`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MoodAnimationState {
    /// Active transient and the instant it was latched.
    pub transient: Option<(Transient, u64)>,
    /// When the current or most recent blink began. `None` until first render.
    pub blink_last_ms: Option<u64>,
    /// Gap before the next blink.
    pub blink_next_interval_ms: u64,
    /// Eyes currently closed.
    pub blinking: bool,
}

/// One rendered face.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Glyph string to draw.
    pub glyph: String,
    /// Left edge in pixels.
    pub x: i32,
    /// Top edge in pixels.
    pub y: i32,
    /// Mood whose sequence produced the glyph.
    pub mood: Mood,
    /// Eyes-closed transform applied.
    pub blinking: bool,
}

/// Maps mood and wall-clock time to frames.
#[derive(Debug)]
pub struct AnimationScheduler {
    cfg: AnimationConfig,
    faces: FaceTable,
    state: MoodAnimationState,
    rng: SmallRng,
}

impl AnimationScheduler {
    /// Construct with the given geometry and face table.
    pub fn new(cfg: AnimationConfig, faces: FaceTable) -> Self {
        let mut rng = SmallRng::seed_from_u64(cfg.rng_seed);
        let first = next_interval(&cfg, &mut rng);
        Self {
            cfg,
            faces,
            state: MoodAnimationState { blink_next_interval_ms: first, ..Default::default() },
            rng,
        }
    }

    /// Start a transient. The same kind re-triggered while still running keeps
    /// its original start; a different kind replaces it.
    pub fn trigger(&mut self, kind: Transient, now_ms: u64) {
        if let Some((active, start)) = self.state.transient {
            if active == kind && now_ms.saturating_sub(start) < self.cfg.duration_of(kind) {
                return;
            }
        }
        debug!(?kind, now_ms, "transient latched");
        self.state.transient = Some((kind, now_ms));
        self.state.blinking = false;
    }

    /// Transient still running at `now_ms`, if any.
    pub fn active_transient(&self, now_ms: u64) -> Option<Transient> {
        self.state.transient.and_then(|(kind, start)| {
            (now_ms.saturating_sub(start) < self.cfg.duration_of(kind)).then_some(kind)
        })
    }

    /// Produce the frame for `now_ms` given the baseline mood.
    pub fn render(&mut self, baseline: Mood, now_ms: u64) -> Frame {
        if let Some((kind, start)) = self.state.transient {
            let elapsed = now_ms.saturating_sub(start);
            if elapsed < self.cfg.duration_of(kind) {
                return self.transient_frame(kind, elapsed);
            }
            debug!(?kind, now_ms, "transient ended");
            self.state.transient = None;
            self.restart_blink_schedule(now_ms);
        }

        self.advance_blink(now_ms);

        let seq = self.faces.get(baseline);
        let face = seq.frame_at(now_ms);
        let mut x = self.cfg.centred_x(face);
        if seq.sway {
            x += self.sway(now_ms);
        }
        let glyph = if self.state.blinking { blink(face) } else { String::from(face) };
        Frame {
            glyph,
            x,
            y: self.cfg.face_y,
            mood: baseline,
            blinking: self.state.blinking,
        }
    }

    fn transient_frame(&self, kind: Transient, elapsed: u64) -> Frame {
        let seq = self.faces.get(kind.mood());
        let period = u64::from(seq.period_ms.max(1));
        let (glyph, x) = match kind {
            Transient::Dizzy => {
                let n = self.cfg.dizzy_offsets.len() as u64;
                let idx = ((elapsed / period) % n) as usize;
                let face = seq.frame(idx);
                (String::from(face), self.cfg.centred_x(face) + self.cfg.dizzy_offsets[idx])
            }
            Transient::Headpat => {
                let n = self.cfg.headpat_offsets.len() as u64;
                let idx = ((elapsed / period) % n) as usize;
                let face = seq.frame(idx);
                let x = self.cfg.centred_x(face) + self.cfg.headpat_offsets[idx];
                let glyph = if idx == 1 { face.replacen(')', "*)", 1) } else { String::from(face) };
                (glyph, x)
            }
            Transient::Angry | Transient::Startled => {
                let face = seq.frame_at(elapsed);
                (String::from(face), self.cfg.centred_x(face))
            }
        };
        Frame { glyph, x, y: self.cfg.face_y, mood: kind.mood(), blinking: false }
    }

    fn advance_blink(&mut self, now_ms: u64) {
        let Some(last) = self.state.blink_last_ms else {
            self.restart_blink_schedule(now_ms);
            return;
        };
        if now_ms.saturating_sub(last) > self.state.blink_next_interval_ms {
            self.state.blinking = true;
            self.state.blink_last_ms = Some(now_ms);
            self.state.blink_next_interval_ms = next_interval(&self.cfg, &mut self.rng);
            return;
        }
        if self.state.blinking
            && now_ms.saturating_sub(last) >= u64::from(self.cfg.blink_duration_ms)
        {
            self.state.blinking = false;
        }
    }

    fn restart_blink_schedule(&mut self, now_ms: u64) {
        self.state.blinking = false;
        self.state.blink_last_ms = Some(now_ms);
    }

    fn sway(&self, now_ms: u64) -> i32 {
        let period = u64::from(self.cfg.sway_period_ms.max(1));
        let t = (now_ms % period) as f32 / period as f32;
        libm::roundf(self.cfg.sway_amplitude * libm::sinf(2.0 * core::f32::consts::PI * t)) as i32
    }

    /// Current scheduler state.
    pub fn state(&self) -> &MoodAnimationState {
        &self.state
    }

    /// Geometry in use.
    pub fn config(&self) -> &AnimationConfig {
        &self.cfg
    }
}

fn next_interval(cfg: &AnimationConfig, rng: &mut SmallRng) -> u64 {
    let lo = cfg.blink_interval_min_ms.min(cfg.blink_interval_max_ms);
    let hi = cfg.blink_interval_min_ms.max(cfg.blink_interval_max_ms);
    u64::from(rng.gen_range(lo..=hi))
}
