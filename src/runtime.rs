/*
 * This source code is licensed under the Business Source License 1.1
 * (BUSL-1.1). Production use requires a commercial license.
 */

//! The behaviour loop.
//!
//! A single-threaded, cooperative scheduler interleaving two independent
//! cadences: the sensing tick (default 50 ms) and the render tick (default
//! 68 ms). Buzzer cues are advanced on every iteration in between. Time and
//! sleeping come from an injected [`Timebase`], so the whole loop runs
//! unchanged against a fake clock in tests.
//!
//! ```text
//! sense:  sensor → sampler → {noise floor, window} → classifier → state → {animation, feedback}
//! render: state.mood() → animation.render(now) → surface
//! ```
//!
//! `EmotionalState` is only mutated by the sensing tick (and by
//! [`Companion::headpat`]); the render tick only reads it.

use tracing::{debug, error, info, warn};

use crate::animation::{AnimationScheduler, Frame, Transient};
use crate::classifier::{Classification, MovementClassifier};
use crate::config::{LoopConfig, SidekickConfig};
use crate::emotion::{BehaviorEvent, EmotionalState, Events};
use crate::error::{SurfaceError, TickError};
use crate::face::FaceTable;
use crate::feedback::{AudioOut, FeedbackDispatcher, SoundBank, STARTUP_SEQUENCE};
use crate::noise::NoiseFloor;
use crate::sampler::{MotionSampler, Reading};
use crate::sensor::MotionSensor;
use crate::window::JerkWindow;

/// Badge drawn in the top-right corner when motion is simulated.
pub const DEBUG_BADGE: &str = "DBG";

// ─── Collaborators ──────────────────────────────────────────────────────────

/// Monotonic millisecond clock plus a way to wait on it.
pub trait Timebase {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;
    /// Block for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u64);
}

/// Anything that can show a line of glyphs.
pub trait RenderSurface {
    /// Blank the frame buffer.
    fn clear(&mut self) -> Result<(), SurfaceError>;
    /// Draw `text` with its top-left corner at (`x`, `y`).
    fn draw_glyph(&mut self, text: &str, x: i32, y: i32) -> Result<(), SurfaceError>;
    /// Push the frame buffer to the panel.
    fn present(&mut self) -> Result<(), SurfaceError>;
}

/// External request to leave the loop (the menu button).
pub trait MenuSignal {
    /// Sampled once per loop iteration.
    fn requested(&mut self) -> bool;
}

impl<F: FnMut() -> bool> MenuSignal for F {
    fn requested(&mut self) -> bool {
        self()
    }
}

/// Fake clock: time only moves when slept on or advanced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManualTimebase {
    now_ms: u64,
}

impl ManualTimebase {
    /// Clock reading `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self { now_ms: start_ms }
    }

    /// Move the clock forward.
    pub fn advance(&mut self, ms: u64) {
        self.now_ms = self.now_ms.saturating_add(ms);
    }
}

impl Timebase for ManualTimebase {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.advance(ms);
    }
}

/// Wall clock backed by [`std::time::Instant`].
#[cfg(feature = "std")]
#[derive(Clone, Copy, Debug)]
pub struct SystemTimebase {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemTimebase {
    /// Clock whose origin is now.
    pub fn new() -> Self {
        Self { origin: std::time::Instant::now() }
    }
}

#[cfg(feature = "std")]
impl Default for SystemTimebase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Timebase for SystemTimebase {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep_ms(&mut self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }
}

// ─── Loop ───────────────────────────────────────────────────────────────────

/// Why [`Companion::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// The menu signal fired; the caller owns the device until `resume`.
    MenuRequested,
}

/// What one sensing tick saw and did.
#[derive(Clone, Debug, PartialEq)]
pub struct SenseReport {
    /// Raw reading (or the degraded marker).
    pub reading: Reading,
    /// Noise baseline after this tick.
    pub baseline: f32,
    /// Classifier output.
    pub classification: Classification,
    /// Behaviour events emitted by the state model.
    pub events: Events,
}

/// The whole companion: sensing, state, face and buzzer.
#[derive(Debug)]
pub struct Companion<S, R, A> {
    timing: LoopConfig,
    sensor: S,
    surface: R,
    audio: A,
    sampler: MotionSampler,
    noise: NoiseFloor,
    window: JerkWindow,
    classifier: MovementClassifier,
    state: EmotionalState,
    animation: AnimationScheduler,
    feedback: FeedbackDispatcher,
    debug_badge: bool,
    next_sense_ms: u64,
    next_render_ms: u64,
}

impl<S, R, A> Companion<S, R, A>
where
    S: MotionSensor,
    R: RenderSurface,
    A: AudioOut,
{
    /// Assemble a companion from resolved configuration and its hardware.
    pub fn new(
        config: SidekickConfig,
        faces: FaceTable,
        sounds: SoundBank,
        sensor: S,
        surface: R,
        audio: A,
    ) -> Self {
        let debug_badge = sensor.is_simulated();
        if debug_badge {
            warn!("motion is simulated, showing debug badge");
        }
        Self {
            timing: config.timing,
            sensor,
            surface,
            audio,
            sampler: MotionSampler::new(),
            noise: NoiseFloor::new(&config.noise),
            window: JerkWindow::new(),
            classifier: MovementClassifier::new(config.classifier),
            state: EmotionalState::new(config.emotion),
            animation: AnimationScheduler::new(config.animation, faces),
            feedback: FeedbackDispatcher::new(sounds, config.muted),
            debug_badge,
            next_sense_ms: 0,
            next_render_ms: 0,
        }
    }

    /// Power-on: play the startup cue and schedule both ticks for `now_ms`.
    pub fn start(&mut self, now_ms: u64) {
        info!(now_ms, "companion starting");
        self.next_sense_ms = now_ms;
        self.next_render_ms = now_ms;
        self.feedback.play(STARTUP_SEQUENCE, now_ms, &mut self.audio);
    }

    /// Back from the menu. Emotional state is kept; the sampler is re-primed
    /// so the gap does not read as motion.
    pub fn resume(&mut self, now_ms: u64) {
        self.sampler = MotionSampler::new();
        self.start(now_ms);
    }

    /// One sensing tick.
    pub fn sense_tick(&mut self, now_ms: u64) -> Result<SenseReport, TickError> {
        let reading = self.sampler.sample(&mut self.sensor);
        let classification = match reading {
            Reading::Degraded => Classification::degraded(),
            Reading::Live { jerk, .. } => {
                if !jerk.is_finite() {
                    return Err(TickError::NonFiniteJerk(jerk));
                }
                self.noise.update(jerk);
                let baseline = self.noise.baseline();
                if !baseline.is_finite() {
                    self.noise.reset();
                    return Err(TickError::BaselineCorrupted(baseline));
                }
                self.window.push(jerk);
                self.classifier.classify(jerk, &self.window, baseline)
            }
        };
        let baseline = self.noise.baseline();
        debug!(
            jerk = reading.jerk(),
            baseline,
            avg = classification.stats.avg,
            range = classification.stats.range,
            active = classification.stats.active_count,
            movement = ?classification.movement,
            "sense"
        );

        let events = self.state.apply(classification.movement);
        self.react(&events, now_ms);
        Ok(SenseReport { reading, baseline, classification, events })
    }

    /// External affection signal.
    pub fn headpat(&mut self, now_ms: u64) -> Events {
        let events = self.state.headpat();
        self.react(&events, now_ms);
        events
    }

    fn react(&mut self, events: &[BehaviorEvent], now_ms: u64) {
        for event in events {
            match event {
                BehaviorEvent::Shaken | BehaviorEvent::Heartbroken => {
                    self.animation.trigger(Transient::Dizzy, now_ms)
                }
                BehaviorEvent::Headpat | BehaviorEvent::AffectionBurst => {
                    self.animation.trigger(Transient::Headpat, now_ms)
                }
                BehaviorEvent::Angered => self.animation.trigger(Transient::Angry, now_ms),
                BehaviorEvent::Startled => self.animation.trigger(Transient::Startled, now_ms),
                _ => {}
            }
        }
        self.feedback.dispatch(events, now_ms, &mut self.audio);
    }

    /// One render tick. Surface faults are logged; the frame is returned
    /// either way.
    pub fn render_tick(&mut self, now_ms: u64) -> Frame {
        let frame = self.animation.render(self.state.mood(), now_ms);
        if let Err(e) = self.draw(&frame) {
            warn!(error = %e, "frame dropped");
        }
        frame
    }

    fn draw(&mut self, frame: &Frame) -> Result<(), SurfaceError> {
        self.surface.clear()?;
        self.surface.draw_glyph(&frame.glyph, frame.x, frame.y)?;
        if self.debug_badge {
            let cfg = self.animation.config();
            let badge_w = DEBUG_BADGE.len() as i32 * cfg.glyph_width;
            self.surface.draw_glyph(DEBUG_BADGE, cfg.screen_width - badge_w, 0)?;
        }
        self.surface.present()
    }

    /// Run whichever work is due at `now_ms`.
    pub fn step(&mut self, now_ms: u64) -> Result<(), TickError> {
        self.feedback.poll(now_ms, &mut self.audio);
        if now_ms >= self.next_sense_ms {
            self.next_sense_ms = now_ms + u64::from(self.timing.sense_period_ms);
            self.sense_tick(now_ms)?;
        }
        if now_ms >= self.next_render_ms {
            self.next_render_ms = now_ms + u64::from(self.timing.render_period_ms);
            self.render_tick(now_ms);
        }
        Ok(())
    }

    /// Earliest instant anything needs attention.
    pub fn next_due_ms(&self) -> u64 {
        let tick = self.next_sense_ms.min(self.next_render_ms);
        self.feedback.next_due_ms().map_or(tick, |t| t.min(tick))
    }

    /// Loop until the menu signal fires. Tick faults are logged and followed
    /// by a back-off; nothing else ends the loop.
    pub fn run<T, M>(&mut self, clock: &mut T, menu: &mut M) -> LoopExit
    where
        T: Timebase + ?Sized,
        M: MenuSignal + ?Sized,
    {
        loop {
            if menu.requested() {
                info!("menu requested, leaving loop");
                return LoopExit::MenuRequested;
            }
            let now = clock.now_ms();
            if let Err(e) = self.step(now) {
                error!(error = %e, backoff_ms = self.timing.error_backoff_ms, "tick failed");
                clock.sleep_ms(u64::from(self.timing.error_backoff_ms));
                continue;
            }
            let wake = self.next_due_ms();
            let now = clock.now_ms();
            if wake > now {
                clock.sleep_ms(wake - now);
            }
        }
    }

    // ── Read accessors ──────────────────────────────────────────────────────

    /// Emotional state.
    pub fn state(&self) -> &EmotionalState {
        &self.state
    }

    /// Animation scheduler.
    pub fn animation(&self) -> &AnimationScheduler {
        &self.animation
    }

    /// Buzzer dispatcher.
    pub fn feedback(&self) -> &FeedbackDispatcher {
        &self.feedback
    }

    /// Current noise baseline.
    pub fn baseline(&self) -> f32 {
        self.noise.baseline()
    }

    /// Recent jerk window.
    pub fn window(&self) -> &JerkWindow {
        &self.window
    }

    /// Whether the debug badge is drawn.
    pub fn debug_badge(&self) -> bool {
        self.debug_badge
    }

    /// The render surface.
    pub fn surface(&self) -> &R {
        &self.surface
    }

    /// The audio output.
    pub fn audio(&self) -> &A {
        &self.audio
    }

    /// The motion sensor.
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Movement;
    use crate::emotion::EmotionConfig;
    use crate::error::SensorError;
    use crate::face::Mood;
    use crate::sensor::{Sample, StubSensor};
    use alloc::string::String;
    use alloc::vec::Vec;

    #[derive(Default)]
    struct Screen {
        draws: Vec<(String, i32, i32)>,
        presents: u32,
        broken: bool,
    }

    impl RenderSurface for Screen {
        fn clear(&mut self) -> Result<(), SurfaceError> {
            self.draws.clear();
            Ok(())
        }

        fn draw_glyph(&mut self, text: &str, x: i32, y: i32) -> Result<(), SurfaceError> {
            if self.broken {
                return Err(SurfaceError::NotResponding);
            }
            self.draws.push((String::from(text), x, y));
            Ok(())
        }

        fn present(&mut self) -> Result<(), SurfaceError> {
            self.presents += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Buzzer(Vec<(u32, u32)>);

    impl AudioOut for Buzzer {
        fn play_tone(&mut self, frequency_hz: u32, duration_ms: u32) {
            self.0.push((frequency_hz, duration_ms));
        }
    }

    /// Sensor that alternates between two samples, or fails on demand.
    struct Shaker {
        flip: bool,
        fail: bool,
    }

    impl MotionSensor for Shaker {
        fn read(&mut self) -> Result<Sample, SensorError> {
            if self.fail {
                return Err(SensorError::Unavailable);
            }
            self.flip = !self.flip;
            Ok(if self.flip { Sample::new(20000, 0, 0) } else { Sample::new(-20000, 0, 0) })
        }
    }

    fn stub_companion() -> Companion<StubSensor, Screen, Buzzer> {
        Companion::new(
            SidekickConfig::default(),
            FaceTable::builtin(),
            SoundBank::builtin(),
            StubSensor,
            Screen::default(),
            Buzzer::default(),
        )
    }

    #[test]
    fn test_stub_draws_debug_badge() {
        let mut c = stub_companion();
        assert!(c.debug_badge());
        c.render_tick(0);
        assert!(c.surface().draws.iter().any(|(t, x, y)| t == DEBUG_BADGE && *x == 104 && *y == 0));
        assert_eq!(c.surface().presents, 1);
    }

    #[test]
    fn test_surface_fault_is_not_fatal() {
        let mut c = stub_companion();
        c.surface.broken = true;
        let frame = c.render_tick(0);
        assert!(!frame.glyph.is_empty());
        assert_eq!(c.surface().presents, 0);
    }

    #[test]
    fn test_start_plays_startup_cue() {
        let mut c = stub_companion();
        c.start(0);
        assert_eq!(c.feedback().current_cue(), Some(STARTUP_SEQUENCE));
        assert_eq!(c.audio().0, [(2000, 15)]);
    }

    #[test]
    fn test_still_stub_never_changes_happiness() {
        let mut c = stub_companion();
        for t in 0..200u64 {
            let r = c.sense_tick(t * 50).unwrap();
            assert!(r.events.is_empty());
        }
        assert_eq!(c.state().happiness(), 50.0);
    }

    #[test]
    fn test_degraded_reading_is_still_and_leaves_window() {
        let mut c = Companion::new(
            SidekickConfig::default(),
            FaceTable::builtin(),
            SoundBank::builtin(),
            Shaker { flip: false, fail: true },
            Screen::default(),
            Buzzer::default(),
        );
        let r = c.sense_tick(0).unwrap();
        assert!(r.reading.is_degraded());
        assert_eq!(r.classification.movement, Some(crate::classifier::Movement::Still));
        assert!(c.window().latest().map_or(true, |j| j == 0.0));
        assert_eq!(c.baseline(), 1500.0);
    }

    #[test]
    fn test_shaking_latches_dizzy_and_sound() {
        let mut c = Companion::new(
            SidekickConfig::default(),
            FaceTable::builtin(),
            SoundBank::builtin(),
            Shaker { flip: false, fail: false },
            Screen::default(),
            Buzzer::default(),
        );
        // Prime, then two consecutive 40000-jerk spikes confirm a shake.
        c.sense_tick(0).unwrap();
        c.sense_tick(50).unwrap();
        let r = c.sense_tick(100).unwrap();
        assert!(r.events.contains(&BehaviorEvent::Shaken));
        assert_eq!(c.animation().active_transient(100), Some(Transient::Dizzy));
        assert_eq!(c.feedback().current_cue(), Some(crate::feedback::DIZZY_SOUND));
    }

    #[test]
    fn test_headpat_latches_transient() {
        let mut c = stub_companion();
        let ev = c.headpat(10);
        assert_eq!(ev.as_slice(), &[BehaviorEvent::Headpat]);
        assert_eq!(c.animation().active_transient(10), Some(Transient::Headpat));
        assert_eq!(c.state().happiness(), 55.0);
    }

    #[test]
    fn test_rough_handling_shows_angry_or_startled_face() {
        for (happiness, transient, mood) in
            [(50.0, Transient::Angry, Mood::Angry), (90.0, Transient::Startled, Mood::Surprised)]
        {
            let mut c = stub_companion();
            c.state = EmotionalState::with_happiness(EmotionConfig::default(), happiness);
            let events = c.state.apply(Some(Movement::Rough));
            c.react(&events, 1000);
            assert_eq!(c.animation().active_transient(1000), Some(transient));
            assert_eq!(c.render_tick(1050).mood, mood);
            // Back to the baseline face once the reaction has played.
            assert_ne!(c.render_tick(2600).mood, mood);
        }
    }

    #[test]
    fn test_corrupted_baseline_is_reset_and_loop_recovers() {
        let mut c = stub_companion();
        c.noise.force_baseline(f32::INFINITY);
        assert!(matches!(c.sense_tick(0), Err(TickError::BaselineCorrupted(_))));
        assert_eq!(c.baseline(), 1500.0);

        c.noise.force_baseline(f32::NAN);
        let mut clock = ManualTimebase::new(0);
        c.start(0);
        let mut checks = 0;
        let mut menu = || {
            checks += 1;
            checks > 50
        };
        assert_eq!(c.run(&mut clock, &mut menu), LoopExit::MenuRequested);
        assert!(c.baseline().is_finite());
        // One back-off, then normal ticking resumes.
        assert!(clock.now_ms() > 1000);
        assert!(c.surface().presents > 5);
    }

    #[test]
    fn test_run_returns_on_menu_and_advances_both_cadences() {
        let mut c = stub_companion();
        let mut clock = ManualTimebase::new(0);
        c.start(0);
        let mut checks = 0;
        let mut menu = || {
            checks += 1;
            checks > 200
        };
        assert_eq!(c.run(&mut clock, &mut menu), LoopExit::MenuRequested);
        assert!(clock.now_ms() > 1000);
        assert!(c.surface().presents > 10);
        assert!(!c.feedback().is_playing());
    }
}
