/*
 * This source code is licensed under the Business Source License 1.1
 * (BUSL-1.1). Production use requires a commercial license.
 */

//! Emotional state: the happiness scalar and its escalation streaks.
//!
//! Classification events arrive once per sensing tick; affection arrives from
//! an external headpat signal. Each may change happiness through the
//! [`MeterConfig`] rules and emits zero or more [`BehaviorEvent`]s for the
//! animation scheduler and the feedback dispatcher.
//!
//! # Invariants
//!
//! - `happiness` stays in `[meter.min, meter.max]` after every update.
//! - Shaking is punished through the streak, not per tick: happiness only
//!   changes when `shake_streak` reaches its threshold (forced to zero).
//! - A gentle reward is a single pulse per `gentle_reward_ticks` gentle ticks.
//! - `shake_streak` resets on threshold or after `shake_forgive_still_ticks`
//!   consecutive still ticks. `affection_streak` resets on threshold.

use heapless::Vec as HVec;
use tracing::{debug, info, warn};

use crate::classifier::Movement;
use crate::face::Mood;
use crate::happiness::MeterConfig;

/// Discrete events produced by the state model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BehaviorEvent {
    /// Shaking confirmed this tick.
    Shaken,
    /// The shake streak crossed its threshold; all trust lost.
    Heartbroken,
    /// A sustained gentle carry earned a small reward.
    GentleReward,
    /// Rough handling while not very happy.
    Angered,
    /// Rough handling while very happy.
    Startled,
    /// A single headpat.
    Headpat,
    /// Headpats crossed their threshold and paid out a bonus.
    AffectionBurst,
    /// Still long enough to fall asleep.
    DozedOff,
}

/// Events emitted by a single update. At most two occur together.
pub type Events = HVec<BehaviorEvent, 4>;

/// Thresholds and multipliers for the state model.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EmotionConfig {
    /// Happiness at power-on.
    pub initial_happiness: f32,
    /// Confirmed shakes before happiness is forced to zero.
    pub shake_threshold: u32,
    /// Consecutive gentle ticks per reward pulse.
    pub gentle_reward_ticks: u32,
    /// Multiplier handed to `add` on a gentle reward.
    pub gentle_reward_multiplier: f32,
    /// Multiplier handed to `reduce` on rough handling.
    pub rough_multiplier: f32,
    /// Rough handling below this happiness angers; at or above it startles.
    pub angry_below: f32,
    /// Headpats per affection burst.
    pub headpat_threshold: u32,
    /// Multiplier handed to `add` for an ordinary headpat.
    pub headpat_multiplier: f32,
    /// Multiplier handed to `add` for an affection burst.
    pub affection_burst_multiplier: f32,
    /// Consecutive still ticks that forgive the shake streak (0 disables).
    pub shake_forgive_still_ticks: u32,
    /// Consecutive still ticks before dozing off (0 disables).
    pub doze_after_still_ticks: u32,
    /// Meter bounds and base deltas.
    pub meter: MeterConfig,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            initial_happiness: 50.0,
            shake_threshold: 7,
            gentle_reward_ticks: 15,
            gentle_reward_multiplier: 0.1,
            rough_multiplier: 1.0,
            angry_below: 75.0,
            headpat_threshold: 4,
            headpat_multiplier: 1.0,
            affection_burst_multiplier: 3.0,
            shake_forgive_still_ticks: 200,
            doze_after_still_ticks: 1200,
            meter: MeterConfig::default(),
        }
    }
}

/// The companion's emotional state. Created at power-on, never persisted.
#[derive(Clone, Debug)]
pub struct EmotionalState {
    cfg: EmotionConfig,
    happiness: f32,
    shake_streak: u32,
    affection_streak: u32,
    rough_streak: u32,
    gentle_streak: u32,
    still_streak: u32,
}

impl EmotionalState {
    /// Fresh state at the configured initial happiness.
    pub fn new(cfg: EmotionConfig) -> Self {
        let happiness = cfg.meter.clamp(cfg.initial_happiness);
        Self {
            cfg,
            happiness,
            shake_streak: 0,
            affection_streak: 0,
            rough_streak: 0,
            gentle_streak: 0,
            still_streak: 0,
        }
    }

    /// Same configuration, explicit starting happiness (clamped).
    pub fn with_happiness(cfg: EmotionConfig, happiness: f32) -> Self {
        let mut s = Self::new(cfg);
        s.happiness = s.cfg.meter.clamp(happiness);
        s
    }

    // ── Updates ─────────────────────────────────────────────────────────────

    /// Integrate one classification. `None` is the dead zone: nothing changes.
    pub fn apply(&mut self, movement: Option<Movement>) -> Events {
        let mut events = Events::new();
        let Some(movement) = movement else {
            return events;
        };
        if movement != Movement::Still {
            self.still_streak = 0;
        }
        match movement {
            Movement::Shaking => self.on_shaking(&mut events),
            Movement::Still => self.on_still(&mut events),
            Movement::Gentle => self.on_gentle(&mut events),
            Movement::Rough => self.on_rough(&mut events),
        }
        events
    }

    /// External affection signal (headpat).
    pub fn headpat(&mut self) -> Events {
        let mut events = Events::new();
        self.still_streak = 0;
        self.affection_streak += 1;
        if self.affection_streak >= self.cfg.headpat_threshold {
            self.happiness = self
                .cfg
                .meter
                .add(self.happiness, self.cfg.affection_burst_multiplier);
            self.affection_streak = 0;
            info!(happiness = self.happiness, "affection burst");
            push(&mut events, BehaviorEvent::AffectionBurst);
        } else {
            self.happiness = self.cfg.meter.add(self.happiness, self.cfg.headpat_multiplier);
            push(&mut events, BehaviorEvent::Headpat);
        }
        events
    }

    fn on_shaking(&mut self, events: &mut Events) {
        push(events, BehaviorEvent::Shaken);
        self.shake_streak += 1;
        info!(shake_streak = self.shake_streak, "getting dizzy");
        if self.shake_streak >= self.cfg.shake_threshold {
            self.happiness = self.cfg.meter.min;
            self.shake_streak = 0;
            info!("all trust lost");
            push(events, BehaviorEvent::Heartbroken);
        }
    }

    fn on_still(&mut self, events: &mut Events) {
        self.gentle_streak = 0;
        self.rough_streak = 0;
        self.still_streak = self.still_streak.saturating_add(1);
        let forgive = self.cfg.shake_forgive_still_ticks;
        if forgive > 0 && self.still_streak >= forgive && self.shake_streak > 0 {
            debug!(shake_streak = self.shake_streak, "shake streak forgiven");
            self.shake_streak = 0;
        }
        let doze = self.cfg.doze_after_still_ticks;
        if doze > 0 && self.still_streak == doze {
            push(events, BehaviorEvent::DozedOff);
        }
    }

    fn on_gentle(&mut self, events: &mut Events) {
        self.gentle_streak += 1;
        self.rough_streak = 0;
        debug!(
            gentle_streak = self.gentle_streak,
            of = self.cfg.gentle_reward_ticks,
            "gentle progress"
        );
        if self.gentle_streak >= self.cfg.gentle_reward_ticks {
            self.happiness = self
                .cfg
                .meter
                .add(self.happiness, self.cfg.gentle_reward_multiplier);
            self.gentle_streak = 0;
            info!(happiness = self.happiness, "nice stroll");
            push(events, BehaviorEvent::GentleReward);
        }
    }

    fn on_rough(&mut self, events: &mut Events) {
        self.rough_streak += 1;
        self.gentle_streak = 0;
        let reaction = if self.happiness < self.cfg.angry_below {
            BehaviorEvent::Angered
        } else {
            BehaviorEvent::Startled
        };
        self.happiness = self.cfg.meter.reduce(self.happiness, self.cfg.rough_multiplier);
        info!(happiness = self.happiness, ?reaction, "rough handling");
        push(events, reaction);
    }

    // ── Read accessors ──────────────────────────────────────────────────────

    /// Current happiness.
    pub fn happiness(&self) -> f32 {
        self.happiness
    }

    /// Confirmed shakes since the last reset.
    pub fn shake_streak(&self) -> u32 {
        self.shake_streak
    }

    /// Headpats since the last burst.
    pub fn affection_streak(&self) -> u32 {
        self.affection_streak
    }

    /// Consecutive rough ticks.
    pub fn rough_streak(&self) -> u32 {
        self.rough_streak
    }

    /// Consecutive gentle ticks since the last reward.
    pub fn gentle_streak(&self) -> u32 {
        self.gentle_streak
    }

    /// Consecutive still ticks.
    pub fn still_streak(&self) -> u32 {
        self.still_streak
    }

    /// Configuration in use.
    pub fn config(&self) -> &EmotionConfig {
        &self.cfg
    }

    /// Baseline expression for the current state.
    pub fn mood(&self) -> Mood {
        let doze = self.cfg.doze_after_still_ticks;
        if doze > 0 && self.still_streak >= doze {
            return Mood::Sleepy;
        }
        mood_for_happiness(self.happiness)
    }
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self::new(EmotionConfig::default())
    }
}

/// Happiness bands → baseline mood.
pub fn mood_for_happiness(h: f32) -> Mood {
    if h < 15.0 {
        Mood::Sad
    } else if h < 35.0 {
        Mood::Concerned
    } else if h < 50.0 {
        Mood::Curious
    } else if h < 85.0 {
        Mood::Happy
    } else {
        Mood::ReallyHappy
    }
}

fn push(events: &mut Events, e: BehaviorEvent) {
    // At most two events per update; capacity is four.
    if let Err(dropped) = events.push(e) {
        warn!(event = ?dropped, "event list full, dropping event");
        debug_assert!(false, "event list overflow");
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_initial_state() {
        let s = EmotionalState::default();
        assert_eq!(s.happiness(), 50.0);
        assert_eq!(s.shake_streak(), 0);
        assert_eq!(s.mood(), Mood::Happy);
    }

    #[test]
    fn test_dead_zone_changes_nothing() {
        let mut s = EmotionalState::default();
        s.apply(Some(Movement::Gentle));
        let events = s.apply(None);
        assert!(events.is_empty());
        assert_eq!(s.gentle_streak(), 1);
        assert_eq!(s.happiness(), 50.0);
    }

    #[test]
    fn test_seven_shakes_break_heart() {
        let mut s = EmotionalState::default();
        for i in 1..7 {
            let ev = s.apply(Some(Movement::Shaking));
            assert_eq!(ev.as_slice(), &[BehaviorEvent::Shaken]);
            assert_eq!(s.shake_streak(), i);
            assert_eq!(s.happiness(), 50.0, "single shakes leave happiness alone");
        }
        let ev = s.apply(Some(Movement::Shaking));
        assert_eq!(ev.as_slice(), &[BehaviorEvent::Shaken, BehaviorEvent::Heartbroken]);
        assert_eq!(s.happiness(), 0.0);
        assert_eq!(s.shake_streak(), 0);
        assert_eq!(s.mood(), Mood::Sad);
    }

    #[test]
    fn test_gentle_reward_is_a_pulse() {
        let mut s = EmotionalState::default();
        for _ in 0..14 {
            assert!(s.apply(Some(Movement::Gentle)).is_empty());
        }
        assert_eq!(s.happiness(), 50.0);
        let ev = s.apply(Some(Movement::Gentle));
        assert_eq!(ev.as_slice(), &[BehaviorEvent::GentleReward]);
        assert!(approx(s.happiness(), 50.5));
        assert_eq!(s.gentle_streak(), 0);
        // Another 14 gentle ticks pay nothing more.
        for _ in 0..14 {
            s.apply(Some(Movement::Gentle));
        }
        assert!(approx(s.happiness(), 50.5));
    }

    #[test]
    fn test_still_interrupts_gentle_streak() {
        let mut s = EmotionalState::default();
        for _ in 0..10 {
            s.apply(Some(Movement::Gentle));
        }
        s.apply(Some(Movement::Still));
        assert_eq!(s.gentle_streak(), 0);
    }

    #[test]
    fn test_rough_dampened_when_very_happy() {
        let mut s = EmotionalState::with_happiness(EmotionConfig::default(), 90.0);
        let ev = s.apply(Some(Movement::Rough));
        assert_eq!(ev.as_slice(), &[BehaviorEvent::Startled]);
        assert!(approx(s.happiness(), 85.0));
        assert_eq!(s.rough_streak(), 1);
    }

    #[test]
    fn test_single_shake_to_heartbreak_keeps_both_events() {
        let cfg = EmotionConfig { shake_threshold: 1, ..EmotionConfig::default() };
        let mut s = EmotionalState::new(cfg);
        let ev = s.apply(Some(Movement::Shaking));
        assert_eq!(ev.as_slice(), &[BehaviorEvent::Shaken, BehaviorEvent::Heartbroken]);
        assert_eq!(s.happiness(), 0.0);
    }

    #[test]
    fn test_rough_angers_when_not_very_happy() {
        let mut s = EmotionalState::default();
        let ev = s.apply(Some(Movement::Rough));
        assert_eq!(ev.as_slice(), &[BehaviorEvent::Angered]);
        assert!(approx(s.happiness(), 40.0));
    }

    #[test]
    fn test_rough_resets_gentle_and_gentle_resets_rough() {
        let mut s = EmotionalState::default();
        s.apply(Some(Movement::Gentle));
        s.apply(Some(Movement::Rough));
        assert_eq!(s.gentle_streak(), 0);
        s.apply(Some(Movement::Gentle));
        assert_eq!(s.rough_streak(), 0);
    }

    #[test]
    fn test_shake_streak_forgiven_after_long_stillness() {
        let cfg = EmotionConfig { shake_forgive_still_ticks: 5, ..EmotionConfig::default() };
        let mut s = EmotionalState::new(cfg);
        s.apply(Some(Movement::Shaking));
        s.apply(Some(Movement::Shaking));
        for _ in 0..4 {
            s.apply(Some(Movement::Still));
        }
        assert_eq!(s.shake_streak(), 2);
        s.apply(Some(Movement::Still));
        assert_eq!(s.shake_streak(), 0);
    }

    #[test]
    fn test_headpats_burst_at_threshold() {
        let mut s = EmotionalState::default();
        for i in 1..4 {
            assert_eq!(s.headpat().as_slice(), &[BehaviorEvent::Headpat]);
            assert_eq!(s.affection_streak(), i);
        }
        // 50 -> 55 -> 60 -> 65, then burst +15
        assert!(approx(s.happiness(), 65.0));
        assert_eq!(s.headpat().as_slice(), &[BehaviorEvent::AffectionBurst]);
        assert!(approx(s.happiness(), 80.0));
        assert_eq!(s.affection_streak(), 0);
    }

    #[test]
    fn test_dozes_off_once() {
        let cfg = EmotionConfig { doze_after_still_ticks: 3, ..EmotionConfig::default() };
        let mut s = EmotionalState::new(cfg);
        assert!(s.apply(Some(Movement::Still)).is_empty());
        assert!(s.apply(Some(Movement::Still)).is_empty());
        assert_eq!(s.apply(Some(Movement::Still)).as_slice(), &[BehaviorEvent::DozedOff]);
        assert_eq!(s.mood(), Mood::Sleepy);
        assert!(s.apply(Some(Movement::Still)).is_empty());
        s.apply(Some(Movement::Gentle));
        assert_eq!(s.mood(), Mood::Happy);
    }

    #[test]
    fn test_mood_bands() {
        assert_eq!(mood_for_happiness(0.0), Mood::Sad);
        assert_eq!(mood_for_happiness(20.0), Mood::Concerned);
        assert_eq!(mood_for_happiness(40.0), Mood::Curious);
        assert_eq!(mood_for_happiness(50.0), Mood::Happy);
        assert_eq!(mood_for_happiness(85.0), Mood::ReallyHappy);
        assert_eq!(mood_for_happiness(100.0), Mood::ReallyHappy);
    }
}
