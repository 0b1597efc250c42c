/*
 * This source code is licensed under the Business Source License 1.1
 * (BUSL-1.1). Production use requires a commercial license.
 */

//! Audio feedback: named tone sequences and a non-blocking dispatcher.
//!
//! A [`SoundBank`] holds flattened cues (`follow` chains already resolved).
//! The [`FeedbackDispatcher`] plays one cue at a time by issuing each tone to
//! the [`AudioOut`] collaborator as the previous one runs out; it never
//! sleeps.
//!
//! # Overlap policy
//!
//! Pre-emption: the newest cue wins and the one sounding is cut short. When
//! several events land in the same tick, the last one decides the cue.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::emotion::BehaviorEvent;
use crate::error::ConfigError;

/// Longest `follow` chain that is resolved.
pub const MAX_FOLLOW_DEPTH: usize = 4;

/// Piezo buzzer (or anything that can hold a frequency for a while).
pub trait AudioOut {
    /// Start a tone now for `duration_ms`. `0` Hz is a silent hold. A newer
    /// call replaces whatever is sounding.
    fn play_tone(&mut self, frequency_hz: u32, duration_ms: u32);
}

/// One step of a cue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tone {
    /// Frequency in Hz; 0 is a rest.
    pub frequency_hz: u32,
    /// Duration in milliseconds.
    pub duration_ms: u32,
}

impl Tone {
    /// Construct a tone.
    pub const fn new(frequency_hz: u32, duration_ms: u32) -> Self {
        Self { frequency_hz, duration_ms }
    }
}

/// A sound bank entry as written in configuration.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SoundEntry {
    /// `[frequency_hz, duration_ms]` pairs.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sequence: Vec<[u32; 2]>,
    /// Entry to play after this one.
    #[cfg_attr(feature = "serde", serde(default))]
    pub follow: Option<String>,
}

impl SoundEntry {
    fn new(sequence: &[[u32; 2]], follow: Option<&str>) -> Self {
        Self { sequence: sequence.to_vec(), follow: follow.map(String::from) }
    }

    fn is_empty(&self) -> bool {
        self.sequence.is_empty() && self.follow.is_none()
    }
}

// ─── Cue names ──────────────────────────────────────────────────────────────

/// Gentle reward.
pub const HAPPY_SOUND: &str = "happy_sound";
/// Rough handling while unhappy.
pub const ANGRY_SOUND: &str = "angry_sound";
/// A single headpat.
pub const HEADPAT_SOUND: &str = "headpat_sound";
/// Affection burst.
pub const LOVE_SOUND: &str = "love_sound";
/// Power-on and return from the menu.
pub const STARTUP_SEQUENCE: &str = "startup_sequence";
/// Rough handling while very happy.
pub const CURIOUS_SCARED_SOUND: &str = "curious_scared_sound";
/// Dozing off.
pub const EEPY_SOUND: &str = "eepy_sound";
/// One shake wobble.
pub const SHOOK_SOUND: &str = "shook_sound";
/// Confirmed shake: two wobbles in quick succession.
pub const DIZZY_SOUND: &str = "dizzy_sound";
/// Shake streak crossed its threshold.
pub const HEARTBROKEN_SOUND: &str = "heartbroken_sound";
/// Menu click.
pub const CLICK_SOUND: &str = "click_sound";

const SHOOK: [[u32; 2]; 8] = [
    [1568, 12], [1245, 12], [1568, 12], [1319, 12],
    [1568, 12], [1175, 12], [1568, 12], [1319, 12],
];

fn builtin_entries() -> BTreeMap<String, SoundEntry> {
    let mut heartbroken: Vec<[u32; 2]> = Vec::new();
    heartbroken.extend_from_slice(&SHOOK);
    heartbroken.push([0, 100]);
    heartbroken.extend_from_slice(&SHOOK);
    heartbroken.push([0, 150]);

    let mut m = BTreeMap::new();
    let mut put = |name: &str, entry: SoundEntry| {
        m.insert(String::from(name), entry);
    };
    put(HAPPY_SOUND, SoundEntry::new(
        &[[1319, 18], [1568, 18], [1760, 18], [2093, 18], [2349, 18], [2637, 40]],
        None,
    ));
    put(ANGRY_SOUND, SoundEntry::new(
        &[[1760, 15], [2093, 15], [1568, 15], [2349, 15], [1760, 15], [2637, 15], [1397, 15], [2093, 15]],
        None,
    ));
    put(HEADPAT_SOUND, SoundEntry::new(
        &[[1175, 15], [1397, 15], [1760, 15], [2093, 15], [2637, 80]],
        None,
    ));
    put(LOVE_SOUND, SoundEntry::new(&[[0, 40]], Some(HAPPY_SOUND)));
    put(CLICK_SOUND, SoundEntry::new(&[[3000, 20], [4000, 20]], None));
    put(STARTUP_SEQUENCE, SoundEntry::new(
        &[[2000, 15], [2500, 15], [3000, 15], [3500, 15]],
        None,
    ));
    put(CURIOUS_SCARED_SOUND, SoundEntry::new(&[[1319, 18], [1568, 18], [1760, 18]], None));
    put(EEPY_SOUND, SoundEntry::new(
        &[[2093, 30], [1760, 35], [1568, 40], [1397, 45], [1568, 50], [1319, 140]],
        None,
    ));
    put(SHOOK_SOUND, SoundEntry::new(&SHOOK, None));
    let mut dizzy = SHOOK.to_vec();
    dizzy.push([0, 100]);
    put(DIZZY_SOUND, SoundEntry { sequence: dizzy, follow: Some(String::from(SHOOK_SOUND)) });
    put(HEARTBROKEN_SOUND, SoundEntry { sequence: heartbroken, follow: Some(String::from(EEPY_SOUND)) });
    m
}

/// Cue name for a behaviour event.
pub fn cue_for(event: BehaviorEvent) -> &'static str {
    match event {
        BehaviorEvent::Shaken => DIZZY_SOUND,
        BehaviorEvent::Heartbroken => HEARTBROKEN_SOUND,
        BehaviorEvent::GentleReward => HAPPY_SOUND,
        BehaviorEvent::Angered => ANGRY_SOUND,
        BehaviorEvent::Startled => CURIOUS_SCARED_SOUND,
        BehaviorEvent::Headpat => HEADPAT_SOUND,
        BehaviorEvent::AffectionBurst => LOVE_SOUND,
        BehaviorEvent::DozedOff => EEPY_SOUND,
    }
}

// ─── Sound bank ─────────────────────────────────────────────────────────────

/// Resolved cues by name.
#[derive(Clone, Debug)]
pub struct SoundBank {
    cues: HashMap<String, Vec<Tone>>,
}

impl SoundBank {
    /// The built-in bank.
    pub fn builtin() -> Self {
        Self::resolve(&builtin_entries())
    }

    /// Built-in bank with `custom` entries layered on top. Empty custom
    /// entries keep the built-in version; a custom entry with only a
    /// `follow` plays the built-in tones first, then its own follow.
    pub fn with_entries(custom: BTreeMap<String, SoundEntry>) -> Self {
        let mut entries = builtin_entries();
        for (name, mut entry) in custom {
            if entry.is_empty() {
                let e = ConfigError::EmptyEntry(name);
                warn!(error = %e, "sound entry ignored");
                continue;
            }
            if entry.sequence.is_empty() {
                if let Some(builtin) = entries.get(&name) {
                    entry.sequence = builtin.sequence.clone();
                }
            }
            entries.insert(name, entry);
        }
        Self::resolve(&entries)
    }

    /// Parse `{ "sounds": { "<name>": { "sequence": [[f, ms], ...], "follow": "<name>" } } }`.
    /// A document that fails to parse yields the built-in bank.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct Doc {
            sounds: BTreeMap<String, SoundEntry>,
        }
        match serde_json::from_str::<Doc>(json) {
            Ok(doc) => Self::with_entries(doc.sounds),
            Err(e) => {
                let e = ConfigError::from(e);
                warn!(error = %e, "sound bank rejected, using built-in");
                Self::builtin()
            }
        }
    }

    fn resolve(entries: &BTreeMap<String, SoundEntry>) -> Self {
        let mut cues = HashMap::new();
        for name in entries.keys() {
            let mut tones = Vec::new();
            flatten(entries, name, 0, &mut tones);
            cues.insert(name.clone(), tones);
        }
        Self { cues }
    }

    /// Tones for `name`; empty if unknown.
    pub fn cue(&self, name: &str) -> &[Tone] {
        self.cues.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total length of a cue in milliseconds.
    pub fn duration_ms(&self, name: &str) -> u64 {
        self.cue(name).iter().map(|t| u64::from(t.duration_ms)).sum()
    }
}

impl Default for SoundBank {
    fn default() -> Self {
        Self::builtin()
    }
}

fn flatten(entries: &BTreeMap<String, SoundEntry>, name: &str, depth: usize, out: &mut Vec<Tone>) {
    let Some(entry) = entries.get(name) else {
        return;
    };
    out.extend(entry.sequence.iter().map(|&[f, d]| Tone::new(f, d)));
    if let Some(next) = entry.follow.as_deref() {
        if depth >= MAX_FOLLOW_DEPTH {
            warn!(cue = name, "follow chain too deep, truncated");
        } else if !entries.contains_key(next) {
            let e = ConfigError::UnknownFollow(String::from(name), String::from(next));
            warn!(error = %e, "follow ignored");
        } else {
            flatten(entries, next, depth + 1, out);
        }
    }
}

// ─── Dispatcher ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Playing {
    cue: &'static str,
    step: usize,
    step_end_ms: u64,
}

/// Plays at most one cue at a time; newest wins.
#[derive(Debug)]
pub struct FeedbackDispatcher {
    bank: SoundBank,
    muted: bool,
    current: Option<Playing>,
}

impl FeedbackDispatcher {
    /// Construct over a resolved bank.
    pub fn new(bank: SoundBank, muted: bool) -> Self {
        Self { bank, muted, current: None }
    }

    /// Map the tick's events to a cue. The last event wins.
    pub fn dispatch<A: AudioOut + ?Sized>(
        &mut self,
        events: &[BehaviorEvent],
        now_ms: u64,
        audio: &mut A,
    ) {
        if let Some(&last) = events.last() {
            self.play(cue_for(last), now_ms, audio);
        }
    }

    /// Start `cue` now, cutting short whatever is sounding.
    pub fn play<A: AudioOut + ?Sized>(&mut self, cue: &'static str, now_ms: u64, audio: &mut A) {
        if let Some(prev) = self.current {
            debug!(cut = prev.cue, by = cue, "cue pre-empted");
        }
        self.current = None;
        let Some(&first) = self.bank.cue(cue).first() else {
            debug!(cue, "no tones for cue");
            return;
        };
        self.emit(first, audio);
        self.current = Some(Playing {
            cue,
            step: 0,
            step_end_ms: now_ms + u64::from(first.duration_ms),
        });
    }

    /// Advance the current cue. Call every loop iteration.
    pub fn poll<A: AudioOut + ?Sized>(&mut self, now_ms: u64, audio: &mut A) {
        let Some(mut p) = self.current else {
            return;
        };
        if now_ms < p.step_end_ms {
            return;
        }
        p.step += 1;
        match self.bank.cue(p.cue).get(p.step).copied() {
            Some(tone) => {
                self.emit(tone, audio);
                p.step_end_ms = now_ms + u64::from(tone.duration_ms);
                self.current = Some(p);
            }
            None => self.current = None,
        }
    }

    fn emit<A: AudioOut + ?Sized>(&self, tone: Tone, audio: &mut A) {
        let freq = if self.muted { 0 } else { tone.frequency_hz };
        audio.play_tone(freq, tone.duration_ms);
    }

    /// Whether a cue is currently sounding.
    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    /// When the sounding tone runs out and the next one is due.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.current.map(|p| p.step_end_ms)
    }

    /// Name of the cue currently sounding.
    pub fn current_cue(&self) -> Option<&'static str> {
        self.current.map(|p| p.cue)
    }

    /// Mute or unmute; a muted dispatcher keeps timing but plays rests.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// The resolved bank.
    pub fn bank(&self) -> &SoundBank {
        &self.bank
    }
}
