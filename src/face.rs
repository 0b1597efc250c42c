//! Moods and the symbolic faces drawn for them.
//!
//! Faces are single-line ASCII glyph strings. Each mood owns an ordered,
//! cyclic list of frames and a frame period; the active frame is chosen from
//! wall-clock time, never from a counter. Custom tables are injected at
//! construction; any mood they leave out (or leave empty) keeps its built-in
//! sequence.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use tracing::warn;

use crate::error::ConfigError;

/// Expression tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Mood {
    /// Content.
    Happy,
    /// Delighted.
    ReallyHappy,
    /// Neutral, watching.
    Curious,
    /// Uneasy after rough handling.
    Concerned,
    /// Low happiness.
    Sad,
    /// Left alone and still for a long time.
    Sleepy,
    /// Just handled roughly.
    Angry,
    /// Startled while otherwise happy.
    Surprised,
    /// Transient face while being petted.
    Headpat,
    /// Transient face while being shaken.
    Dizzy,
}

impl Mood {
    /// Every mood with a built-in sequence.
    pub const ALL: [Mood; 10] = [
        Mood::Happy,
        Mood::ReallyHappy,
        Mood::Curious,
        Mood::Concerned,
        Mood::Sad,
        Mood::Sleepy,
        Mood::Angry,
        Mood::Surprised,
        Mood::Headpat,
        Mood::Dizzy,
    ];

    /// Stable lowercase name, used as the JSON key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::ReallyHappy => "really_happy",
            Mood::Curious => "curious",
            Mood::Concerned => "concerned",
            Mood::Sad => "sad",
            Mood::Sleepy => "sleepy",
            Mood::Angry => "angry",
            Mood::Surprised => "surprised",
            Mood::Headpat => "headpat",
            Mood::Dizzy => "dizzy",
        }
    }
}

/// One mood's frames and cadence.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaceSequence {
    /// Frames in display order; cycles forever.
    pub frames: Vec<String>,
    /// Milliseconds each frame is held.
    pub period_ms: u32,
    /// Whether the face drifts side to side.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sway: bool,
}

impl FaceSequence {
    fn built_in(frames: &[&str], period_ms: u32, sway: bool) -> Self {
        Self {
            frames: frames.iter().map(|f| String::from(*f)).collect(),
            period_ms,
            sway,
        }
    }

    /// Frame shown at absolute time `now_ms`.
    pub fn frame_at(&self, now_ms: u64) -> &str {
        if self.frames.is_empty() {
            return "";
        }
        let period = u64::from(self.period_ms.max(1));
        let idx = (now_ms / period) % self.frames.len() as u64;
        &self.frames[idx as usize]
    }

    /// Frame by explicit index, wrapping.
    pub fn frame(&self, idx: usize) -> &str {
        if self.frames.is_empty() {
            ""
        } else {
            &self.frames[idx % self.frames.len()]
        }
    }

    fn validate(&self, mood: Mood) -> Result<(), ConfigError> {
        if self.frames.is_empty() || self.frames.iter().all(|f| f.is_empty()) {
            return Err(ConfigError::EmptyEntry(String::from(mood.as_str())));
        }
        Ok(())
    }
}

/// Built-in frames, period and sway for a mood.
pub fn default_sequence(mood: Mood) -> FaceSequence {
    match mood {
        Mood::Happy => FaceSequence::built_in(
            &["(^_^)", "(^_^)", "('-')", "('-')", "('-')", "(^_^)"],
            2000,
            false,
        ),
        Mood::ReallyHappy => FaceSequence::built_in(
            &["(^o^)", "(^o^)", "(*^_^*)", "(*^_^*)", "(*^_^*)", "(^o^)"],
            1700,
            false,
        ),
        Mood::Curious => FaceSequence::built_in(
            &[
                "(o_o)", "(o_o)", "(-_-?)", "(-_-?)", "(-_-?)", "(._.)",
                "(._.)", "(._.)", "(-_-?)", "(-_-?)", "(-_-?)", "(o_o)",
            ],
            2600,
            true,
        ),
        Mood::Concerned => FaceSequence::built_in(
            &["(>_<)", "(>_<)", "(._.)", "(._.)", "(._.)", "(>_<)"],
            2600,
            true,
        ),
        Mood::Sad => FaceSequence::built_in(&["(T_T)", "(T_T)", "(;_;)"], 2600, true),
        Mood::Sleepy => FaceSequence::built_in(&["(-_-)", "(-_-)", "(u_u)"], 2600, true),
        Mood::Angry => FaceSequence::built_in(&["(>_<)", "(>_<)", "(>:[)"], 2600, true),
        Mood::Surprised => FaceSequence::built_in(&["(O_O)", "(O_O)", "(o_O)"], 2600, true),
        Mood::Headpat => FaceSequence::built_in(&["(^_^)", "(^_^)"], 400, false),
        Mood::Dizzy => FaceSequence::built_in(&["(@_@)", "(@_@)", "(x_x)"], 210, false),
    }
}

/// Close the eyes of whatever face would otherwise be shown.
pub fn blink(face: &str) -> String {
    face.chars()
        .map(|c| match c {
            '^' | 'o' | 'O' | 'x' | '_' => '-',
            other => other,
        })
        .collect()
}

/// Mood → frame sequence, with built-in fallbacks for every mood.
#[derive(Clone, Debug)]
pub struct FaceTable {
    sequences: HashMap<Mood, FaceSequence>,
}

impl FaceTable {
    /// The built-in table.
    pub fn builtin() -> Self {
        let sequences = Mood::ALL.iter().map(|&m| (m, default_sequence(m))).collect();
        Self { sequences }
    }

    /// Built-in table with `overrides` layered on top. Invalid overrides are
    /// logged and skipped.
    pub fn with_overrides<I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (Mood, FaceSequence)>,
    {
        let mut table = Self::builtin();
        for (mood, seq) in overrides {
            match seq.validate(mood) {
                Ok(()) => {
                    table.sequences.insert(mood, seq);
                }
                Err(e) => warn!(error = %e, "face override rejected, keeping default"),
            }
        }
        table
    }

    /// Parse a JSON object of `{ "<mood>": { "frames": [...], "period_ms": n } }`.
    /// A missing `sway` keeps the mood's built-in setting. Malformed
    /// documents fall back to the built-in table.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct Entry {
            frames: Vec<String>,
            period_ms: u32,
            sway: Option<bool>,
        }
        match serde_json::from_str::<alloc::collections::BTreeMap<Mood, Entry>>(json) {
            Ok(map) => Self::with_overrides(map.into_iter().map(|(mood, e)| {
                let sway = e.sway.unwrap_or_else(|| default_sequence(mood).sway);
                (mood, FaceSequence { frames: e.frames, period_ms: e.period_ms, sway })
            })),
            Err(e) => {
                let e = ConfigError::from(e);
                warn!(error = %e, "face table rejected, using built-in");
                Self::builtin()
            }
        }
    }

    /// Sequence for `mood`.
    pub fn get(&self, mood: Mood) -> &FaceSequence {
        // Every mood is inserted by `builtin`, and overrides only replace.
        &self.sequences[&mood]
    }
}

impl Default for FaceTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blink_closes_eyes() {
        assert_eq!(blink("(^_^)"), "(---)");
        assert_eq!(blink("(O_o)"), "(---)");
        assert_eq!(blink("(T_T)"), "(T-T)");
        assert_eq!(blink("(>:[)"), "(>:[)");
    }

    #[test]
    fn test_frame_at_is_time_driven_and_cyclic() {
        let seq = default_sequence(Mood::Sad);
        assert_eq!(seq.frame_at(0), "(T_T)");
        assert_eq!(seq.frame_at(2599), "(T_T)");
        assert_eq!(seq.frame_at(2 * 2600), "(;_;)");
        assert_eq!(seq.frame_at(3 * 2600), "(T_T)");
        // Far in the future still lands on a valid frame.
        assert!(!seq.frame_at(u64::MAX).is_empty());
    }

    #[test]
    fn test_builtin_covers_every_mood() {
        let t = FaceTable::builtin();
        for m in Mood::ALL {
            assert!(!t.get(m).frames.is_empty(), "{:?}", m);
        }
    }

    #[test]
    fn test_empty_override_keeps_default() {
        let bad = FaceSequence { frames: Vec::new(), period_ms: 100, sway: false };
        let t = FaceTable::with_overrides([(Mood::Happy, bad)]);
        assert_eq!(t.get(Mood::Happy), &default_sequence(Mood::Happy));
    }

    #[test]
    fn test_valid_override_replaces() {
        let custom = FaceSequence {
            frames: alloc::vec![String::from("(=^.^=)")],
            period_ms: 500,
            sway: false,
        };
        let t = FaceTable::with_overrides([(Mood::Curious, custom.clone())]);
        assert_eq!(t.get(Mood::Curious), &custom);
        assert_eq!(t.get(Mood::Sad), &default_sequence(Mood::Sad));
    }
}
