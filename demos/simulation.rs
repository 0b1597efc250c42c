//! # Companion Afternoon Simulation
//!
//! Runs the full behaviour loop against a simulated accelerometer on a fake
//! clock. The companion sits on the desk, gets carried around gently, is
//! handled roughly, gets shaken, receives a round of headpats and is finally
//! left alone to doze off. Every face change and cue is printed as it happens.
//!
//! Run with: `cargo run --example simulation --features std`
//! Raise `MAX_LEVEL` to `DEBUG` for per-tick classifier output.

use std::cell::Cell;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::Level;

use sidekick_core::runtime::{Companion, RenderSurface};
use sidekick_core::{
    AudioOut, FaceTable, MotionSensor, Sample, SensorError, SidekickConfig, SoundBank,
    SurfaceError,
};

const MAX_LEVEL: Level = Level::INFO;

// ── Simulated hardware ───────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Handling {
    Resting,
    Carried,
    Rough,
    Shaken,
}

/// Accelerometer whose behaviour is set by the script below.
struct SimulatedHand {
    handling: Handling,
    rng: SmallRng,
    flip: bool,
}

impl MotionSensor for SimulatedHand {
    fn read(&mut self) -> Result<Sample, SensorError> {
        let jitter = |rng: &mut SmallRng, amp: i16| rng.gen_range(-amp..=amp);
        let s = match self.handling {
            Handling::Resting => Sample::new(
                jitter(&mut self.rng, 300),
                jitter(&mut self.rng, 300),
                1000 + jitter(&mut self.rng, 300),
            ),
            Handling::Carried => Sample::new(
                jitter(&mut self.rng, 4000),
                jitter(&mut self.rng, 4000),
                1000 + jitter(&mut self.rng, 4000),
            ),
            Handling::Rough => {
                self.flip = !self.flip;
                let v = if self.flip { 30000 } else { -30000 };
                Sample::new(v, v / 2, jitter(&mut self.rng, 8000))
            }
            Handling::Shaken => {
                self.flip = !self.flip;
                let v = if self.flip { 16000 } else { -16000 };
                Sample::new(v, 0, 1000)
            }
        };
        Ok(s)
    }
}

/// Prints the face whenever it changes.
struct Terminal {
    clock: Rc<Cell<u64>>,
    line: String,
    last_printed: String,
}

impl RenderSurface for Terminal {
    fn clear(&mut self) -> Result<(), SurfaceError> {
        self.line.clear();
        Ok(())
    }

    fn draw_glyph(&mut self, text: &str, x: i32, _y: i32) -> Result<(), SurfaceError> {
        let col = (x.max(0) / 8) as usize;
        self.line.push_str(&" ".repeat(col.saturating_sub(self.line.len())));
        self.line.push_str(text);
        Ok(())
    }

    fn present(&mut self) -> Result<(), SurfaceError> {
        if self.line != self.last_printed {
            println!("{:>7.2}s |{:<16}|", self.clock.get() as f32 / 1000.0, self.line);
            self.last_printed = self.line.clone();
        }
        Ok(())
    }
}

/// Counts tones instead of beeping.
#[derive(Default)]
struct Piezo {
    tones: u32,
    sounding_ms: u64,
}

impl AudioOut for Piezo {
    fn play_tone(&mut self, frequency_hz: u32, duration_ms: u32) {
        self.tones += 1;
        if frequency_hz > 0 {
            self.sounding_ms += u64::from(duration_ms);
        }
    }
}

// ── Script ───────────────────────────────────────────────────────────────────

fn handling_at(t_ms: u64) -> Handling {
    match t_ms {
        0..=5_999 => Handling::Resting,
        6_000..=17_999 => Handling::Carried,
        18_000..=19_999 => Handling::Rough,
        20_000..=21_499 => Handling::Shaken,
        _ => Handling::Resting,
    }
}

fn headpat_due(t_ms: u64) -> bool {
    matches!(t_ms, 26_000 | 26_900 | 27_800 | 28_700)
}

fn main() {
    tracing_subscriber::fmt().with_max_level(MAX_LEVEL).with_target(false).init();

    let clock = Rc::new(Cell::new(0u64));
    let terminal = Terminal { clock: Rc::clone(&clock), line: String::new(), last_printed: String::new() };
    let sensor = SimulatedHand { handling: Handling::Resting, rng: SmallRng::seed_from_u64(42), flip: false };
    let mut companion = Companion::new(
        SidekickConfig::default(),
        FaceTable::builtin(),
        SoundBank::builtin(),
        sensor,
        terminal,
        Piezo::default(),
    );

    println!("═══ sidekick afternoon ═══");
    companion.start(0);

    let end_ms = 95_000;
    let mut last_cue = None;
    let mut last_handling = Handling::Resting;
    for now in 0..end_ms {
        clock.set(now);
        let handling = handling_at(now);
        if handling != last_handling {
            println!("── {:?} ──", handling);
            last_handling = handling;
        }
        companion.sensor_mut().handling = handling;
        if headpat_due(now) {
            companion.headpat(now);
        }
        if let Err(e) = companion.step(now) {
            eprintln!("tick failed: {e}");
        }
        let cue = companion.feedback().current_cue();
        if let Some(name) = cue.filter(|_| cue != last_cue) {
            println!("          ♪ {name}");
        }
        last_cue = cue;
    }

    let state = companion.state();
    println!("═══ summary ═══");
    println!("happiness      {:.2}", state.happiness());
    println!("mood           {:?}", state.mood());
    println!("baseline       {:.0}", companion.baseline());
    println!("tones played   {}", companion.audio().tones);
    println!("buzzer on (ms) {}", companion.audio().sounding_ms);
}
