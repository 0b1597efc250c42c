//! # sidekick-core
//!
//! Behavioural core for a handheld desk companion: an accelerometer, a small
//! display showing an ASCII face, and a piezo buzzer.
//!
//! ---
//!
//! ## How it feels
//!
//! Pick it up and carry it gently and it slowly warms to you. Shake it and it
//! gets dizzy; keep shaking and it loses all trust. Handle it roughly and it
//! either gets angry or, if it already likes you a lot, just looks startled.
//! Pat it on the head a few times in a row and it lights up. Leave it alone
//! long enough and it dozes off.
//!
//! None of this is scripted per gesture. Motion is reduced to a jerk
//! magnitude, compared against an adaptive noise floor, and classified over a
//! short window. Classifications drive a single bounded happiness scalar with
//! asymmetric gain and loss, and the face is a pure function of that state and
//! wall-clock time.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! MotionSensor → MotionSampler → jerk ─┬→ NoiseFloor ──baseline─┐
//!                                      └→ JerkWindow ───────────┴→ MovementClassifier
//!                                                                         ↓
//!                   AnimationScheduler ←─ mood ── EmotionalState ←── Movement
//!                          ↓                           ↓
//!                    RenderSurface             FeedbackDispatcher → AudioOut
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`sensor`] | [`MotionSensor`], [`Adxl345`], [`StubSensor`] | Accelerometer capability and register decoding |
//! | [`sampler`] | [`MotionSampler`], [`Reading`] | Per-tick jerk, degraded readings on fault |
//! | [`noise`] | [`NoiseFloor`] | Conditional EMA of resting jitter |
//! | [`window`] | [`JerkWindow`] | Fixed sliding window with summary stats |
//! | [`classifier`] | [`MovementClassifier`], [`Movement`] | Still / Gentle / Rough / Shaking with spike debounce |
//! | [`happiness`] | [`MeterConfig`] | Bounded asymmetric meter updates |
//! | [`emotion`] | [`EmotionalState`], [`BehaviorEvent`] | Happiness, escalation streaks, mood |
//! | [`face`] | [`FaceTable`], [`Mood`] | Named face sequences and the blink transform |
//! | [`animation`] | [`AnimationScheduler`] | Frames, sway, blink overlay, transients |
//! | [`feedback`] | [`FeedbackDispatcher`], [`SoundBank`] | Non-blocking buzzer cues, newest wins |
//! | [`runtime`] | [`Companion`], [`Timebase`] | Cooperative two-cadence loop |
//! | [`config`] | [`SidekickConfig`] | Tunables with defaults (JSON with `serde`) |
//! | [`error`] | [`SensorError`], [`TickError`] | Error taxonomy |
//!
//! ## `no_std`
//!
//! This crate is `#![no_std]` by default and needs `alloc` for the face table
//! and sound bank. Enable `std` for [`runtime::SystemTimebase`] and `std`
//! support in `tracing`. Enable `serde` for JSON configuration.
//!
//! ## License
//!
//! Business Source License 1.1. Free for evaluation and non-production use.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod sensor;
pub mod sampler;
pub mod noise;
pub mod window;
pub mod classifier;
pub mod happiness;
pub mod emotion;
pub mod face;
pub mod animation;
pub mod feedback;
pub mod config;
pub mod runtime;

pub use animation::{AnimationConfig, AnimationScheduler, Frame, Transient};
pub use classifier::{Classification, ClassifierConfig, Movement, MovementClassifier};
pub use config::{LoopConfig, SidekickConfig};
pub use emotion::{BehaviorEvent, EmotionConfig, EmotionalState, Events};
pub use error::{BusError, ConfigError, SensorError, SurfaceError, TickError};
pub use face::{FaceSequence, FaceTable, Mood};
pub use feedback::{AudioOut, FeedbackDispatcher, SoundBank, SoundEntry, Tone};
pub use happiness::MeterConfig;
pub use noise::{NoiseConfig, NoiseFloor};
pub use runtime::{
    Companion, LoopExit, ManualTimebase, MenuSignal, RenderSurface, SenseReport, Timebase,
};
pub use sampler::{MotionSampler, Reading};
pub use sensor::{Accelerometer, Adxl345, MotionSensor, RegisterBus, Sample, StubSensor};
pub use window::{JerkWindow, WindowStats};
