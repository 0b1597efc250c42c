//! Error taxonomy for the behaviour core.
//!
//! Nothing in here is fatal. Sensing faults degrade to a neutral reading,
//! configuration faults fall back to built-in tables, surface faults are
//! logged, and tick faults are caught at the top of the loop.

use thiserror::Error;

/// Failure reported by the register transport underneath the accelerometer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BusError {
    /// The device did not acknowledge its address.
    #[error("no acknowledge from device 0x{0:02x}")]
    Nack(u8),
    /// The transfer started but did not complete.
    #[error("bus transfer to 0x{addr:02x} register 0x{reg:02x} failed")]
    Transfer {
        /// 7-bit device address.
        addr: u8,
        /// Register the transfer targeted.
        reg: u8,
    },
}

/// Why a motion sample could not be produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SensorError {
    /// The sensor never initialised or has gone away.
    #[error("accelerometer unavailable")]
    Unavailable,
    /// The sensor is present but the read failed.
    #[error("accelerometer read failed: {0}")]
    Bus(#[from] BusError),
}

/// Failure reported by the render surface. Logged, never propagated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The display did not respond.
    #[error("display not responding")]
    NotResponding,
    /// A glyph could not be placed at the requested position.
    #[error("glyph rejected at ({x}, {y})")]
    GlyphRejected {
        /// Requested x position in pixels.
        x: i32,
        /// Requested y position in pixels.
        y: i32,
    },
}

/// Problems with injected configuration. Callers fall back to defaults.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("malformed configuration at line {line}, column {column}")]
    Malformed {
        /// 1-based line of the first syntax or type error.
        line: usize,
        /// 1-based column of the first syntax or type error.
        column: usize,
    },
    /// A table entry was present but had no frames or tones.
    #[error("entry `{0}` is empty")]
    EmptyEntry(alloc::string::String),
    /// A `follow` chain referenced an entry that does not exist.
    #[error("entry `{0}` follows unknown entry `{1}`")]
    UnknownFollow(alloc::string::String, alloc::string::String),
}

/// An internal fault inside a single loop tick.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum TickError {
    /// Jerk computation produced NaN or infinity.
    #[error("non-finite jerk {0}")]
    NonFiniteJerk(f32),
    /// The noise baseline left the finite range.
    #[error("noise baseline corrupted: {0}")]
    BaselineCorrupted(f32),
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Malformed { line: e.line(), column: e.column() }
    }
}
