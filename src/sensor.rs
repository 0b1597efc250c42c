//! Accelerometer capability and the two shipped variants.
//!
//! The device carries an ADXL345 on I²C. This module provides the register
//! decoding for that part ([`Adxl345`]) on top of any [`RegisterBus`], plus a
//! [`StubSensor`] that reports the device lying flat and motionless. Which one
//! is used is decided exactly once, by [`Accelerometer::probe`].
//!
//! # Invariants
//!
//! - The stub never fails and always returns [`REST_SAMPLE`].
//! - A failed probe never panics; it selects the stub and logs a warning.

use tracing::{debug, warn};

use crate::error::{BusError, SensorError};

/// One raw 3-axis reading in device units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// X axis.
    pub x: i16,
    /// Y axis.
    pub y: i16,
    /// Z axis.
    pub z: i16,
}

impl Sample {
    /// Construct a sample from its three axes.
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Euclidean magnitude of `self - prev`.
    pub fn jerk_from(&self, prev: &Sample) -> f32 {
        let dx = self.x as f32 - prev.x as f32;
        let dy = self.y as f32 - prev.y as f32;
        let dz = self.z as f32 - prev.z as f32;
        libm::sqrtf(dx * dx + dy * dy + dz * dz)
    }
}

/// Reading reported by the stub: flat on the desk, gravity on Z.
pub const REST_SAMPLE: Sample = Sample::new(0, 0, 1000);

/// Anything that can hand the core one accelerometer sample per tick.
pub trait MotionSensor {
    /// Read one sample, or report that none is available right now.
    fn read(&mut self) -> Result<Sample, SensorError>;

    /// `true` when readings are synthesised rather than measured.
    fn is_simulated(&self) -> bool {
        false
    }
}

/// Register-level transport the ADXL345 sits behind (I²C in the device).
pub trait RegisterBus {
    /// Write a single byte to `reg` on the device at `addr`.
    fn write_register(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), BusError>;
    /// Fill `buf` starting at `reg`, auto-incrementing.
    fn read_registers(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), BusError>;
}

// ─── ADXL345 ────────────────────────────────────────────────────────────────

/// Default 7-bit I²C address (ALT pin low).
pub const ADXL345_ADDRESS: u8 = 0x53;
const REG_BW_RATE: u8 = 0x2C;
const REG_POWER_CTL: u8 = 0x2D;
const REG_DATA_FORMAT: u8 = 0x31;
const REG_DATAX0: u8 = 0x32;

/// Measurement mode.
const POWER_CTL_MEASURE: u8 = 0x08;
/// ±8 g, full resolution.
const DATA_FORMAT_8G_FULL_RES: u8 = 0x0B;
/// 800 Hz output data rate.
const BW_RATE_800HZ: u8 = 0x0D;

/// ADXL345 accelerometer on a [`RegisterBus`].
#[derive(Debug)]
pub struct Adxl345<B: RegisterBus> {
    bus: B,
    addr: u8,
}

impl<B: RegisterBus> Adxl345<B> {
    /// Configure the part for fast shake detection and return the handle.
    ///
    /// On failure the bus is handed back so the caller can reuse it.
    pub fn init(mut bus: B, addr: u8) -> Result<Self, (B, BusError)> {
        let setup = [
            (REG_POWER_CTL, POWER_CTL_MEASURE),
            (REG_DATA_FORMAT, DATA_FORMAT_8G_FULL_RES),
            (REG_BW_RATE, BW_RATE_800HZ),
        ];
        for (reg, value) in setup {
            if let Err(e) = bus.write_register(addr, reg, value) {
                return Err((bus, e));
            }
        }
        Ok(Self { bus, addr })
    }

    /// Release the underlying bus.
    pub fn into_bus(self) -> B {
        self.bus
    }
}

impl<B: RegisterBus> MotionSensor for Adxl345<B> {
    fn read(&mut self) -> Result<Sample, SensorError> {
        let mut raw = [0u8; 6];
        self.bus.read_registers(self.addr, REG_DATAX0, &mut raw)?;
        Ok(decode_axes(&raw))
    }
}

/// Decode the six DATAX0..DATAZ1 bytes (little-endian, two's complement).
pub fn decode_axes(raw: &[u8; 6]) -> Sample {
    Sample {
        x: i16::from_le_bytes([raw[0], raw[1]]),
        y: i16::from_le_bytes([raw[2], raw[3]]),
        z: i16::from_le_bytes([raw[4], raw[5]]),
    }
}

// ─── Stub ───────────────────────────────────────────────────────────────────

/// Stand-in used when no accelerometer answered at boot.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubSensor;

impl MotionSensor for StubSensor {
    fn read(&mut self) -> Result<Sample, SensorError> {
        Ok(REST_SAMPLE)
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

// ─── Selection ──────────────────────────────────────────────────────────────

/// The accelerometer the device ended up with after boot.
#[derive(Debug)]
pub enum Accelerometer<B: RegisterBus> {
    /// Real part answered and was configured.
    Real(Adxl345<B>),
    /// Nothing answered; motion is simulated as perfectly still.
    Stub(StubSensor),
}

impl<B: RegisterBus> Accelerometer<B> {
    /// Try to bring up the ADXL345 at its default address, falling back to
    /// the stub if register setup fails.
    pub fn probe(bus: B) -> Self {
        match Adxl345::init(bus, ADXL345_ADDRESS) {
            Ok(dev) => {
                debug!("adxl345 configured at 0x{:02x}", ADXL345_ADDRESS);
                Accelerometer::Real(dev)
            }
            Err((_bus, e)) => {
                warn!(error = %e, "adxl345 init failed, using stub accelerometer");
                Accelerometer::Stub(StubSensor)
            }
        }
    }

    /// `true` when running on the stub (the face shows a debug badge).
    pub fn is_stub(&self) -> bool {
        matches!(self, Accelerometer::Stub(_))
    }
}

impl<B: RegisterBus> MotionSensor for Accelerometer<B> {
    fn read(&mut self) -> Result<Sample, SensorError> {
        match self {
            Accelerometer::Real(dev) => dev.read(),
            Accelerometer::Stub(stub) => stub.read(),
        }
    }

    fn is_simulated(&self) -> bool {
        self.is_stub()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
