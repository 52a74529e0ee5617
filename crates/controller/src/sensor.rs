//! Soil moisture sampling. Every backend reports a percentage in 0..=100;
//! the reference backend is a uniform random stub.

use anyhow::Result;
use serde::Serialize;
use std::fmt;

/// Soil moisture as an integer percentage, always within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MoistureReading(u8);

impl MoistureReading {
    pub const MAX: u8 = 100;

    /// Returns `None` for values above 100.
    pub fn new(percent: u8) -> Option<Self> {
        (percent <= Self::MAX).then_some(Self(percent))
    }

    /// Round and clamp an arbitrary float into the valid range.
    pub fn clamped(percent: f64) -> Self {
        if percent.is_nan() {
            return Self(0);
        }
        Self(percent.round().clamp(0.0, Self::MAX as f64) as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl fmt::Display for MoistureReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything that can produce a moisture reading on demand.
pub trait MoistureSensor {
    fn read(&mut self) -> Result<MoistureReading>;
}

impl<S: MoistureSensor + ?Sized> MoistureSensor for Box<S> {
    fn read(&mut self) -> Result<MoistureReading> {
        (**self).read()
    }
}

/// Development stand-in for real hardware: every read is an independent
/// uniform sample from 0..=100.
#[derive(Debug, Default)]
pub struct UniformSensor;

impl MoistureSensor for UniformSensor {
    fn read(&mut self) -> Result<MoistureReading> {
        Ok(MoistureReading(fastrand::u8(0..=MoistureReading::MAX)))
    }
}

/// Convert a raw ADC reading to a moisture percentage using the sensor's
/// dry/wet calibration endpoints. Out-of-range readings are clamped.
pub fn percent_from_raw(raw: i64, raw_dry: i64, raw_wet: i64) -> MoistureReading {
    let range = raw_dry - raw_wet;
    if range == 0 {
        return MoistureReading(0); // degenerate calibration
    }
    let fraction = ((raw_dry - raw) as f64 / range as f64).clamp(0.0, 1.0);
    MoistureReading::clamped(fraction * 100.0)
}

// ===========================================================================
// Tests
// ===========================================================================
