//! ADS1115 16-bit ADC driver over I2C for capacitive soil moisture probes.
//!
//! Reads one single-ended channel at PGA ±4.096 V, 128 SPS, single-shot
//! mode. The default calibration (`raw_dry ≈ 26000`, `raw_wet ≈ 12000`)
//! matches typical probes powered from 3.3 V.

use anyhow::{Context, Result};
use rppal::i2c::I2c;
use std::{thread, time::Duration};

use crate::sensor::{percent_from_raw, MoistureReading, MoistureSensor};

// ── ADS1115 register addresses ──────────────────────────────────────────────

/// Conversion result register (read-only, 16-bit signed).
const REG_CONVERSION: u8 = 0x00;
/// Configuration register (read/write).
const REG_CONFIG: u8 = 0x01;

// ── Config register bit fields ──────────────────────────────────────────────
//
// Layout (MSB first):
//   [15]    OS       write 1 to start single-shot conversion
//   [14:12] MUX      input multiplexer (channel selection)
//   [11:9]  PGA      programmable gain amplifier
//   [8]     MODE     0 = continuous, 1 = single-shot
//   [7:5]   DR       data rate
//   [4:0]   comparator settings, 00011 = comparator off

/// OS=1 (start), PGA=001 (±4.096 V), MODE=1 (single-shot),
/// DR=100 (128 SPS), COMP_QUE=11 (comparator off).
const CONFIG_BASE: u16 = 0b1_000_001_1_100_0_0_0_11;

/// MUX values for single-ended reads (AINx vs GND).
const MUX_SHIFT: u8 = 12;
const MUX_SINGLE_ENDED: [u16; 4] = [0b100, 0b101, 0b110, 0b111];

pub const MAX_CHANNEL: u8 = 3;

/// Conversion time at 128 SPS is ~7.8 ms.
const CONVERSION_WAIT: Duration = Duration::from_millis(9);

/// Bit 15 of the config register: conversion-ready flag when read.
const OS_READY_BIT: u16 = 1 << 15;

fn config_for_channel(channel: u8) -> u16 {
    CONFIG_BASE | (MUX_SINGLE_ENDED[channel as usize] << MUX_SHIFT)
}

// ── Driver ──────────────────────────────────────────────────────────────────

/// Moisture sensor backed by one ADS1115 input.
pub struct Ads1115Sensor {
    i2c: I2c,
    channel: u8,
    raw_dry: i64,
    raw_wet: i64,
}

impl Ads1115Sensor {
    /// Open I2C bus 1 and address the ADS1115 at `addr`.
    pub fn new(addr: u16, channel: u8, raw_dry: i64, raw_wet: i64) -> Result<Self> {
        anyhow::ensure!(
            channel <= MAX_CHANNEL,
            "ADS1115 channel {channel} out of range (0–{MAX_CHANNEL})"
        );

        let mut i2c = I2c::new().context("failed to open I2C bus")?;
        i2c.set_slave_address(addr)
            .with_context(|| format!("failed to address ADS1115 at 0x{addr:02x}"))?;

        tracing::info!(
            addr = format_args!("0x{addr:02x}"),
            channel,
            raw_dry,
            raw_wet,
            "ads1115 initialised"
        );

        Ok(Self {
            i2c,
            channel,
            raw_dry,
            raw_wet,
        })
    }

    /// Single-shot conversion, returning the raw signed value
    /// (0–32767 for single-ended inputs).
    fn read_raw(&mut self) -> Result<i16> {
        let config = config_for_channel(self.channel);
        self.i2c.block_write(REG_CONFIG, &config.to_be_bytes())?;

        thread::sleep(CONVERSION_WAIT);

        for _ in 0..3 {
            let mut buf = [0u8; 2];
            self.i2c.block_read(REG_CONFIG, &mut buf)?;
            if u16::from_be_bytes(buf) & OS_READY_BIT != 0 {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }

        let mut buf = [0u8; 2];
        self.i2c.block_read(REG_CONVERSION, &mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }
}

impl MoistureSensor for Ads1115Sensor {
    fn read(&mut self) -> Result<MoistureReading> {
        let raw = self
            .read_raw()
            .with_context(|| format!("ads1115 read failed on AIN{}", self.channel))?;
        // Single-ended reads are non-negative; clamp against bus corruption.
        let raw = (raw as i64).clamp(0, i16::MAX as i64);
        let reading = percent_from_raw(raw, self.raw_dry, self.raw_wet);
        tracing::debug!(raw, percent = reading.percent(), "ads1115 sample");
        Ok(reading)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
