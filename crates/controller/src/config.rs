//! TOML config file loading, environment overrides, and validation.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::decision::DEFAULT_MOISTURE_THRESHOLD;

const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

// ---------------------------------------------------------------------------
// Config file structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub weather: WeatherConfig,
    pub control: ControlConfig,
    pub error_log: ErrorLogConfig,
    pub sensor: SensorConfig,
    pub relay: RelayConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    pub endpoint: String,
    pub api_key: String,
    pub location: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    pub moisture_threshold: u8,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ErrorLogConfig {
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Uniform random stub.
    Random,
    /// Stateful drying simulator.
    Sim,
    /// ADS1115 over I2C (requires the `adc` feature).
    Adc,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    pub kind: SensorKind,
    pub scenario: String,
    pub i2c_addr: u16,
    pub channel: u8,
    pub raw_dry: i64,
    pub raw_wet: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    pub gpio_pin: u8,
    pub active_low: bool,
    pub pulse_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebConfig {
    /// Status endpoint port; `None` disables the endpoint.
    pub port: Option<u16>,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            location: String::new(),
            timeout_secs: 10,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            moisture_threshold: DEFAULT_MOISTURE_THRESHOLD,
            interval_secs: 3600,
        }
    }
}

impl Default for ErrorLogConfig {
    fn default() -> Self {
        Self {
            path: "error.log".to_string(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: SensorKind::Random,
            scenario: "drying".to_string(),
            i2c_addr: 0x48,
            channel: 0,
            raw_dry: 26000,
            raw_wet: 12000,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            gpio_pin: 17,
            active_low: true,
            pulse_secs: 60,
        }
    }
}

impl ControlConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RelayConfig {
    pub fn pulse(&self) -> Duration {
        Duration::from_secs(self.pulse_secs)
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// BCM GPIO pins available on the Raspberry Pi 40-pin header for general
/// use. GPIO 0-1 are reserved for the ID EEPROM and must never be used.
const VALID_GPIO_PINS: std::ops::RangeInclusive<u8> = 2..=27;

/// Maximum single-ended reading from the ADS1115 (15-bit unsigned).
const ADS1115_MAX: i64 = 32767;

/// ADS1115 single-ended inputs AIN0..AIN3.
const ADS1115_MAX_CHANNEL: u8 = 3;

// ---------------------------------------------------------------------------
// Environment overrides
// ---------------------------------------------------------------------------

impl Config {
    /// Overlay values from environment variables. `lookup` is
    /// `std::env::var(..).ok()` in production.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        fn parsed<T: std::str::FromStr>(name: &str, value: String) -> Result<T>
        where
            T::Err: std::fmt::Display,
        {
            value
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid {name}={value:?}: {e}"))
        }

        if let Some(v) = lookup("WEATHER_ENDPOINT") {
            self.weather.endpoint = v;
        }
        if let Some(v) = lookup("WEATHER_API_KEY") {
            self.weather.api_key = v;
        }
        if let Some(v) = lookup("WEATHER_LOCATION") {
            self.weather.location = v;
        }
        if let Some(v) = lookup("MOISTURE_THRESHOLD") {
            self.control.moisture_threshold = parsed("MOISTURE_THRESHOLD", v)?;
        }
        if let Some(v) = lookup("CHECK_INTERVAL_SECS") {
            self.control.interval_secs = parsed("CHECK_INTERVAL_SECS", v)?;
        }
        if let Some(v) = lookup("ERROR_LOG_PATH") {
            self.error_log.path = v;
        }
        if let Some(v) = lookup("SENSOR_KIND") {
            self.sensor.kind = match v.trim().to_ascii_lowercase().as_str() {
                "random" => SensorKind::Random,
                "sim" => SensorKind::Sim,
                "adc" => SensorKind::Adc,
                other => bail!("invalid SENSOR_KIND={other:?} (use random, sim or adc)"),
            };
        }
        if let Some(v) = lookup("RELAY_ACTIVE_LOW") {
            self.relay.active_low = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = lookup("WEB_PORT") {
            self.web.port = Some(parsed("WEB_PORT", v)?);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Validate all settings. Returns `Ok(())` or an error describing every
    /// violation found (not just the first one).
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_weather(&mut errors);
        self.validate_control(&mut errors);
        self.validate_sensor(&mut errors);
        self.validate_relay(&mut errors);

        if self.error_log.path.trim().is_empty() {
            errors.push("error_log.path is empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }

    fn validate_weather(&self, errors: &mut Vec<String>) {
        let w = &self.weather;
        if !(w.endpoint.starts_with("http://") || w.endpoint.starts_with("https://")) {
            errors.push(format!(
                "weather.endpoint {:?} must be an http(s) URL",
                w.endpoint
            ));
        }
        if w.api_key.trim().is_empty() {
            errors.push("weather.api_key is empty (set WEATHER_API_KEY)".to_string());
        }
        if w.location.trim().is_empty() {
            errors.push("weather.location is empty (set WEATHER_LOCATION)".to_string());
        }
        if w.timeout_secs == 0 {
            errors.push("weather.timeout_secs must be positive".to_string());
        }
    }

    fn validate_control(&self, errors: &mut Vec<String>) {
        let c = &self.control;
        if c.moisture_threshold > 100 {
            errors.push(format!(
                "control.moisture_threshold {} out of range [0, 100]",
                c.moisture_threshold
            ));
        }
        if c.interval_secs == 0 {
            errors.push("control.interval_secs must be positive".to_string());
        }
    }

    fn validate_sensor(&self, errors: &mut Vec<String>) {
        let s = &self.sensor;
        if s.kind != SensorKind::Adc {
            return;
        }
        if !cfg!(feature = "adc") {
            errors.push(
                "sensor.kind = \"adc\" requires building with the `adc` feature".to_string(),
            );
        }
        if s.channel > ADS1115_MAX_CHANNEL {
            errors.push(format!(
                "sensor.channel {} out of ADS1115 range [0, {ADS1115_MAX_CHANNEL}]",
                s.channel
            ));
        }
        if !(0..=ADS1115_MAX).contains(&s.raw_dry) {
            errors.push(format!(
                "sensor.raw_dry {} out of ADS1115 range [0, {ADS1115_MAX}]",
                s.raw_dry
            ));
        }
        if !(0..=ADS1115_MAX).contains(&s.raw_wet) {
            errors.push(format!(
                "sensor.raw_wet {} out of ADS1115 range [0, {ADS1115_MAX}]",
                s.raw_wet
            ));
        }
        if s.raw_dry == s.raw_wet {
            errors.push(format!(
                "sensor.raw_dry and sensor.raw_wet are both {}, calibration range is zero",
                s.raw_dry
            ));
        }
    }

    fn validate_relay(&self, errors: &mut Vec<String>) {
        let r = &self.relay;
        if !VALID_GPIO_PINS.contains(&r.gpio_pin) {
            errors.push(format!(
                "relay.gpio_pin {} is not a valid BCM GPIO pin (allowed: 2-27)",
                r.gpio_pin
            ));
        }
        if r.pulse_secs == 0 {
            errors.push("relay.pulse_secs must be positive".to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read and parse a TOML config file. A missing file yields the defaults
/// unless `required` is set.
pub fn read_file(path: &Path, required: bool) -> Result<Config> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read config: {}", path.display()))
        }
    };
    toml::from_str(&contents).with_context(|| format!("failed to parse config: {}", path.display()))
}

/// Build the runtime configuration: file (from `CONFIG_PATH`, default
/// `config.toml`), then environment overrides, then validation.
pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let (path, required) = match lookup("CONFIG_PATH") {
        Some(p) => (p, true),
        None => ("config.toml".to_string(), false),
    };

    let mut config = read_file(Path::new(&path), required)?;
    config
        .apply_env(&lookup)
        .context("invalid environment override")?;
    config
        .validate()
        .with_context(|| format!("invalid config: {path}"))?;

    tracing::info!(
        location = %config.weather.location,
        threshold = config.control.moisture_threshold,
        interval_secs = config.control.interval_secs,
        sensor = ?config.sensor.kind,
        "config loaded"
    );
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================
