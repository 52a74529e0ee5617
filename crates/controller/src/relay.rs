//! Irrigation relay. The `gpio` feature gates the real rppal driver; without
//! it, a mock relay logs activations and records its state.

use anyhow::Result;
use std::time::Duration;

#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, OutputPin};

/// Triggers one round of irrigation.
pub trait Actuator {
    async fn activate(&mut self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Real GPIO relay (requires rppal and Raspberry Pi hardware)
// ---------------------------------------------------------------------------
#[cfg(feature = "gpio")]
pub(crate) struct Relay {
    pin: OutputPin,
    active_low: bool, // many relay boards are active-low
    pulse: Duration,
}

#[cfg(feature = "gpio")]
impl Relay {
    pub(crate) fn new(gpio_pin: u8, active_low: bool, pulse: Duration) -> Result<Self> {
        let gpio = Gpio::new()?;
        let pin = gpio.get(gpio_pin)?.into_output();

        let mut relay = Self {
            pin,
            active_low,
            pulse,
        };
        // Fail-safe: ensure OFF at startup
        relay.set(false);
        tracing::info!(gpio_pin, active_low, pulse_secs = pulse.as_secs(), "relay initialised");
        Ok(relay)
    }

    fn set(&mut self, on: bool) {
        // active-low: LOW = ON, HIGH = OFF
        if on != self.active_low {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        tracing::debug!(on, "relay switched");
    }
}

#[cfg(feature = "gpio")]
impl Actuator for Relay {
    async fn activate(&mut self) -> Result<()> {
        self.set(true);
        println!("Irrigation system activated.");
        tokio::time::sleep(self.pulse).await;
        self.set(false);
        tracing::info!(pulse_secs = self.pulse.as_secs(), "irrigation pulse complete");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mock relay (no hardware)
// ---------------------------------------------------------------------------
#[cfg(not(feature = "gpio"))]
pub(crate) struct Relay {
    pub(super) on: bool,
    pub(super) activations: u64,
    pulse: Duration,
}

#[cfg(not(feature = "gpio"))]
impl Relay {
    pub(crate) fn new(gpio_pin: u8, _active_low: bool, pulse: Duration) -> Result<Self> {
        tracing::info!(
            gpio_pin,
            pulse_secs = pulse.as_secs(),
            "[mock-gpio] relay initialised (no hardware)"
        );
        Ok(Self {
            on: false,
            activations: 0,
            pulse,
        })
    }
}

#[cfg(not(feature = "gpio"))]
impl Actuator for Relay {
    async fn activate(&mut self) -> Result<()> {
        self.on = true;
        self.activations += 1;
        println!("Irrigation system activated.");
        tracing::info!(
            pulse_secs = self.pulse.as_secs(),
            "[mock-gpio] relay ON (pulse not timed)"
        );
        self.on = false;
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(all(test, not(feature = "gpio")))]
mod tests {
    use super::*;

    fn relay() -> Relay {
        Relay::new(17, true, Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn new_relay_is_off() {
        let r = relay();
        assert!(!r.on);
        assert_eq!(r.activations, 0);
    }

    #[tokio::test]
    async fn activate_counts_and_returns_off() {
        let mut r = relay();
        r.activate().await.unwrap();
        r.activate().await.unwrap();
        assert_eq!(r.activations, 2);
        assert!(!r.on, "relay must be off after a pulse");
    }
}
