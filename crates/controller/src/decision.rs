//! The irrigation decision rule: irrigate when the soil is dry unless rain
//! is already falling or imminent.

use serde::Serialize;

use crate::sensor::MoistureReading;

/// Readings at or above this percentage count as wet enough.
pub const DEFAULT_MOISTURE_THRESHOLD: u8 = 30;

/// Condition labels that suppress irrigation (compared case-insensitively).
const RAIN_CONDITIONS: &[&str] = &["rain", "drizzle"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Irrigate,
    /// Moisture at or above the threshold.
    SoilMoist,
    /// Soil is dry but the weather will take care of it.
    RainExpected,
}

impl Decision {
    pub fn should_irrigate(self) -> bool {
        matches!(self, Self::Irrigate)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine {
    threshold: u8,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MOISTURE_THRESHOLD)
    }
}

impl DecisionEngine {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Classify one cycle's inputs.
    ///
    /// `temperature_c` is accepted but currently has no influence on the
    /// outcome.
    pub fn evaluate(
        &self,
        moisture: MoistureReading,
        condition: &str,
        temperature_c: f64,
    ) -> Decision {
        let _ = temperature_c;

        if moisture.percent() >= self.threshold {
            Decision::SoilMoist
        } else if RAIN_CONDITIONS
            .iter()
            .any(|c| condition.eq_ignore_ascii_case(c))
        {
            Decision::RainExpected
        } else {
            Decision::Irrigate
        }
    }

    pub fn decide(&self, moisture: MoistureReading, condition: &str, temperature_c: f64) -> bool {
        self.evaluate(moisture, condition, temperature_c)
            .should_irrigate()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn m(percent: u8) -> MoistureReading {
        MoistureReading::new(percent).unwrap()
    }

    const CONDITIONS: &[&str] = &[
        "Clear", "Clouds", "Rain", "rain", "RAIN", "Drizzle", "drizzle", "Snow",
        "Thunderstorm", "Mist", "",
    ];

    #[test]
    fn at_or_above_threshold_never_irrigates() {
        let engine = DecisionEngine::default();
        for pct in 30..=100 {
            for c in CONDITIONS {
                assert!(!engine.decide(m(pct), c, 25.0), "m={pct} c={c:?}");
                assert_eq!(engine.evaluate(m(pct), c, 25.0), Decision::SoilMoist);
            }
        }
    }

    #[test]
    fn dry_with_rain_or_drizzle_skips() {
        let engine = DecisionEngine::default();
        for pct in 0..30 {
            for c in ["rain", "Rain", "RAIN", "drizzle", "Drizzle", "DrIzZlE"] {
                assert!(!engine.decide(m(pct), c, 18.0), "m={pct} c={c:?}");
                assert_eq!(engine.evaluate(m(pct), c, 18.0), Decision::RainExpected);
            }
        }
    }

    #[test]
    fn dry_with_other_conditions_irrigates() {
        let engine = DecisionEngine::default();
        for pct in 0..30 {
            for c in ["Clear", "Clouds", "Snow", "Thunderstorm", "Mist", "", "light rain", " Rain"] {
                assert!(engine.decide(m(pct), c, 25.0), "m={pct} c={c:?}");
            }
        }
    }

    #[test]
    fn threshold_boundary() {
        let engine = DecisionEngine::default();
        assert!(engine.decide(m(29), "Clear", 25.0));
        assert!(!engine.decide(m(30), "Clear", 25.0));
    }

    #[test]
    fn temperature_does_not_change_outcome() {
        let engine = DecisionEngine::default();
        for temp in [-40.0, 0.0, 18.0, 45.0, f64::NAN] {
            assert!(engine.decide(m(20), "Clear", temp));
            assert!(!engine.decide(m(45), "Clear", temp));
            assert!(!engine.decide(m(10), "Rain", temp));
        }
    }

    #[test]
    fn identical_inputs_identical_output() {
        let engine = DecisionEngine::default();
        let first = engine.evaluate(m(12), "Clouds", 21.5);
        for _ in 0..100 {
            assert_eq!(engine.evaluate(m(12), "Clouds", 21.5), first);
        }
    }

    #[test]
    fn custom_threshold() {
        let engine = DecisionEngine::new(50);
        assert_eq!(engine.threshold(), 50);
        assert!(engine.decide(m(45), "Clear", 25.0));
        assert!(!engine.decide(m(50), "Clear", 25.0));
    }

    #[test]
    fn zero_threshold_never_irrigates() {
        let engine = DecisionEngine::new(0);
        assert!(!engine.decide(m(0), "Clear", 25.0));
    }

    // -- Reference scenarios ------------------------------------------------

    #[test]
    fn scenario_dry_and_clear_irrigates() {
        assert!(DecisionEngine::default().decide(m(20), "Clear", 25.0));
    }

    #[test]
    fn scenario_wet_and_clear_skips() {
        assert!(!DecisionEngine::default().decide(m(45), "Clear", 25.0));
    }

    #[test]
    fn scenario_dry_and_raining_skips() {
        assert!(!DecisionEngine::default().decide(m(10), "Rain", 18.0));
    }
}
