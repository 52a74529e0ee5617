//! Stateful soil moisture simulator for running the controller without
//! hardware.
//!
//! Unlike [`UniformSensor`](crate::sensor::UniformSensor), consecutive
//! readings are coherent:
//! - random walk with mean reversion toward mid-range
//! - steady drying drift (evaporation)
//! - per-reading electronic noise
//! - occasional spikes (sensor flakiness)

use anyhow::Result;
use std::fmt;

use crate::sensor::{MoistureReading, MoistureSensor};

/// Centre of the mean-reversion pull, in percent.
const CENTER: f64 = 50.0;

/// Zero-mean normal sample with standard deviation `sigma`. Irwin-Hall: the
/// sum of 12 uniforms has variance 1, so subtracting 6 centres it.
fn gaussian(sigma: f64) -> f64 {
    let sum: f64 = (0..12).map(|_| fastrand::f64()).sum();
    sigma * (sum - 6.0)
}

// ---------------------------------------------------------------------------
// Scenario presets
// ---------------------------------------------------------------------------

/// Simulation profiles selectable via `sensor.scenario`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Starts mid-range and dries steadily. Repeatedly crosses the default
    /// threshold, so irrigation triggers regularly.
    Drying,
    /// Hovers near the centre with low noise and rare spikes.
    Stable,
    /// Starts near saturation and dries very slowly.
    Wet,
    /// High noise and frequent large spikes.
    Flaky,
}

impl Scenario {
    /// Unrecognised names fall back to `Drying`.
    pub fn from_str_lossy(name: &str) -> Self {
        [Self::Stable, Self::Wet, Self::Flaky]
            .into_iter()
            .find(|s| name.trim().eq_ignore_ascii_case(&s.to_string()))
            .unwrap_or(Self::Drying)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Drying => "drying",
            Self::Stable => "stable",
            Self::Wet => "wet",
            Self::Flaky => "flaky",
        })
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

pub struct SoilMoistureSim {
    /// Current "true" moisture in percent. Evolves on every read.
    base: f64,

    drift_per_sample: f64,
    walk_sigma: f64,
    mean_reversion: f64,
    noise_sigma: f64,

    spike_prob: f32,
    spike_sigma: f64,
}

impl SoilMoistureSim {
    pub fn new(scenario: Scenario) -> Self {
        // drift is negative: toward dry
        let (drift, walk_sigma, mean_rev, noise_sigma, spike_prob, spike_sigma, start) =
            match scenario {
                Scenario::Drying => (-1.0, 1.0, 0.02, 0.6, 0.03_f32, 15.0, 50.0),
                Scenario::Stable => (-0.1, 0.4, 0.05, 0.3, 0.005, 7.0, 50.0),
                Scenario::Wet => (-0.2, 0.6, 0.02, 0.4, 0.02, 10.0, 80.0),
                Scenario::Flaky => (-0.7, 1.8, 0.02, 1.5, 0.10, 20.0, 50.0),
            };

        Self {
            base: (start + gaussian(2.0)).clamp(0.0, 100.0),
            drift_per_sample: drift,
            walk_sigma,
            mean_reversion: mean_rev,
            noise_sigma,
            spike_prob,
            spike_sigma,
        }
    }

    /// Advance the model one step and return the instantaneous reading.
    pub fn sample(&mut self) -> MoistureReading {
        let pull = self.mean_reversion * (CENTER - self.base);
        let walk = gaussian(self.walk_sigma);

        self.base = (self.base + self.drift_per_sample + pull + walk).clamp(0.0, 100.0);

        let noise = gaussian(self.noise_sigma);
        let spike = if fastrand::f32() < self.spike_prob {
            gaussian(self.spike_sigma)
        } else {
            0.0
        };

        MoistureReading::clamped(self.base + noise + spike)
    }
}

impl MoistureSensor for SoilMoistureSim {
    fn read(&mut self) -> Result<MoistureReading> {
        Ok(self.sample())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_samples(sim: &mut SoilMoistureSim, n: usize) -> Vec<i32> {
        (0..n).map(|_| sim.sample().percent() as i32).collect()
    }

    #[test]
    fn readings_within_percent_range() {
        for scenario in [
            Scenario::Drying,
            Scenario::Stable,
            Scenario::Wet,
            Scenario::Flaky,
        ] {
            let mut sim = SoilMoistureSim::new(scenario);
            for _ in 0..500 {
                let v = sim.read().unwrap().percent();
                assert!(v <= 100, "{scenario}: out of range {v}");
            }
        }
    }

    #[test]
    fn temporal_coherence() {
        // Consecutive readings should be much closer than the full range.
        let mut sim = SoilMoistureSim::new(Scenario::Stable);
        let samples = collect_samples(&mut sim, 100);
        let max_jump: i32 = samples
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .max()
            .unwrap();
        assert!(max_jump < 40, "max consecutive jump too large: {max_jump}");
    }

    #[test]
    fn drying_trends_downward() {
        let mut sim = SoilMoistureSim::new(Scenario::Drying);
        let early: f64 = collect_samples(&mut sim, 10).iter().sum::<i32>() as f64 / 10.0;
        for _ in 0..100 {
            sim.sample();
        }
        let late: f64 = collect_samples(&mut sim, 10).iter().sum::<i32>() as f64 / 10.0;
        assert!(late < early, "expected drying: early={early:.1} late={late:.1}");
    }

    #[test]
    fn flaky_scenario_has_more_variation() {
        fn variance(sim: &mut SoilMoistureSim, n: usize) -> f64 {
            let samples = collect_samples(sim, n);
            let mean = samples.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
            samples
                .iter()
                .map(|&v| (v as f64 - mean).powi(2))
                .sum::<f64>()
                / n as f64
        }

        let mut stable = SoilMoistureSim::new(Scenario::Stable);
        let mut flaky = SoilMoistureSim::new(Scenario::Flaky);

        let var_stable = variance(&mut stable, 200);
        let var_flaky = variance(&mut flaky, 200);

        assert!(
            var_flaky > var_stable,
            "flaky variance ({var_flaky:.1}) should exceed stable ({var_stable:.1})"
        );
    }

    #[test]
    fn wet_scenario_starts_high() {
        let mut sim = SoilMoistureSim::new(Scenario::Wet);
        let avg: f64 = collect_samples(&mut sim, 10).iter().sum::<i32>() as f64 / 10.0;
        assert!(avg > CENTER, "wet scenario should start above centre: avg={avg:.1}");
    }

    #[test]
    fn scenario_from_str_lossy() {
        assert_eq!(Scenario::from_str_lossy("drying"), Scenario::Drying);
        assert_eq!(Scenario::from_str_lossy("STABLE"), Scenario::Stable);
        assert_eq!(Scenario::from_str_lossy("Wet"), Scenario::Wet);
        assert_eq!(Scenario::from_str_lossy("flaky"), Scenario::Flaky);
        assert_eq!(Scenario::from_str_lossy("unknown"), Scenario::Drying);
        assert_eq!(Scenario::from_str_lossy(""), Scenario::Drying);
    }

    #[test]
    fn scenario_display_round_trips() {
        for s in [
            Scenario::Drying,
            Scenario::Stable,
            Scenario::Wet,
            Scenario::Flaky,
        ] {
            assert_eq!(Scenario::from_str_lossy(&s.to_string()), s);
        }
    }

    #[test]
    fn gaussian_is_centred_and_scaled() {
        let n = 5000;
        let samples: Vec<f64> = (0..n).map(|_| gaussian(2.0)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.2, "mean should be near zero: {mean}");
        assert!((var.sqrt() - 2.0).abs() < 0.2, "sigma should be near 2: {}", var.sqrt());
    }
}
