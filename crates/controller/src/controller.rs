//! The irrigation control loop.
//!
//! ## Cycle state machine
//!
//! ```text
//! Sampling ──▶ Deciding ──▶ Acting ──▶ Sleeping ──┐
//!    │  ▲                                ▲        │
//!    │  └────────────────────────────────┼────────┘
//!    └──[weather unavailable / error]────┘
//! ```
//!
//! A cycle never inherits anything from the one before it. Every failure is
//! written to the error log once and the loop carries on; only a shutdown
//! signal ends it.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::decision::{Decision, DecisionEngine};
use crate::error_log::ErrorLog;
use crate::relay::Actuator;
use crate::sensor::{MoistureReading, MoistureSensor};
use crate::status::{CycleReport, SharedStatus};
use crate::weather::{WeatherObservation, WeatherSource};

/// How a single cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum CycleOutcome {
    Irrigated,
    NotRequired(Decision),
    /// Weather fetch failed; decision and action were skipped.
    WeatherUnavailable,
    /// Sensor, actuator or other unexpected failure.
    Failed,
}

/// Everything one cycle learned before it ended.
#[derive(Default)]
struct Sample {
    moisture: Option<MoistureReading>,
    weather: Option<WeatherObservation>,
}

pub struct ControlLoop<S, W, A, C> {
    sensor: S,
    weather: W,
    actuator: A,
    clock: C,
    engine: DecisionEngine,
    error_log: ErrorLog,
    location: String,
    interval: Duration,
    status: SharedStatus,
}

impl<S, W, A, C> ControlLoop<S, W, A, C>
where
    S: MoistureSensor,
    W: WeatherSource,
    A: Actuator,
    C: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sensor: S,
        weather: W,
        actuator: A,
        clock: C,
        engine: DecisionEngine,
        error_log: ErrorLog,
        location: String,
        interval: Duration,
        status: SharedStatus,
    ) -> Self {
        Self {
            sensor,
            weather,
            actuator,
            clock,
            engine,
            error_log,
            location,
            interval,
            status,
        }
    }

    /// Run cycles until `shutdown` flips to `true` (or its sender is
    /// dropped). A shutdown during the sleep ends the loop immediately.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            location = %self.location,
            threshold = self.engine.threshold(),
            interval_secs = self.interval.as_secs(),
            "control loop started"
        );
        self.status
            .write()
            .await
            .record_system("control loop started".to_string());

        while !*shutdown.borrow() {
            self.run_cycle().await;

            tokio::select! {
                _ = self.clock.sleep(self.interval) => {}
                res = shutdown.changed() => {
                    if res.is_err() {
                        break; // sender dropped, treated as shutdown
                    }
                }
            }
        }

        info!("control loop stopped");
        self.status
            .write()
            .await
            .record_system("control loop stopped".to_string());
    }

    /// One full Sampling → Deciding → Acting pass. Never fails: every error
    /// is logged and folded into the outcome.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let mut sample = Sample::default();

        let outcome = match self.try_cycle(&mut sample).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("unexpected error during cycle: {e:#}");
                self.log_failure(&format!("Unexpected error: {e:#}")).await;
                println!("An unexpected error occurred, check the error log for details.");
                CycleOutcome::Failed
            }
        };

        self.status.write().await.record_cycle(CycleReport {
            at: self.clock.now(),
            moisture: sample.moisture,
            weather: sample.weather,
            outcome,
        });

        outcome
    }

    async fn try_cycle(&mut self, sample: &mut Sample) -> Result<CycleOutcome> {
        // ── Sampling ────────────────────────────────────────────────
        let moisture = self
            .sensor
            .read()
            .context("soil moisture read failed")?;
        sample.moisture = Some(moisture);

        let observation = match self.weather.fetch(&self.location).await {
            Ok(obs) => obs,
            Err(e) => {
                // `{:#}` on anyhow walks the source chain down to the OS error.
                let e = anyhow::Error::from(e);
                warn!(location = %self.location, "weather fetch failed: {e:#}");
                self.log_failure(&format!("Weather API request failed: {e:#}"))
                    .await;
                println!("Skipping this cycle due to weather data retrieval failure.");
                return Ok(CycleOutcome::WeatherUnavailable);
            }
        };

        println!("{}", reading_line(moisture, &observation));

        // ── Deciding ────────────────────────────────────────────────
        let irrigate = self.engine.decide(
            moisture,
            &observation.condition,
            observation.temperature_c,
        );
        info!(
            moisture = moisture.percent(),
            condition = %observation.condition,
            temperature_c = observation.temperature_c,
            irrigate,
            "cycle evaluated"
        );

        // ── Acting ──────────────────────────────────────────────────
        if irrigate {
            sample.weather = Some(observation);
            self.actuator
                .activate()
                .await
                .context("irrigation activation failed")?;
            Ok(CycleOutcome::Irrigated)
        } else {
            let decision = self.engine.evaluate(
                moisture,
                &observation.condition,
                observation.temperature_c,
            );
            sample.weather = Some(observation);
            println!("Irrigation not required.");
            Ok(CycleOutcome::NotRequired(decision))
        }
    }

    /// Persist a failure. A failing error log is reported through tracing
    /// and otherwise ignored.
    async fn log_failure(&self, message: &str) {
        if let Err(e) = self.error_log.append(self.clock.now(), message) {
            warn!(
                path = %self.error_log.path().display(),
                "could not write error log: {e}"
            );
        }
        self.status.write().await.record_error(message.to_string());
    }
}

/// Console summary of one cycle's inputs.
fn reading_line(moisture: MoistureReading, observation: &WeatherObservation) -> String {
    format!(
        "Soil moisture: {moisture}% | Weather: {} | Temp: {:.1}°C",
        observation.condition, observation.temperature_c
    )
}

// ===========================================================================
// Tests
// ===========================================================================
