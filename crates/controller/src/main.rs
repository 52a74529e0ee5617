#[cfg(feature = "adc")]
mod adc;
mod clock;
mod config;
mod controller;
mod decision;
mod error_log;
mod logging;
mod relay;
mod sensor;
mod sim;
mod status;
mod weather;
mod web;

use anyhow::{Context, Result};
use std::env;
use std::future::Future;
use tokio::sync::watch;

use clock::SystemClock;
use config::{Config, SensorKind};
use controller::ControlLoop;
use decision::DecisionEngine;
use error_log::ErrorLog;
use logging::LogFormat;
use relay::Relay;
use sensor::{MoistureSensor, UniformSensor};
use sim::{Scenario, SoilMoistureSim};
use status::ControllerStatus;
use weather::OpenWeatherClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ── Logging ─────────────────────────────────────────────────────
    logging::init(LogFormat::from_env_value(
        env::var("LOG_FORMAT").ok().as_deref(),
    ))?;

    // ── Config (file, then env overrides, then validation) ──────────
    let cfg = config::load(|name| env::var(name).ok())?;

    // ── Collaborators ───────────────────────────────────────────────
    let sensor = build_sensor(&cfg)?;
    let weather = OpenWeatherClient::new(
        &cfg.weather.endpoint,
        &cfg.weather.api_key,
        cfg.weather.timeout(),
    )
    .context("failed to build weather client")?;
    let relay = Relay::new(
        cfg.relay.gpio_pin,
        cfg.relay.active_low,
        cfg.relay.pulse(),
    )?;
    let error_log = ErrorLog::new(&cfg.error_log.path);

    // ── Shared status (ephemeral, for the status endpoint) ──────────
    let status = ControllerStatus::new(
        &cfg.weather.location,
        cfg.control.moisture_threshold,
        cfg.control.interval_secs,
    )
    .shared();

    // ── Shutdown signal ─────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    // ── Web server (optional) ───────────────────────────────────────
    let web_task = cfg.web.port.map(|port| {
        let web_status = status.clone();
        let web_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = web::serve(web_status, port, web_shutdown).await {
                tracing::error!("status endpoint stopped: {e:#}");
            }
        })
    });

    // ── Control loop ────────────────────────────────────────────────
    let mut control = ControlLoop::new(
        sensor,
        weather,
        relay,
        SystemClock,
        DecisionEngine::new(cfg.control.moisture_threshold),
        error_log,
        cfg.weather.location.clone(),
        cfg.control.interval(),
        status,
    );
    control.run(shutdown_rx).await;

    if let Some(task) = web_task {
        let _ = task.await;
    }
    Ok(())
}

fn build_sensor(cfg: &Config) -> Result<Box<dyn MoistureSensor>> {
    let s = &cfg.sensor;
    match s.kind {
        SensorKind::Random => Ok(Box::new(UniformSensor)),
        SensorKind::Sim => {
            let scenario = Scenario::from_str_lossy(&s.scenario);
            tracing::info!(%scenario, "using simulated soil moisture sensor");
            Ok(Box::new(SoilMoistureSim::new(scenario)))
        }
        #[cfg(feature = "adc")]
        SensorKind::Adc => Ok(Box::new(adc::Ads1115Sensor::new(
            s.i2c_addr,
            s.channel,
            s.raw_dry,
            s.raw_wet,
        )?)),
        #[cfg(not(feature = "adc"))]
        SensorKind::Adc => anyhow::bail!("sensor.kind = \"adc\" requires the `adc` feature"),
    }
}

/// Resolve on SIGINT or SIGTERM. A handler that cannot be installed is
/// logged and never fires.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!("SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = interrupt() => {}
        _ = terminate => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    interrupt().await;
}

async fn interrupt() {
    signal_or_park("SIGINT", tokio::signal::ctrl_c()).await;
}

/// Wait for `signal`; if it could not be registered, log and never return.
async fn signal_or_park(name: &str, signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        tracing::error!("{name} handler unavailable: {e}");
        std::future::pending::<()>().await;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(kind: SensorKind) -> Config {
        let mut cfg = Config::default();
        cfg.sensor.kind = kind;
        cfg
    }

    #[test]
    fn random_kind_builds_uniform_sensor() {
        let mut sensor = build_sensor(&config_with(SensorKind::Random)).unwrap();
        for _ in 0..50 {
            assert!(sensor.read().unwrap().percent() <= 100);
        }
    }

    #[test]
    fn sim_kind_builds_simulator() {
        let mut cfg = config_with(SensorKind::Sim);
        cfg.sensor.scenario = "wet".into();
        let mut sensor = build_sensor(&cfg).unwrap();
        let avg: f64 = (0..10)
            .map(|_| sensor.read().unwrap().percent() as f64)
            .sum::<f64>()
            / 10.0;
        assert!(avg > 50.0, "wet scenario should read high: avg={avg:.1}");
    }

    #[test]
    fn sim_kind_with_unknown_scenario_still_builds() {
        let mut cfg = config_with(SensorKind::Sim);
        cfg.sensor.scenario = "monsoon".into();
        assert!(build_sensor(&cfg).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_signal_registration_never_requests_shutdown() {
        let broken = async { Err(std::io::Error::other("no signal handler")) };
        let waited = tokio::time::timeout(
            std::time::Duration::from_secs(24 * 3600),
            signal_or_park("SIGINT", broken),
        )
        .await;
        assert!(waited.is_err(), "a failed registration must not resolve");
    }

    #[tokio::test]
    async fn delivered_signal_resolves() {
        signal_or_park("SIGINT", async { Ok(()) }).await;
    }

    #[cfg(not(feature = "adc"))]
    #[test]
    fn adc_kind_without_feature_fails() {
        let err = build_sensor(&config_with(SensorKind::Adc))
            .err()
            .expect("adc sensor must not build without the feature");
        assert!(format!("{err}").contains("`adc` feature"), "got: {err}");
    }
}
