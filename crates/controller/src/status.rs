use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::controller::CycleOutcome;
use crate::sensor::MoistureReading;
use crate::weather::WeatherObservation;

/// Maximum number of events retained in the ring buffer.
const MAX_EVENTS: usize = 200;

// ---------------------------------------------------------------------------
// Public type alias
// ---------------------------------------------------------------------------

pub type SharedStatus = Arc<RwLock<ControllerStatus>>;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

pub struct ControllerStatus {
    pub started_at: Instant,
    pub location: String,
    pub moisture_threshold: u8,
    pub interval_secs: u64,
    pub cycles: u64,
    pub irrigations: u64,
    pub failures: u64,
    pub last_cycle: Option<CycleReport>,
    pub events: VecDeque<StatusEvent>,
}

/// What one cycle observed and did.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub moisture: Option<MoistureReading>,
    pub weather: Option<WeatherObservation>,
    pub outcome: CycleOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub kind: EventKind,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Reading,
    Irrigation,
    Error,
    System,
}

// ---------------------------------------------------------------------------
// JSON response (what the API returns)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    pub location: String,
    pub moisture_threshold: u8,
    pub interval_secs: u64,
    pub cycles: u64,
    pub irrigations: u64,
    pub failures: u64,
    pub last_cycle: Option<CycleReport>,
    pub events: Vec<StatusEvent>,
}

// ---------------------------------------------------------------------------
// Construction & mutation
// ---------------------------------------------------------------------------

impl ControllerStatus {
    pub fn new(location: &str, moisture_threshold: u8, interval_secs: u64) -> Self {
        Self {
            started_at: Instant::now(),
            location: location.to_string(),
            moisture_threshold,
            interval_secs,
            cycles: 0,
            irrigations: 0,
            failures: 0,
            last_cycle: None,
            events: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    pub fn shared(self) -> SharedStatus {
        Arc::new(RwLock::new(self))
    }

    /// Record a completed cycle, whatever its outcome.
    pub fn record_cycle(&mut self, report: CycleReport) {
        self.cycles += 1;

        if let (Some(m), Some(w)) = (report.moisture, &report.weather) {
            self.push_event(
                EventKind::Reading,
                format!(
                    "moisture {m}% | {} | {:.1}°C",
                    w.condition, w.temperature_c
                ),
            );
        }

        match report.outcome {
            CycleOutcome::Irrigated => {
                self.irrigations += 1;
                self.push_event(EventKind::Irrigation, "irrigation activated".to_string());
            }
            CycleOutcome::WeatherUnavailable | CycleOutcome::Failed => self.failures += 1,
            CycleOutcome::NotRequired(_) => {}
        }

        self.last_cycle = Some(report);
    }

    /// Record an error event.
    pub fn record_error(&mut self, detail: String) {
        self.push_event(EventKind::Error, detail);
    }

    /// Record a generic system event.
    pub fn record_system(&mut self, detail: String) {
        self.push_event(EventKind::System, detail);
    }

    /// Build the JSON-serialisable status snapshot, newest events first.
    pub fn to_status(&self) -> StatusResponse {
        StatusResponse {
            uptime_secs: self.started_at.elapsed().as_secs(),
            location: self.location.clone(),
            moisture_threshold: self.moisture_threshold,
            interval_secs: self.interval_secs,
            cycles: self.cycles,
            irrigations: self.irrigations,
            failures: self.failures,
            last_cycle: self.last_cycle.clone(),
            events: self.events.iter().rev().cloned().collect(),
        }
    }

    fn push_event(&mut self, kind: EventKind, detail: String) {
        if self.events.len() >= MAX_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(StatusEvent {
            ts: OffsetDateTime::now_utc(),
            kind,
            detail,
        });
    }
}

// ===========================================================================
// Tests
// ===========================================================================
