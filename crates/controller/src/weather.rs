//! Current-weather lookup against an OpenWeatherMap-compatible endpoint.
//!
//! One request per call and no retries; the control loop's fixed interval
//! is the retry policy.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Units requested from the service. Temperatures come back in °C.
const UNITS: &str = "metric";

/// What the controller needs from the weather service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherObservation {
    /// Primary condition label, e.g. "Rain", "Clear".
    pub condition: String,
    pub temperature_c: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed")]
    Request(#[source] reqwest::Error),

    #[error("weather service returned HTTP {0}")]
    Status(StatusCode),

    #[error("malformed response body")]
    Body(#[from] serde_json::Error),

    #[error("response contains no weather condition")]
    MissingCondition,
}

/// Source of current weather for a location.
pub trait WeatherSource {
    async fn fetch(&self, location: &str) -> Result<WeatherObservation, FetchError>;
}

// ---------------------------------------------------------------------------
// Response body
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    weather: Vec<Descriptor>,
    main: MainBlock,
}

#[derive(Debug, Deserialize)]
struct Descriptor {
    main: String,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
}

/// Extract the first condition label and the current temperature.
pub fn parse_observation(body: &[u8]) -> Result<WeatherObservation, FetchError> {
    let parsed: CurrentWeather = serde_json::from_slice(body)?;
    let condition = parsed
        .weather
        .into_iter()
        .next()
        .ok_or(FetchError::MissingCondition)?
        .main;
    Ok(WeatherObservation {
        condition,
        temperature_c: parsed.main.temp,
    })
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

pub struct OpenWeatherClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Request)?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl WeatherSource for OpenWeatherClient {
    async fn fetch(&self, location: &str) -> Result<WeatherObservation, FetchError> {
        // The request URL carries the API key; strip it from any error that
        // may end up in the error log.
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("q", location), ("appid", self.api_key.as_str()), ("units", UNITS)])
            .send()
            .await
            .map_err(|e| FetchError::Request(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Request(e.without_url()))?;

        let observation = parse_observation(&body)?;
        tracing::debug!(
            location,
            condition = %observation.condition,
            temperature_c = observation.temperature_c,
            "weather fetched"
        );
        Ok(observation)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
