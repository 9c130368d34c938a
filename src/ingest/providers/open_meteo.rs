// src/ingest/providers/open_meteo.rs
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::config::{HttpConfig, TargetConfig};
use crate::error::{Error, Result};
use crate::ingest::types::{WeatherReading, WeatherSource};
use crate::ingest::{build_http_client, map_http_error};

pub const OPEN_METEO_API_URL: &str = "https://api.open-meteo.com/v1/forecast";
const SOURCE: &str = "weather";

#[derive(Debug, Deserialize)]
struct Forecast {
    current: Option<Current>,
}

#[derive(Debug, Deserialize)]
struct Current {
    temperature_2m: Option<f64>,
    weather_code: Option<i64>,
}

/// WMO weather interpretation codes as documented by Open-Meteo.
pub fn describe_weather_code(code: i64) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 | 63 | 65 => "Rain",
        66 | 67 => "Freezing rain",
        71 | 73 | 75 => "Snow fall",
        77 => "Snow grains",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}

pub struct OpenMeteoProvider {
    city: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        latitude: f64,
        longitude: f64,
        timeout_secs: u64,
        client: reqwest::Client,
    },
}

impl OpenMeteoProvider {
    /// Parse a canned forecast body instead of calling the API.
    pub fn from_fixture(city: impl Into<String>, body: &str) -> Self {
        Self {
            city: city.into(),
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_config(target: &TargetConfig, http: &HttpConfig) -> Result<Self> {
        Self::with_url(OPEN_METEO_API_URL, target, http)
    }

    pub fn with_url(url: &str, target: &TargetConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            city: target.city.clone(),
            mode: Mode::Http {
                url: url.to_string(),
                latitude: target.latitude,
                longitude: target.longitude,
                timeout_secs: http.timeout_secs,
                client: build_http_client(http)?,
            },
        })
    }

    fn parse_reading(city: &str, body: &str) -> Result<WeatherReading> {
        let forecast: Forecast =
            serde_json::from_str(body).map_err(|e| Error::fetch(SOURCE, format!("parse: {e}")))?;
        let current = forecast
            .current
            .ok_or_else(|| Error::fetch(SOURCE, "response has no `current` block"))?;
        let temperature_c = current
            .temperature_2m
            .ok_or_else(|| Error::fetch(SOURCE, "response has no current temperature"))?;

        let description = current
            .weather_code
            .map(describe_weather_code)
            .unwrap_or("Unknown")
            .to_string();

        Ok(WeatherReading {
            source: "open-meteo".to_string(),
            city: city.to_string(),
            timestamp: Utc::now(),
            temperature_c,
            weather_code: current.weather_code,
            description,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoProvider {
    async fn fetch(&self) -> Result<WeatherReading> {
        tracing::info!(target: "ingest", city = %self.city, "fetching weather");

        let reading = match &self.mode {
            Mode::Fixture(body) => Self::parse_reading(&self.city, body)?,
            Mode::Http {
                url,
                latitude,
                longitude,
                timeout_secs,
                client,
            } => {
                let resp = client
                    .get(url)
                    .query(&[
                        ("latitude", latitude.to_string()),
                        ("longitude", longitude.to_string()),
                        ("current", "temperature_2m,weather_code".to_string()),
                        ("timezone", "auto".to_string()),
                    ])
                    .send()
                    .await
                    .map_err(|e| map_http_error(SOURCE, *timeout_secs, e))?;
                let resp = resp
                    .error_for_status()
                    .map_err(|e| Error::fetch(SOURCE, e))?;
                let body = resp
                    .text()
                    .await
                    .map_err(|e| map_http_error(SOURCE, *timeout_secs, e))?;
                Self::parse_reading(&self.city, &body)?
            }
        };

        tracing::info!(
            target: "ingest",
            city = %reading.city,
            temperature_c = reading.temperature_c,
            "weather fetched"
        );
        Ok(reading)
    }

    fn name(&self) -> &'static str {
        "open-meteo"
    }
}
