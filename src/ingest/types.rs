// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One current-weather reading for the configured coordinate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherReading {
    pub source: String, // e.g. "open-meteo"
    pub city: String,
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    pub weather_code: Option<i64>, // WMO code as reported upstream
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialPost {
    pub title: String,
    pub text: String,
}

/// Recent posts matching the brand search term. Empty `posts` is a valid result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialSnapshot {
    pub brand_name: String,
    pub posts: Vec<SocialPost>,
}

#[async_trait::async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self) -> Result<WeatherReading>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
pub trait SocialSource: Send + Sync {
    async fn fetch(&self) -> Result<SocialSnapshot>;
    fn name(&self) -> &'static str;
}
