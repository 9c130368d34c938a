//! record.rs: the durable snapshot written once per eligible run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One aggregated snapshot. Write-once; never updated after `RecordStore::save`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedRecord {
    pub aggregation_timestamp_utc: DateTime<Utc>,
    pub city_name: String,
    pub current_temperature_c: f64,
    pub brand_name: String,
    pub sentiment_summary: String,
    pub news_summary: String,
    /// Not computed yet; always `None`.
    pub popularity_score: Option<f64>,
    pub raw_weather_response: String,
    pub raw_osint_response: String,
    pub raw_gemini_response: Option<String>,
}

/// A record together with the identity the store assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: AggregatedRecord,
}

/// Public view of the newest record (raw payloads omitted).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestRecord {
    pub id: i64,
    pub aggregation_timestamp_utc: DateTime<Utc>,
    pub city_name: String,
    pub current_temperature_c: f64,
    pub brand_name: String,
    pub sentiment_summary: String,
    pub news_summary: String,
    pub popularity_score: Option<f64>,
}

impl From<StoredRecord> for LatestRecord {
    fn from(s: StoredRecord) -> Self {
        let r = s.record;
        Self {
            id: s.id,
            aggregation_timestamp_utc: r.aggregation_timestamp_utc,
            city_name: r.city_name,
            current_temperature_c: r.current_temperature_c,
            brand_name: r.brand_name,
            sentiment_summary: r.sentiment_summary,
            news_summary: r.news_summary,
            popularity_score: r.popularity_score,
        }
    }
}
