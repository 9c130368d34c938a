// src/aggregate/transform.rs
use chrono::Utc;
use serde::Serialize;

use crate::aggregate::summary::{RawSourceResult, RunSummary};
use crate::error::{Error, Result};
use crate::record::AggregatedRecord;

/// Map a run summary into the record that gets persisted. Pure; no I/O.
///
/// Requires weather and osint stages to be `Success`; anything else is a
/// sequencing bug in the caller and yields `MissingRequiredSource`.
pub fn transform(summary: &RunSummary) -> Result<AggregatedRecord> {
    let weather = summary
        .sources
        .weather
        .payload()
        .ok_or(Error::MissingRequiredSource("weather"))?;
    let osint = summary
        .sources
        .osint
        .payload()
        .ok_or(Error::MissingRequiredSource("osint"))?;

    let (sentiment_summary, news_summary, raw_gemini_response) = match &summary.sources.gemini {
        RawSourceResult::Success { payload, .. } => (
            payload.sentiment_summary.clone(),
            payload.news_summary.clone(),
            Some(to_json(payload)),
        ),
        _ => (String::new(), String::new(), None),
    };

    Ok(AggregatedRecord {
        aggregation_timestamp_utc: Utc::now(),
        city_name: weather.city.clone(),
        current_temperature_c: weather.temperature_c,
        brand_name: osint.brand_name.clone(),
        sentiment_summary,
        news_summary,
        popularity_score: None,
        raw_weather_response: to_json(weather),
        raw_osint_response: to_json(osint),
        raw_gemini_response,
    })
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}
