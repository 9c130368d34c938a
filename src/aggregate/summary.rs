// src/aggregate/summary.rs
//! Per-run result types. A `RunSummary` is built once by the aggregator and
//! handed back to the caller; only the derived record is persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::ingest::types::{SocialSnapshot, WeatherReading};
use crate::record::AggregatedRecord;

/// Outcome of one stage. Serializes as `{"status": "success", "records": n}`,
/// `{"status": "error", "error": ...}` or `{"status": "skipped", "reason": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RawSourceResult<T> {
    Success {
        #[serde(skip)]
        payload: T,
        #[serde(rename = "records")]
        count: usize,
    },
    #[serde(rename = "error")]
    Failure { error: String },
    Skipped { reason: String },
}

impl<T> RawSourceResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RawSourceResult::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RawSourceResult::Failure { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RawSourceResult::Skipped { .. })
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            RawSourceResult::Success { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Item count for successful stages, zero otherwise.
    pub fn count(&self) -> usize {
        match self {
            RawSourceResult::Success { count, .. } => *count,
            _ => 0,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            RawSourceResult::Success { .. } => "success",
            RawSourceResult::Failure { .. } => "error",
            RawSourceResult::Skipped { .. } => "skipped",
        }
    }
}

/// Output of the summarization stage.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Summaries {
    pub sentiment_summary: String,
    pub news_summary: String,
}

/// The three stages of a run, keyed the way the status document reports them.
#[derive(Debug, Clone, Serialize)]
pub struct SourceResults {
    pub weather: RawSourceResult<WeatherReading>,
    pub osint: RawSourceResult<SocialSnapshot>,
    pub gemini: RawSourceResult<Summaries>,
}

impl SourceResults {
    fn statuses(&self) -> [&'static str; 3] {
        [
            self.weather.status(),
            self.osint.status(),
            self.gemini.status(),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Run start.
    pub timestamp: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: SourceResults,
    pub success_count: u32,
    pub error_count: u32,
    pub total_records: usize,
    pub duration_seconds: f64,
    pub transformed_record: Option<AggregatedRecord>,
    pub record_id: Option<i64>,
}

impl RunSummary {
    /// Fold stage results into counters. Counters are fixed here; later
    /// transform/persist failures do not change them.
    pub fn new(started_at: DateTime<Utc>, sources: SourceResults) -> Self {
        let statuses = sources.statuses();
        let success_count = statuses.iter().filter(|s| **s == "success").count() as u32;
        let error_count = statuses.iter().filter(|s| **s == "error").count() as u32;
        let total_records = sources.weather.count() + sources.osint.count() + sources.gemini.count();

        Self {
            timestamp: started_at,
            finished_at: started_at,
            sources,
            success_count,
            error_count,
            total_records,
            duration_seconds: 0.0,
            transformed_record: None,
            record_id: None,
        }
    }

    /// Weather and social signals are both required for a record.
    pub fn is_persistable(&self) -> bool {
        self.sources.weather.is_success() && self.sources.osint.is_success()
    }

    pub(crate) fn finish(mut self, elapsed: Duration) -> Self {
        self.finished_at = Utc::now();
        self.duration_seconds = elapsed.as_secs_f64();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading() -> WeatherReading {
        WeatherReading {
            source: "open-meteo".into(),
            city: "Tel Aviv Yafo".into(),
            timestamp: Utc::now(),
            temperature_c: 24.5,
            weather_code: Some(1),
            description: "Mainly clear".into(),
        }
    }

    #[test]
    fn stage_results_serialize_as_status_objects() {
        let ok: RawSourceResult<WeatherReading> = RawSourceResult::Success {
            payload: reading(),
            count: 1,
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "success", "records": 1})
        );

        let err: RawSourceResult<Summaries> = RawSourceResult::Failure {
            error: "boom".into(),
        };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"status": "error", "error": "boom"})
        );

        let skipped: RawSourceResult<Summaries> = RawSourceResult::Skipped {
            reason: "no posts".into(),
        };
        assert_eq!(
            serde_json::to_value(&skipped).unwrap(),
            json!({"status": "skipped", "reason": "no posts"})
        );
    }

    #[test]
    fn counters_ignore_skipped_stages() {
        let s = RunSummary::new(
            Utc::now(),
            SourceResults {
                weather: RawSourceResult::Success {
                    payload: reading(),
                    count: 1,
                },
                osint: RawSourceResult::Failure {
                    error: "HTTP 429".into(),
                },
                gemini: RawSourceResult::Skipped {
                    reason: "social fetch failed".into(),
                },
            },
        );
        assert_eq!(s.success_count, 1);
        assert_eq!(s.error_count, 1);
        assert_eq!(s.total_records, 1);
        assert!(!s.is_persistable());
    }
}
