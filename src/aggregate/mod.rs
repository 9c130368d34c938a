// src/aggregate/mod.rs
//! Aggregation pipeline: fetch weather + social signals, summarize, transform, persist.

pub mod summary;
pub mod transform;

pub use summary::{RawSourceResult, RunSummary, SourceResults, Summaries};
pub use transform::transform;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;

use crate::analyze::{build_summarizer, render_posts, DynSummarizer, SummaryKind};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::ingest::providers::{OpenMeteoProvider, RedditSearchProvider};
use crate::ingest::types::{SocialSnapshot, SocialSource, WeatherReading, WeatherSource};
use crate::scheduler::ScheduledJob;
use crate::store::RecordStore;

pub const JOB_ID: &str = "data_aggregation_job";
pub const JOB_NAME: &str = "Aggregate weather and OSINT data";

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("aggregate_runs_total", "Aggregation runs started.");
        describe_counter!(
            "aggregate_source_errors_total",
            "Stage failures per source (weather, osint, gemini)."
        );
        describe_counter!(
            "aggregate_records_persisted_total",
            "Aggregated records written to the store."
        );
        describe_counter!(
            "aggregate_persist_errors_total",
            "Transform or store failures after an eligible run."
        );
        describe_histogram!("aggregate_run_duration_ms", "Run duration in milliseconds.");
        describe_gauge!("aggregate_last_run_ts", "Unix ts when the last run finished.");
    });
}

/// Orchestrates one aggregation run. Holds no per-run state, so the manual
/// trigger and the scheduler may call `run` concurrently.
pub struct Aggregator {
    weather: Arc<dyn WeatherSource>,
    social: Arc<dyn SocialSource>,
    summarizer: DynSummarizer,
    store: Arc<dyn RecordStore>,
    call_timeout: Duration,
}

impl Aggregator {
    pub fn new(
        weather: Arc<dyn WeatherSource>,
        social: Arc<dyn SocialSource>,
        summarizer: DynSummarizer,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            weather,
            social,
            summarizer,
            store,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Deadline applied to every adapter call and to the store write.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Wire the production adapters for the configured target.
    pub fn from_config(cfg: &AppConfig, store: Arc<dyn RecordStore>) -> Result<Self> {
        cfg.validate()?;
        let weather = OpenMeteoProvider::from_config(&cfg.target, &cfg.http)?;
        let social = RedditSearchProvider::from_config(&cfg.brand, &cfg.http)?;
        let summarizer = build_summarizer(&cfg.ai, &cfg.http)?;
        tracing::info!(
            target: "aggregate",
            city = %cfg.target.city,
            brand = %cfg.brand.name,
            weather = weather.name(),
            social = social.name(),
            ai = summarizer.provider_name(),
            "aggregator configured"
        );
        Ok(Self::new(Arc::new(weather), Arc::new(social), summarizer, store)
            .with_call_timeout(cfg.http.timeout()))
    }

    /// Execute one run. Never fails: every stage outcome, including storage
    /// errors, is reported through the returned summary.
    pub async fn run(&self) -> RunSummary {
        ensure_metrics_described();
        counter!("aggregate_runs_total").increment(1);

        let started_at = Utc::now();
        let t0 = Instant::now();
        tracing::info!(target: "aggregate", "starting data aggregation from all sources");

        let (weather, osint) = tokio::join!(self.fetch_weather(), self.fetch_social());
        let gemini = self.summarize(&osint).await;

        let mut summary = RunSummary::new(
            started_at,
            SourceResults {
                weather,
                osint,
                gemini,
            },
        );

        if summary.is_persistable() {
            self.persist(&mut summary).await;
        } else {
            tracing::warn!(
                target: "aggregate",
                weather = summary.sources.weather.status(),
                osint = summary.sources.osint.status(),
                "required sources missing, no record written"
            );
        }

        let summary = summary.finish(t0.elapsed());
        histogram!("aggregate_run_duration_ms").record(summary.duration_seconds * 1_000.0);
        gauge!("aggregate_last_run_ts").set(Utc::now().timestamp() as f64);

        tracing::info!(
            target: "aggregate",
            success = summary.success_count,
            errors = summary.error_count,
            total_records = summary.total_records,
            duration_ms = (summary.duration_seconds * 1_000.0) as u64,
            record_id = ?summary.record_id,
            "data aggregation completed"
        );
        summary
    }

    async fn guarded<T, F>(&self, source_name: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout {
                source_name,
                secs: self.call_timeout.as_secs(),
            }),
        }
    }

    async fn fetch_weather(&self) -> RawSourceResult<WeatherReading> {
        match self.guarded("weather", self.weather.fetch()).await {
            Ok(reading) => {
                tracing::info!(
                    target: "aggregate",
                    source = "weather",
                    provider = self.weather.name(),
                    records = 1,
                    "stage succeeded"
                );
                RawSourceResult::Success {
                    payload: reading,
                    count: 1,
                }
            }
            Err(e) => stage_failed("weather", self.weather.name(), e),
        }
    }

    async fn fetch_social(&self) -> RawSourceResult<SocialSnapshot> {
        match self.guarded("osint", self.social.fetch()).await {
            Ok(snapshot) => {
                let count = snapshot.posts.len();
                tracing::info!(
                    target: "aggregate",
                    source = "osint",
                    provider = self.social.name(),
                    records = count,
                    "stage succeeded"
                );
                RawSourceResult::Success {
                    payload: snapshot,
                    count,
                }
            }
            Err(e) => stage_failed("osint", self.social.name(), e),
        }
    }

    async fn summarize(&self, osint: &RawSourceResult<SocialSnapshot>) -> RawSourceResult<Summaries> {
        let posts = match osint {
            RawSourceResult::Success { payload, .. } if !payload.posts.is_empty() => &payload.posts,
            RawSourceResult::Success { .. } => {
                return skipped("social search returned no posts");
            }
            _ => return skipped("social signal fetch did not succeed"),
        };

        let blob = render_posts(posts);
        let sentiment = self
            .guarded("gemini", self.summarizer.summarize(SummaryKind::Sentiment, &blob))
            .await;
        let trend = self
            .guarded("gemini", self.summarizer.summarize(SummaryKind::Trend, &blob))
            .await;

        match (sentiment, trend) {
            (Ok(sentiment_summary), Ok(news_summary)) => {
                tracing::info!(
                    target: "aggregate",
                    source = "gemini",
                    provider = self.summarizer.provider_name(),
                    records = 2,
                    "stage succeeded"
                );
                RawSourceResult::Success {
                    payload: Summaries {
                        sentiment_summary,
                        news_summary,
                    },
                    count: 2,
                }
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => {
                stage_failed("gemini", self.summarizer.provider_name(), e)
            }
            (Err(s), Err(t)) => stage_failed(
                "gemini",
                self.summarizer.provider_name(),
                Error::fetch("gemini", format!("sentiment: {s}; trend: {t}")),
            ),
        }
    }

    async fn persist(&self, summary: &mut RunSummary) {
        let record = match transform(summary) {
            Ok(r) => r,
            Err(e) => {
                counter!("aggregate_persist_errors_total").increment(1);
                tracing::error!(target: "aggregate", error = %e, "transform failed");
                return;
            }
        };

        let saved = match tokio::time::timeout(self.call_timeout, self.store.save(&record)).await {
            Ok(res) => res,
            Err(_) => Err(Error::Storage(format!(
                "write timed out after {}s",
                self.call_timeout.as_secs()
            ))),
        };
        match saved {
            Ok(id) => {
                counter!("aggregate_records_persisted_total").increment(1);
                summary.record_id = Some(id);
            }
            Err(e) => {
                counter!("aggregate_persist_errors_total").increment(1);
                tracing::error!(target: "aggregate", error = %e, "failed to persist aggregated record");
            }
        }
        summary.transformed_record = Some(record);
    }
}

fn stage_failed<T>(source: &'static str, provider: &str, e: Error) -> RawSourceResult<T> {
    counter!("aggregate_source_errors_total", "source" => source).increment(1);
    tracing::error!(target: "aggregate", source, provider, error = %e, "stage failed");
    RawSourceResult::Failure {
        error: e.to_string(),
    }
}

fn skipped<T>(reason: &str) -> RawSourceResult<T> {
    tracing::info!(target: "aggregate", source = "gemini", reason, "stage skipped");
    RawSourceResult::Skipped {
        reason: reason.to_string(),
    }
}

#[async_trait]
impl ScheduledJob for Aggregator {
    fn id(&self) -> &str {
        JOB_ID
    }

    fn name(&self) -> &str {
        JOB_NAME
    }

    async fn execute(&self) {
        tracing::info!(target: "aggregate", at = %Utc::now(), "starting scheduled data aggregation");
        let summary = self.run().await;
        tracing::info!(
            target: "aggregate",
            weather = summary.sources.weather.status(),
            osint = summary.sources.osint.status(),
            gemini = summary.sources.gemini.status(),
            record_id = ?summary.record_id,
            "scheduled data aggregation finished"
        );
    }
}
