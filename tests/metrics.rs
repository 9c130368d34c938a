// tests/metrics.rs
//
// One test per process: the Prometheus recorder is global.

use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use brand_weather_aggregator::analyze::MockProvider;
use brand_weather_aggregator::ingest::providers::{OpenMeteoProvider, RedditSearchProvider};
use brand_weather_aggregator::metrics::Metrics;
use brand_weather_aggregator::{Aggregator, SqliteStore};

#[tokio::test]
async fn metrics_endpoint_contains_expected_series() {
    let metrics = Metrics::install(28_800).expect("install recorder");

    let agg = Aggregator::new(
        Arc::new(OpenMeteoProvider::from_fixture(
            "Tel Aviv Yafo",
            include_str!("fixtures/open_meteo.json"),
        )),
        Arc::new(RedditSearchProvider::from_fixture("Gymshark", "not json")),
        Arc::new(MockProvider::default()),
        Arc::new(SqliteStore::open_in_memory().unwrap()),
    );
    let s = agg.run().await;
    assert!(s.sources.osint.is_failure());

    let app: Router = metrics.router();
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "scheduler_interval_secs",
        "aggregate_runs_total",
        "aggregate_source_errors_total{source=\"osint\"}",
        "aggregate_run_duration_ms",
        "aggregate_last_run_ts",
    ] {
        assert!(text.contains(needle), "missing `{needle}` in:\n{text}");
    }
}
