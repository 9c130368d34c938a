// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET  /  and  /health
// - GET  /api/v1/status
// - GET  /api/v1/records/latest  (404 before any run, 200 after)
// - POST /api/v1/aggregate       (run summary contract)

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use brand_weather_aggregator::analyze::MockProvider;
use brand_weather_aggregator::ingest::providers::{OpenMeteoProvider, RedditSearchProvider};
use brand_weather_aggregator::{create_router, Aggregator, AppState, RecordStore, SqliteStore, Trigger};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_state() -> AppState {
    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::open_in_memory().expect("sqlite"));
    let aggregator = Arc::new(Aggregator::new(
        Arc::new(OpenMeteoProvider::from_fixture(
            "Tel Aviv Yafo",
            include_str!("fixtures/open_meteo.json"),
        )),
        Arc::new(RedditSearchProvider::from_fixture(
            "Gymshark",
            include_str!("fixtures/reddit_search.json"),
        )),
        Arc::new(MockProvider::default()),
        Arc::clone(&store),
    ));
    let trigger = Arc::new(Trigger::new(aggregator.clone(), Duration::from_secs(8 * 3600)));
    AppState {
        aggregator,
        store,
        trigger,
    }
}

async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).expect("json body");
    (status, json)
}

#[tokio::test]
async fn root_and_status_report_service() {
    let app = create_router(test_state());

    let (code, v) = call(&app, "GET", "/").await;
    assert_eq!(code, StatusCode::OK);
    assert!(v["message"].as_str().unwrap().contains("Aggregator"));
    assert!(v["version"].is_string());

    let (code, v) = call(&app, "GET", "/api/v1/status").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(v["status"], "operational");
}

#[tokio::test]
async fn health_reflects_scheduler_state() {
    let state = test_state();
    let trigger = Arc::clone(&state.trigger);
    let app = create_router(state);

    let (code, v) = call(&app, "GET", "/health").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["scheduler"]["running"], false);
    assert_eq!(v["scheduler"]["jobs"].as_array().unwrap().len(), 0);

    trigger.start();
    let (_, v) = call(&app, "GET", "/health").await;
    assert_eq!(v["scheduler"]["running"], true);
    let jobs = v["scheduler"]["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["id"], "data_aggregation_job");
    assert_eq!(jobs[0]["trigger"], "interval[8:00:00]");
    assert!(jobs[0]["next_run_time"].is_string());

    trigger.stop().await;
}

#[tokio::test]
async fn latest_is_404_until_a_run_persists() {
    let app = create_router(test_state());

    let (code, v) = call(&app, "GET", "/api/v1/records/latest").await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    assert_eq!(v["detail"], "No data records found");

    let (code, run) = call(&app, "POST", "/api/v1/aggregate").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(run["sources"]["weather"]["status"], "success");
    assert_eq!(run["sources"]["osint"]["status"], "success");
    assert_eq!(run["sources"]["osint"]["records"], 3);
    assert_eq!(run["sources"]["gemini"]["status"], "success");
    assert_eq!(run["success_count"], 3);
    assert_eq!(run["error_count"], 0);
    assert_eq!(run["total_records"], 6);
    let id = run["record_id"].as_i64().expect("record id");

    let (code, v) = call(&app, "GET", "/api/v1/records/latest").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(v["id"].as_i64(), Some(id));
    assert_eq!(v["city_name"], "Tel Aviv Yafo");
    assert_eq!(v["brand_name"], "Gymshark");
    assert_eq!(v["sentiment_summary"], "Neutral sentiment (mock).");
    assert!(v.get("raw_weather_response").is_none(), "raw payloads stay internal");
}
