// src/api.rs
//! HTTP surface: manual trigger, status, latest record, health.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::aggregate::{Aggregator, RunSummary};
use crate::record::LatestRecord;
use crate::scheduler::{JobInfo, Trigger};
use crate::store::RecordStore;

pub const SERVICE_NAME: &str = "OSINT Weather Aggregator";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub store: Arc<dyn RecordStore>,
    pub trigger: Arc<Trigger>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/aggregate", post(trigger_aggregation))
        .route("/api/v1/status", get(status))
        .route("/api/v1/records/latest", get(latest_record))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": format!("{SERVICE_NAME} API"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Manual trigger. Not serialized against the scheduler; a manual run may
/// overlap a scheduled one.
async fn trigger_aggregation(State(state): State<AppState>) -> Json<RunSummary> {
    tracing::info!(target: "api", "manual aggregation requested");
    Json(state.aggregator.run().await)
}

async fn status() -> Json<serde_json::Value> {
    Json(json!({
        "status": "operational",
        "message": format!("{SERVICE_NAME} is running"),
    }))
}

async fn latest_record(State(state): State<AppState>) -> Response {
    match state.store.latest().await {
        Ok(Some(rec)) => Json(LatestRecord::from(rec)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "No data records found" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(target: "api", error = %e, "latest record query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": e.to_string() })),
            )
                .into_response()
        }
    }
}

#[derive(Serialize)]
struct SchedulerOut {
    running: bool,
    jobs: Vec<JobInfo>,
}

#[derive(Serialize)]
struct HealthOut {
    status: &'static str,
    scheduler: SchedulerOut,
}

async fn health(State(state): State<AppState>) -> Json<HealthOut> {
    Json(HealthOut {
        status: "healthy",
        scheduler: SchedulerOut {
            running: state.trigger.is_running(),
            jobs: state.trigger.list_jobs(),
        },
    })
}
