//! Aggregator service binary entrypoint.
//! Loads config, opens the store, starts the periodic trigger and serves the
//! HTTP surface until Ctrl-C / SIGTERM, then drains the trigger.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use brand_weather_aggregator::{
    api::{self, AppState},
    metrics::Metrics,
    AppConfig, Aggregator, RecordStore, SqliteStore, Trigger,
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// `RUST_LOG` drives the filter (default `info`); `LOG_FORMAT=json` switches
/// to JSON lines for log shipping.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    tracing::info!("starting {}", api::SERVICE_NAME);

    let cfg = AppConfig::load_default().context("loading configuration")?;
    cfg.validate()?;

    let metrics = Metrics::install(cfg.schedule.interval_secs)?;

    let store: Arc<dyn RecordStore> = Arc::new(
        SqliteStore::open(&cfg.storage.database_path)
            .with_context(|| format!("opening {}", cfg.storage.database_path.display()))?,
    );
    let aggregator = Arc::new(Aggregator::from_config(&cfg, Arc::clone(&store))?);

    let trigger = Arc::new(Trigger::new(aggregator.clone(), cfg.schedule.interval()));
    if cfg.schedule.enabled {
        trigger.start();
    } else {
        tracing::info!("periodic aggregation disabled by config");
    }

    let state = AppState {
        aggregator,
        store,
        trigger: Arc::clone(&trigger),
    };
    let app = api::create_router(state).merge(metrics.router());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    tracing::info!("shutting down");
    if trigger.is_running() {
        trigger.stop().await;
    }
    Ok(())
}
