//! Weather Engine Binary
//!
//! Loads configuration, replays any seed file and serves the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin weather-engine
//! ```
//!
//! # Environment Variables
//!
//! - `WEATHER_ENGINE_CONFIG`: config file path (default: `config.yaml`; defaults
//!   apply when that file does not exist)
//! - `RUST_LOG`: log filter (default: `weather_engine=info`)
//! - `OTEL_ENABLED`, `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`: tracing export

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use weather_engine::application::services::{WeatherEngine, ingest_from};
use weather_engine::config::{Config, DEFAULT_CONFIG_PATH, load_config};
use weather_engine::infrastructure::http::{AppState, create_router};
use weather_engine::infrastructure::replay::JsonLinesSource;
use weather_engine::observability::{MetricsConfig, init_metrics};
use weather_engine::telemetry::init_telemetry;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    let _telemetry = init_telemetry();

    tracing::info!("Starting Weather Engine");

    let config = resolve_config()?;
    log_config(&config);

    let metrics = init_metrics(&MetricsConfig::default())?;
    let engine = Arc::new(WeatherEngine::new(config.engine_settings())?);

    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown_token.clone()));

    replay_seed(&config, &engine, &shutdown_token).await?;

    if shutdown_token.is_cancelled() {
        tracing::info!("Shutdown requested during replay, exiting");
        return Ok(());
    }

    let state = AppState {
        engine,
        metrics: Some(metrics),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    serve(&config, state, shutdown_token).await?;

    tracing::info!("Weather engine stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Load the configuration file.
///
/// An explicit `WEATHER_ENGINE_CONFIG` must exist; a missing default file
/// means built-in defaults.
fn resolve_config() -> anyhow::Result<Config> {
    if let Ok(path) = std::env::var("WEATHER_ENGINE_CONFIG") {
        return load_config(Some(&path)).with_context(|| format!("loading {path}"));
    }

    if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() {
        return load_config(None).context("loading default config");
    }

    tracing::info!(
        path = DEFAULT_CONFIG_PATH,
        "No config file found, using built-in defaults"
    );
    Ok(Config::default())
}

/// Log the parsed configuration.
fn log_config(config: &Config) {
    tracing::info!(
        http_port = config.server.http_port,
        window_capacity = config.window.capacity,
        retention_days = config.window.retention_days,
        min_observations = config.features.min_observations,
        volatility_convention = ?config.features.volatility_convention,
        replay = ?config.replay.path,
        "Configuration loaded"
    );
}

/// Replay the seed file, if configured, before serving.
async fn replay_seed(
    config: &Config,
    engine: &WeatherEngine,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let Some(path) = &config.replay.path else {
        return Ok(());
    };

    tracing::info!(path = %path.display(), "Replaying observations");
    let mut source = JsonLinesSource::open(path).await?;
    let summary = ingest_from(engine, &mut source, shutdown)
        .await
        .with_context(|| format!("replaying {}", path.display()))?;

    tracing::info!(
        records = summary.total(),
        symbols = engine.symbols().len(),
        "Replay complete"
    );
    Ok(())
}

/// Serve HTTP until the shutdown token fires.
async fn serve(
    config: &Config,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let http_addr = config.http_addr()?;
    let app = create_router(state);

    tracing::info!(%http_addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /metrics");
    tracing::info!("  GET  /api/v1/weather/{{symbol}}");
    tracing::info!("  GET  /api/v1/danger-zones/{{symbol}}");
    tracing::info!("  POST /api/v1/observations/{{symbol}}");

    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("binding {http_addr}"))?;
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .into_future();

    tokio::select! {
        result = server => result.context("HTTP server error")?,
        () = async {
            shutdown.cancelled().await;
            tokio::time::sleep(SHUTDOWN_TIMEOUT).await;
        } => {
            tracing::warn!(
                timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                "Graceful shutdown timed out, dropping connections"
            );
        }
    }

    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT) and cancel `token`.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
#[allow(clippy::expect_used)]
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
