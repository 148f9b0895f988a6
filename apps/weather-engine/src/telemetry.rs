//! Tracing Setup
//!
//! Console logging through `tracing-subscriber`, plus an OpenTelemetry OTLP
//! layer unless disabled.
//!
//! # Configuration
//!
//! - `RUST_LOG`: filter directives (default: `weather_engine=info`)
//! - `OTEL_ENABLED`: set to `false` for console logging only
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP gRPC endpoint (default: `http://localhost:4317`)
//! - `OTEL_SERVICE_NAME`: service name for traces (default: `weather-engine`)

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "weather_engine=info";
const DEFAULT_ENDPOINT: &str = "http://localhost:4317";
const DEFAULT_SERVICE_NAME: &str = "weather-engine";

/// Guard that shuts down the tracer provider on drop.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Whether spans are exported over OTLP.
    pub const fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Error shutting down tracer provider: {e:?}");
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn init_console() -> TelemetryGuard {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
    TelemetryGuard { provider: None }
}

/// Initialize tracing, exporting spans over OTLP when enabled.
///
/// Falls back to console logging if the exporter cannot be built.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
#[must_use]
pub fn init_telemetry() -> TelemetryGuard {
    let otel_enabled = std::env::var("OTEL_ENABLED").map_or(true, |v| v != "false");

    if !otel_enabled {
        let guard = init_console();
        tracing::info!("OpenTelemetry disabled (OTEL_ENABLED=false), using console logging only");
        return guard;
    }

    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()
    {
        Ok(exp) => exp,
        Err(e) => {
            eprintln!("Failed to create OTLP exporter: {e:?}, falling back to console logging");
            return init_console();
        }
    };

    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter)
        .build();
    let tracer = provider.tracer(service_name.clone());

    Registry::default()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    tracing::info!(
        service_name = %service_name,
        endpoint = %endpoint,
        "OpenTelemetry initialized"
    );

    TelemetryGuard {
        provider: Some(provider),
    }
}
