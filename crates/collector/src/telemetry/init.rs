//! Tracing subscriber setup with an optional OTLP span exporter.

use anyhow::{Context, Result};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace::Tracer, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Service name reported in the OTEL resource.
const SERVICE_NAME: &str = "pii-collector";

/// Install the global tracing subscriber.
///
/// Logs are written to stdout as JSON. When `otlp_endpoint` is a non-blank
/// URL, spans are also exported over OTLP/gRPC; otherwise the service runs
/// with logs only.
///
/// # Errors
///
/// Returns an error if the OTLP exporter cannot be installed or a global
/// subscriber is already set.
pub fn init_telemetry(otlp_endpoint: Option<&str>, log_level: &str) -> Result<()> {
    let tracer = otlp_endpoint
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(otlp_tracer)
        .transpose()?;

    tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(tracing_subscriber::fmt::layer().json())
        .with(tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t)))
        .try_init()
        .context("failed to initialise tracing subscriber")?;

    Ok(())
}

fn otlp_tracer(endpoint: &str) -> Result<Tracer> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);
    let trace_config = opentelemetry_sdk::trace::Config::default().with_resource(otel_resource());
    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(trace_config)
        .install_batch(runtime::Tokio)
        .with_context(|| format!("failed to install OTLP exporter for {endpoint}"))
}

/// `RUST_LOG` wins over `LOG_LEVEL` when set.
fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

fn otel_resource() -> Resource {
    use opentelemetry_semantic_conventions::resource;

    Resource::new([
        KeyValue::new(resource::SERVICE_NAME, SERVICE_NAME),
        KeyValue::new(resource::SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
    ])
}
