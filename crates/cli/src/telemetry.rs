//! Tracing subscriber and OpenTelemetry wiring.
//!
//! Events go to stderr so stdout stays reserved for command output. The filter
//! comes from `RUST_LOG` when set and from `[logging].level` otherwise. When an
//! OTLP endpoint is configured, spans (including the engine's `graph_run` span)
//! are also exported over gRPC.

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

const SERVICE_NAME: &str = "graphrun";

/// Keeps the span exporter alive; call [`Telemetry::shutdown`] before exiting
/// so batched spans are flushed.
pub struct Telemetry {
    provider: Option<TracerProvider>,
}

impl Telemetry {
    /// Flushes and stops the OTLP exporter, if one was installed.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(err) = provider.shutdown() {
                tracing::warn!(error = %err, "Failed to shut down span exporter");
            }
        }
    }
}

/// Installs the global subscriber.
///
/// Must run inside a Tokio runtime when `otlp_endpoint` is set.
pub fn init(config: &LoggingConfig) -> Result<Telemetry> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("invalid log level '{}'", config.level))?;

    let json = config.format == LogFormat::Json;
    let json_layer = json.then(|| fmt::layer().with_writer(std::io::stderr).json());
    let compact_layer = (!json).then(|| fmt::layer().with_writer(std::io::stderr).compact());

    let provider = config.otlp_endpoint.as_deref().map(tracer_provider).transpose()?;
    let otel_layer = provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME)));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(compact_layer)
        .with(otel_layer)
        .try_init()
        .context("install tracing subscriber")?;

    if let Some(endpoint) = &config.otlp_endpoint {
        tracing::debug!(endpoint = %endpoint, "Exporting spans over OTLP");
    }

    Ok(Telemetry { provider })
}

fn tracer_provider(endpoint: &str) -> Result<TracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .with_context(|| format!("build OTLP exporter for {endpoint}"))?;

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new("service.name", SERVICE_NAME)]))
        .build())
}
