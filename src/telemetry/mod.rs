//! Tracing and OpenTelemetry setup.
//!
//! The queue only emits `tracing` spans and events plus OTel metric
//! instruments; nothing leaves the process until an application calls
//! [`init_telemetry`]. Dispatch spans and queue events always go to stderr.
//! When `OTEL_ENDPOINT` is set they are also exported over OTLP, together
//! with the `expresslane.*` metrics.

pub mod dispatch;
pub mod metrics;

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::Config;
use crate::error::{Error, Result};

/// Service and instrumentation scope name reported to collectors.
pub const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

/// OTLP providers, present only when an endpoint is configured.
struct Exporters {
    traces: SdkTracerProvider,
    metrics: SdkMeterProvider,
    logs: SdkLoggerProvider,
}

/// Keeps the OTLP pipelines alive. Dropping it flushes whatever is still
/// batched and shuts the exporters down; hold it until the queue is done.
pub struct TelemetryGuard {
    exporters: Option<Exporters>,
}

impl TelemetryGuard {
    /// Whether spans, metrics and logs are being exported over OTLP.
    pub fn is_exporting(&self) -> bool {
        self.exporters.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(exporters) = self.exporters.take() {
            let _ = exporters.logs.shutdown();
            let _ = exporters.metrics.shutdown();
            let _ = exporters.traces.shutdown();
        }
    }
}

/// Install the global tracing subscriber described by `config`.
///
/// `RUST_LOG` wins over `config.log_level` when both are set.
///
/// # Errors
///
/// Fails if an OTLP exporter cannot be built or a global subscriber is
/// already installed.
pub fn init_telemetry(config: &Config) -> Result<TelemetryGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let exporters = config
        .otel_endpoint
        .as_deref()
        .map(build_exporters)
        .transpose()?;

    let span_layer = exporters.as_ref().map(|e| {
        tracing_opentelemetry::layer().with_tracer(e.traces.tracer(SERVICE_NAME))
    });
    let log_layer = exporters.as_ref().map(|e| {
        opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(&e.logs)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .with(span_layer)
        .with(log_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("failed to install tracing subscriber: {e}")))?;

    Ok(TelemetryGuard { exporters })
}

fn build_exporters(endpoint: &str) -> Result<Exporters> {
    let resource = Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_attribute(KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
            env!("CARGO_PKG_VERSION"),
        ))
        .build();
    let otlp_err = |signal: &str, e: &dyn std::fmt::Display| {
        Error::Config(format!("OTLP {signal} exporter for {endpoint}: {e}"))
    };

    let spans = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| otlp_err("span", &e))?;
    let traces = SdkTracerProvider::builder()
        .with_batch_exporter(spans)
        .with_resource(resource.clone())
        .build();

    let instruments = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| otlp_err("metric", &e))?;
    let metrics = SdkMeterProvider::builder()
        .with_periodic_exporter(instruments)
        .with_resource(resource.clone())
        .build();
    // Instruments in `metrics` resolve their meter through the global provider.
    opentelemetry::global::set_meter_provider(metrics.clone());

    let records = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| otlp_err("log", &e))?;
    let logs = SdkLoggerProvider::builder()
        .with_batch_exporter(records)
        .with_resource(resource)
        .build();

    Ok(Exporters {
        traces,
        metrics,
        logs,
    })
}
