//! Logging and OpenTelemetry setup.
//!
//! Builds a tracing subscriber that writes JSON lines to the worker's log
//! file (stdout carries response envelopes, so it never gets logs). If an
//! OTLP endpoint is configured, traces, metrics and logs are exported there
//! as well.
//!
//! The subscriber is not installed globally. [`init_telemetry`] hands back a
//! [`tracing::Dispatch`] inside the guard; callers run under it explicitly
//! and pass it on to the dispatcher, which attaches it to every task it
//! spawns.

pub mod metrics;
pub mod work;

use std::fs::File;
use std::sync::Mutex;

use tracing::Dispatch;

use crate::error::{Error, Result};

/// Configuration for telemetry initialization.
pub struct TelemetryConfig {
    /// Optional OTLP endpoint (e.g. "http://localhost:4317").
    pub endpoint: Option<String>,
    /// The service name reported in telemetry signals.
    pub service_name: String,
    /// Log sink. `None` logs to stderr.
    pub log_file: Option<File>,
    /// Log at debug level instead of warn. `RUST_LOG` overrides either.
    pub debug: bool,
}

/// Owns the logging handle and the OTel providers.
///
/// Must be held for the lifetime of the application. When dropped, all
/// OTel pipelines are flushed and shut down.
pub struct TelemetryGuard {
    dispatch: Dispatch,
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
    meter_provider: Option<opentelemetry_sdk::metrics::SdkMeterProvider>,
    logger_provider: Option<opentelemetry_sdk::logs::SdkLoggerProvider>,
}

impl TelemetryGuard {
    /// The logging handle. Clone it into whatever needs to log.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Force-flush all telemetry pipelines.
    pub fn force_flush(&self) {
        if let Some(ref provider) = self.tracer_provider {
            let _ = provider.force_flush();
        }
        if let Some(ref provider) = self.meter_provider {
            let _ = provider.force_flush();
        }
        if let Some(ref provider) = self.logger_provider {
            let _ = provider.force_flush();
        }
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.logger_provider.take() {
            let _ = provider.shutdown();
        }
        if let Some(provider) = self.meter_provider.take() {
            let _ = provider.shutdown();
        }
        if let Some(provider) = self.tracer_provider.take() {
            let _ = provider.shutdown();
        }
    }
}

/// Build the logging handle (plus OTel pipelines when an endpoint is set).
///
/// # Errors
///
/// Returns an error if any OTLP exporter fails to build.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard> {
    use opentelemetry::trace::TracerProvider as _;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;

    let default_level = if config.debug { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, stderr_layer) = match config.log_file {
        Some(file) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(Mutex::new(file)),
            ),
            None,
        ),
        None => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    let mut tracer_provider = None;
    let mut meter_provider = None;
    let mut logger_provider = None;

    let (otel_trace_layer, otel_log_layer) = if let Some(endpoint) = config.endpoint {
        use opentelemetry_otlp::WithExportConfig as _;

        let resource = opentelemetry_sdk::Resource::builder()
            .with_service_name(config.service_name)
            .build();

        // --- Traces ---
        let span_exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()
            .map_err(|e| Error::Other(format!("failed to create OTLP span exporter: {e}")))?;

        let tracers = opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_batch_exporter(span_exporter)
            .with_resource(resource.clone())
            .build();
        let tracer = tracers.tracer("catalog-worker");

        // --- Metrics ---
        let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()
            .map_err(|e| Error::Other(format!("failed to create OTLP metric exporter: {e}")))?;

        let meters = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_periodic_exporter(metric_exporter)
            .with_resource(resource.clone())
            .build();
        opentelemetry::global::set_meter_provider(meters.clone());

        // --- Logs ---
        let log_exporter = opentelemetry_otlp::LogExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()
            .map_err(|e| Error::Other(format!("failed to create OTLP log exporter: {e}")))?;

        let loggers = opentelemetry_sdk::logs::SdkLoggerProvider::builder()
            .with_batch_exporter(log_exporter)
            .with_resource(resource)
            .build();

        let log_layer =
            opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(&loggers);

        tracer_provider = Some(tracers);
        meter_provider = Some(meters);
        logger_provider = Some(loggers);

        (
            Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Some(log_layer),
        )
    } else {
        (None, None)
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .with(otel_trace_layer)
        .with(otel_log_layer);

    Ok(TelemetryGuard {
        dispatch: Dispatch::new(subscriber),
        tracer_provider,
        meter_provider,
        logger_provider,
    })
}
