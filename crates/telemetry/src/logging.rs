//! Tracing subscriber bootstrap with optional OTLP trace export.
//!
//! Console output is always installed (pretty or JSON). When an OTLP endpoint
//! is configured, spans are additionally exported over HTTP/protobuf to
//! `<endpoint>/v1/traces`.
//!
//! # Shutdown
//! Call [`LoggingGuard::shutdown`] before exiting the Tokio runtime so the
//! batch exporter drains its queue.

use anyhow::{Context, Result};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{Protocol, SpanExporter, WithExportConfig};
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use serde::{Deserialize, Serialize};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Console log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Inputs for [`init`].
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub filter: String,
    /// Base OTLP endpoint (without per-signal suffix), e.g. `http://localhost:4318`.
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
            otlp_endpoint: None,
            service_name: "ingestion".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "local".to_string(),
        }
    }
}

impl LoggingConfig {
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    fn traces_endpoint(&self) -> Option<String> {
        self.otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .map(|endpoint| format!("{}/v1/traces", endpoint.trim_end_matches('/')))
    }
}

/// Keeps exporters alive until [`LoggingGuard::shutdown`] is called.
pub struct LoggingGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl LoggingGuard {
    pub fn exports_traces(&self) -> bool {
        self.tracer_provider.is_some()
    }

    /// Flush and shut down the trace exporter, if any.
    pub fn shutdown(self) -> Result<()> {
        if let Some(provider) = self.tracer_provider {
            provider
                .shutdown()
                .map_err(|e| anyhow::anyhow!("tracer: {e}"))?;
        }
        Ok(())
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
/// Fails if the OTLP exporter cannot be built or a global subscriber is
/// already installed.
pub fn init(cfg: &LoggingConfig) -> Result<LoggingGuard> {
    let fmt_layer = match cfg.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
    };

    let (otel_layer, tracer_provider) = match cfg.traces_endpoint() {
        Some(endpoint) => {
            let resource = Resource::builder()
                .with_service_name(cfg.service_name.clone())
                .with_attributes([
                    KeyValue::new("service.version", cfg.service_version.clone()),
                    KeyValue::new("deployment.environment", cfg.environment.clone()),
                ])
                .build();

            let exporter = SpanExporter::builder()
                .with_http()
                .with_protocol(Protocol::HttpBinary)
                .with_endpoint(endpoint)
                .build()
                .context("failed to build OTLP span exporter")?;

            let provider = SdkTracerProvider::builder()
                .with_batch_exporter(exporter)
                .with_resource(resource)
                .build();
            global::set_tracer_provider(provider.clone());

            (
                Some(OpenTelemetryLayer::new(global::tracer("ingestion"))),
                Some(provider),
            )
        }
        None => (None, None),
    };

    Registry::default()
        .with(cfg.env_filter())
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::debug!(
        format = ?cfg.format,
        otlp = tracer_provider.is_some(),
        "logging initialized"
    );

    Ok(LoggingGuard { tracer_provider })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traces_endpoint_appends_signal_path() {
        let cfg = LoggingConfig {
            otlp_endpoint: Some("http://collector:4318/".to_string()),
            ..LoggingConfig::default()
        };
        assert_eq!(
            cfg.traces_endpoint().as_deref(),
            Some("http://collector:4318/v1/traces")
        );
    }

    #[test]
    fn blank_endpoint_disables_export() {
        let cfg = LoggingConfig {
            otlp_endpoint: Some("  ".to_string()),
            ..LoggingConfig::default()
        };
        assert!(cfg.traces_endpoint().is_none());
        assert!(LoggingConfig::default().traces_endpoint().is_none());
    }

    #[test]
    fn log_format_parses_lowercase() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
    }

    #[tokio::test]
    async fn guard_without_exporter_shuts_down_cleanly() {
        let guard = LoggingGuard {
            tracer_provider: None,
        };
        assert!(!guard.exports_traces());
        guard.shutdown().unwrap();
    }
}
