//! Telemetry client shared by every component of the service.

use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::connection::{ConnectionString, ConnectionStringError};

const TARGET: &str = "ingestion.telemetry";
const DEFAULT_CLOUD_ROLE: &str = "ingestion";

/// Severity attached to trace telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityLevel {
    Verbose,
    Information,
    Warning,
    Error,
    Critical,
}

/// Tags attached to every item the client records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryContext {
    pub cloud_role: String,
    pub cloud_role_instance: String,
    pub instrumentation_key: Option<String>,
    pub ingestion_endpoint: Option<String>,
    pub live_endpoint: Option<String>,
}

impl TelemetryContext {
    fn unconfigured(cloud_role: impl Into<String>) -> Self {
        Self {
            cloud_role: cloud_role.into(),
            cloud_role_instance: role_instance(),
            instrumentation_key: None,
            ingestion_endpoint: None,
            live_endpoint: None,
        }
    }
}

/// One handled HTTP request.
#[derive(Debug, Clone)]
pub struct RequestTelemetry {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration: Duration,
}

impl RequestTelemetry {
    pub fn success(&self) -> bool {
        self.status < 500
    }
}

/// Counts of items recorded since the client was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub events: u64,
    pub metrics: u64,
    pub requests: u64,
    pub exceptions: u64,
    pub traces: u64,
    pub flushes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    events: AtomicU64,
    metrics: AtomicU64,
    requests: AtomicU64,
    exceptions: AtomicU64,
    traces: AtomicU64,
    flushes: AtomicU64,
}

/// Handle used to emit operational telemetry.
///
/// Items are recorded as structured `tracing` events under the
/// `ingestion.telemetry` target, so whichever subscriber and exporters the
/// process installed receive them. The client is `Send + Sync` and meant to
/// be shared behind an `Arc`.
#[derive(Debug)]
pub struct TelemetryClient {
    context: TelemetryContext,
    counters: Counters,
}

impl TelemetryClient {
    /// Build a client with default settings. Never fails.
    pub fn new() -> Self {
        Self {
            context: TelemetryContext::unconfigured(DEFAULT_CLOUD_ROLE),
            counters: Counters::default(),
        }
    }

    /// Build a client addressed at the resource named by `connection_string`.
    pub fn from_connection_string(
        connection_string: &str,
        cloud_role: impl Into<String>,
    ) -> Result<Self, ConnectionStringError> {
        let parsed: ConnectionString = connection_string.parse()?;
        Ok(Self {
            context: TelemetryContext {
                cloud_role: cloud_role.into(),
                cloud_role_instance: role_instance(),
                instrumentation_key: Some(parsed.instrumentation_key().to_string()),
                ingestion_endpoint: Some(parsed.ingestion_endpoint().to_string()),
                live_endpoint: parsed.live_endpoint().map(str::to_string),
            },
            counters: Counters::default(),
        })
    }

    /// Replace the cloud role reported with every item.
    pub fn with_cloud_role(mut self, cloud_role: impl Into<String>) -> Self {
        self.context.cloud_role = cloud_role.into();
        self
    }

    pub fn context(&self) -> &TelemetryContext {
        &self.context
    }

    /// True when an instrumentation key was supplied.
    pub fn is_configured(&self) -> bool {
        self.context.instrumentation_key.is_some()
    }

    pub fn track_event(&self, name: &str, properties: &[(&str, &str)]) {
        self.counters.events.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            target: TARGET,
            kind = "event",
            cloud_role = %self.context.cloud_role,
            event_name = name,
            properties = ?properties,
            "event tracked"
        );
    }

    pub fn track_metric(&self, name: &str, value: f64) {
        self.counters.metrics.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            target: TARGET,
            kind = "metric",
            cloud_role = %self.context.cloud_role,
            metric_name = name,
            value,
            "metric tracked"
        );
    }

    pub fn track_request(&self, request: RequestTelemetry) {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            target: TARGET,
            kind = "request",
            cloud_role = %self.context.cloud_role,
            method = %request.method,
            path = %request.path,
            status = request.status,
            duration_ms = request.duration.as_secs_f64() * 1000.0,
            success = request.success(),
            "request tracked"
        );
    }

    pub fn track_exception(&self, error: &dyn Error) {
        self.counters.exceptions.fetch_add(1, Ordering::Relaxed);
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        tracing::error!(
            target: TARGET,
            kind = "exception",
            cloud_role = %self.context.cloud_role,
            error = %error,
            causes = ?chain,
            "exception tracked"
        );
    }

    pub fn track_trace(&self, message: &str, severity: SeverityLevel) {
        self.counters.traces.fetch_add(1, Ordering::Relaxed);
        let role = &self.context.cloud_role;
        match severity {
            SeverityLevel::Verbose => {
                tracing::debug!(target: TARGET, kind = "trace", cloud_role = %role, "{message}")
            }
            SeverityLevel::Information => {
                tracing::info!(target: TARGET, kind = "trace", cloud_role = %role, "{message}")
            }
            SeverityLevel::Warning => {
                tracing::warn!(target: TARGET, kind = "trace", cloud_role = %role, "{message}")
            }
            SeverityLevel::Error | SeverityLevel::Critical => {
                tracing::error!(target: TARGET, kind = "trace", cloud_role = %role, ?severity, "{message}")
            }
        }
    }

    /// Record a flush and log the running counts. Items are handed to the
    /// subscriber as they are tracked; installed exporters are drained by
    /// [`crate::logging::LoggingGuard::shutdown`].
    pub fn flush(&self) {
        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        let stats = self.stats();
        tracing::debug!(
            target: TARGET,
            events = stats.events,
            metrics = stats.metrics,
            requests = stats.requests,
            exceptions = stats.exceptions,
            traces = stats.traces,
            "telemetry flushed"
        );
    }

    pub fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            events: self.counters.events.load(Ordering::Relaxed),
            metrics: self.counters.metrics.load(Ordering::Relaxed),
            requests: self.counters.requests.load(Ordering::Relaxed),
            exceptions: self.counters.exceptions.load(Ordering::Relaxed),
            traces: self.counters.traces.load(Ordering::Relaxed),
            flushes: self.counters.flushes.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryClient {
    fn default() -> Self {
        Self::new()
    }
}

fn role_instance() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}
