//! Telemetry for the ingestion service.
//!
//! * [`TelemetryClient`] – the process-wide handle components use to record
//!   events, metrics, requests, exceptions and traces.
//! * [`ConnectionString`] – parser for monitoring connection strings.
//! * [`logging`] – tracing subscriber bootstrap with optional OTLP export.

pub mod client;
pub mod connection;
pub mod logging;

pub use client::{
    RequestTelemetry, SeverityLevel, TelemetryClient, TelemetryContext, TelemetryStats,
};
pub use connection::{ConnectionString, ConnectionStringError};
pub use logging::{LogFormat, LoggingConfig, LoggingGuard};
