//! Parsing for monitoring-service connection strings.
//!
//! A connection string is a `;`-separated list of `Key=Value` pairs, e.g.
//! `InstrumentationKey=00000000-0000-0000-0000-000000000000;IngestionEndpoint=https://westus2-1.in.applicationinsights.azure.com/`.
//! Keys are matched case-insensitively. Keys other than the instrumentation
//! key and the ingestion/live endpoints are ignored.

use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

/// Endpoint used when the connection string does not name one.
pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";

const INSTRUMENTATION_KEY: &str = "instrumentationkey";
const INGESTION_ENDPOINT: &str = "ingestionendpoint";
const LIVE_ENDPOINT: &str = "liveendpoint";
const ENDPOINT_SUFFIX: &str = "endpointsuffix";

/// Errors returned while parsing a connection string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionStringError {
    #[error("connection string is empty")]
    Empty,

    #[error("malformed connection string segment '{0}'; expected Key=Value")]
    MalformedSegment(String),

    #[error("connection string does not contain an InstrumentationKey")]
    MissingInstrumentationKey,
}

/// A parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    instrumentation_key: String,
    ingestion_endpoint: String,
    live_endpoint: Option<String>,
}

impl ConnectionString {
    pub fn instrumentation_key(&self) -> &str {
        &self.instrumentation_key
    }

    /// Ingestion endpoint without a trailing slash.
    pub fn ingestion_endpoint(&self) -> &str {
        &self.ingestion_endpoint
    }

    /// Live-metrics endpoint without a trailing slash, when one is named.
    pub fn live_endpoint(&self) -> Option<&str> {
        self.live_endpoint.as_deref()
    }
}

impl FromStr for ConnectionString {
    type Err = ConnectionStringError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim().is_empty() {
            return Err(ConnectionStringError::Empty);
        }

        let mut pairs = BTreeMap::new();
        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::MalformedSegment(segment.to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ConnectionStringError::MalformedSegment(segment.to_string()));
            }
            pairs.insert(key.to_ascii_lowercase(), value.trim().to_string());
        }

        let instrumentation_key = pairs
            .remove(INSTRUMENTATION_KEY)
            .filter(|key| !key.is_empty())
            .ok_or(ConnectionStringError::MissingInstrumentationKey)?;

        let ingestion_endpoint = match pairs.remove(INGESTION_ENDPOINT) {
            Some(endpoint) if !endpoint.is_empty() => endpoint,
            _ => match pairs.get(ENDPOINT_SUFFIX) {
                Some(suffix) if !suffix.is_empty() => format!("https://dc.{suffix}"),
                _ => DEFAULT_INGESTION_ENDPOINT.to_string(),
            },
        };

        let live_endpoint = pairs
            .remove(LIVE_ENDPOINT)
            .filter(|endpoint| !endpoint.is_empty())
            .map(|endpoint| endpoint.trim_end_matches('/').to_string());

        Ok(Self {
            instrumentation_key,
            ingestion_endpoint: ingestion_endpoint.trim_end_matches('/').to_string(),
            live_endpoint,
        })
    }
}
