use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use ingestion_telemetry::TelemetryClient;

use crate::settings::ApplicationProperties;

/// Shared state handed to every component.
///
/// Built once at startup. Clones share the same properties and the same
/// [`TelemetryClient`] instance and readiness flag. A context starts out not
/// ready; the server marks it ready once it is accepting connections.
#[derive(Debug, Clone)]
pub struct AppContext {
    properties: Arc<ApplicationProperties>,
    telemetry: Arc<TelemetryClient>,
    ready: Arc<AtomicBool>,
}

impl AppContext {
    /// Build the context and its telemetry client from bound properties.
    ///
    /// Without a connection string the client falls back to default settings.
    pub fn new(properties: ApplicationProperties) -> anyhow::Result<Self> {
        let telemetry = match properties.telemetry.connection_string.as_deref() {
            Some(connection_string) => {
                TelemetryClient::from_connection_string(connection_string, properties.cloud_role())
                    .context("invalid telemetry connection string")?
            }
            None => TelemetryClient::new().with_cloud_role(properties.cloud_role()),
        };

        tracing::info!(
            cloud_role = %telemetry.context().cloud_role,
            configured = telemetry.is_configured(),
            ingestion_endpoint = telemetry.context().ingestion_endpoint.as_deref(),
            live_endpoint = telemetry.context().live_endpoint.as_deref(),
            "telemetry client created"
        );

        Ok(Self::with_telemetry(properties, telemetry))
    }

    /// Build a context around an existing client.
    pub fn with_telemetry(properties: ApplicationProperties, telemetry: TelemetryClient) -> Self {
        Self {
            properties: Arc::new(properties),
            telemetry: Arc::new(telemetry),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn properties(&self) -> &ApplicationProperties {
        &self.properties
    }

    pub fn telemetry(&self) -> &Arc<TelemetryClient> {
        &self.telemetry
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Stop advertising readiness while in-flight requests drain.
    pub fn mark_draining(&self) {
        self.ready.store(false, Ordering::Release);
    }
}
