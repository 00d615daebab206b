//! Ingestion service bootstrap.
//!
//! Binds [`ApplicationProperties`], installs logging, builds the single
//! [`AppContext`] (and with it the shared telemetry client), then serves the
//! HTTP runtime until a shutdown signal arrives.

use anyhow::Context;

pub use ingestion_http::{openapi_document, Application};
pub use ingestion_kernel::{AppContext, ApplicationProperties, Environment};
pub use ingestion_telemetry::TelemetryClient;

/// Validate properties, build the context and bind the listener.
pub async fn bootstrap(properties: ApplicationProperties) -> anyhow::Result<Application> {
    properties
        .validate()
        .context("invalid application properties")?;

    tracing::info!(
        env = %properties.environment,
        service = %properties.application.name,
        address = %properties.server.bind_address(),
        "ingestion bootstrap starting"
    );

    let ctx = AppContext::new(properties).context("failed to build application context")?;
    let app = Application::bind(ctx).await?;

    tracing::info!("ingestion bootstrap complete");
    Ok(app)
}

/// Run the service until Ctrl+C or SIGTERM, then flush telemetry exporters.
pub async fn run(properties: ApplicationProperties) -> anyhow::Result<()> {
    let logging = ingestion_telemetry::logging::init(&properties.logging_config())?;
    tracing::info!(otlp = logging.exports_traces(), "logging initialised");

    let result = match bootstrap(properties).await {
        Ok(app) => app.run().await,
        Err(err) => Err(err),
    };

    if let Err(err) = &result {
        tracing::error!(error = %format!("{err:#}"), "ingestion service failed");
    }
    logging
        .shutdown()
        .context("failed to flush telemetry exporters")?;
    result
}
