//! Liveness and readiness endpoints.

use axum::{extract::State, Json};
use ingestion_kernel::AppContext;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Readiness report with the service identity taken from bound configuration.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadinessStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub environment: String,
    pub telemetry_configured: bool,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "operations",
    responses(
        (status = 200, description = "Process is alive", body = String, content_type = "text/plain")
    )
)]
pub async fn healthz() -> &'static str {
    "ok"
}

/// Readiness probe
#[utoipa::path(
    get,
    path = "/readyz",
    tag = "operations",
    responses(
        (status = 200, description = "Ready to accept traffic", body = ReadinessStatus),
        (status = 503, description = "Starting up or draining", body = crate::error::ErrorResponse)
    )
)]
pub async fn readyz(State(ctx): State<AppContext>) -> Result<Json<ReadinessStatus>, AppError> {
    if !ctx.is_ready() {
        return Err(AppError::unavailable("service is not accepting traffic"));
    }

    let properties = ctx.properties();
    Ok(Json(ReadinessStatus {
        status: "ready".to_string(),
        service: properties.application.name.clone(),
        version: properties.application.version.clone(),
        environment: properties.environment.to_string(),
        telemetry_configured: ctx.telemetry().is_configured(),
    }))
}
