//! OpenAPI document generation.
//!
//! The document is produced by [`openapi_document`] on demand, both for the
//! running server and for offline export from the CLI.

use ingestion_kernel::AppContext;
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::error::{ErrorBody, ErrorResponse};
use crate::health;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ingestion API",
        description = "Drone delivery ingestion service"
    ),
    components(schemas(ErrorResponse, ErrorBody)),
    tags(
        (name = "operations", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

/// Documented routes, still carrying their OpenAPI metadata.
pub fn api_router() -> OpenApiRouter<AppContext> {
    OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(health::healthz))
        .routes(routes!(health::readyz))
}

/// Build the OpenAPI document without starting a server.
pub fn openapi_document() -> utoipa::openapi::OpenApi {
    let (_, openapi) = api_router().split_for_parts();
    openapi
}
