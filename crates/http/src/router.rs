//! Router builder for the ingestion HTTP server

use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, Uri},
    middleware::{self, Next},
    response::Response,
    Router,
};
use ingestion_kernel::{settings::ApiDocsSettings, AppContext};
use ingestion_telemetry::RequestTelemetry;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::Uuid;

use crate::error::AppError;

/// Builder for constructing the main HTTP router.
///
/// Layers wrap every route added before them, so routes, docs and the
/// fallback go in first.
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Merge an already-stateful router.
    pub fn merge(mut self, router: Router) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Serve Swagger UI and the JSON document when enabled.
    pub fn with_api_docs(
        mut self,
        settings: &ApiDocsSettings,
        openapi: utoipa::openapi::OpenApi,
    ) -> Self {
        if !settings.enabled {
            tracing::info!("API documentation disabled");
            return self;
        }

        tracing::info!(
            ui = %settings.ui_path,
            spec = %settings.spec_path,
            "serving API documentation"
        );
        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new(settings.ui_path.clone())
                .url(settings.spec_path.clone(), openapi),
        );
        self
    }

    /// Answer unknown routes with the JSON error envelope.
    pub fn with_not_found_fallback(mut self) -> Self {
        self.router = self.router.fallback(not_found);
        self
    }

    /// Record one request telemetry item per handled request. Apply last so
    /// timeouts and short-circuited preflights are counted too.
    pub fn with_request_telemetry(mut self, ctx: AppContext) -> Self {
        self.router = self
            .router
            .layer(middleware::from_fn_with_state(ctx, track_requests));
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.router = self.router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
        self
    }

    /// Set `x-request-id` on requests lacking one and echo it on responses.
    pub fn with_request_id(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self
            .router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_millis(timeout_ms),
            ));
        self
    }

    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("no route for {}", uri.path()))
}

async fn track_requests(State(ctx): State<AppContext>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    ctx.telemetry().track_request(RequestTelemetry {
        method,
        path,
        status: response.status().as_u16(),
        duration: started.elapsed(),
    });
    response
}

/// Time-ordered request ids
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let request_id = Uuid::now_v7().to_string().parse::<HeaderValue>().ok()?;
        Some(RequestId::new(request_id))
    }
}
