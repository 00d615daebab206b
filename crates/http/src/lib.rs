//! HTTP runtime for the ingestion service with Axum, error handling, and OpenAPI support.

use std::future::Future;
use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use ingestion_kernel::AppContext;
use tokio::net::TcpListener;

pub mod docs;
pub mod error;
pub mod health;
pub mod router;

pub use docs::openapi_document;
use router::RouterBuilder;

/// A bound HTTP server, ready to serve.
pub struct Application {
    ctx: AppContext,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the router and bind the configured address.
    pub async fn bind(ctx: AppContext) -> anyhow::Result<Self> {
        let address = ctx.properties().server.bind_address();
        let router = build_router(&ctx);

        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("failed to bind to address {address}"))?;

        Ok(Self {
            ctx,
            listener,
            router,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to read listener address")
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then drain and flush telemetry.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self {
            ctx,
            listener,
            router,
        } = self;
        let addr = listener
            .local_addr()
            .context("failed to read listener address")?;

        tracing::info!(address = %addr, "HTTP server listening on http://{}", addr);
        ctx.mark_ready();
        ctx.telemetry().track_event(
            "ApplicationStarted",
            &[("environment", ctx.properties().environment.as_str())],
        );

        let draining = ctx.clone();
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                draining.mark_draining();
                tracing::info!("shutdown requested; draining connections");
            })
            .await
            .context("HTTP server failed");

        if let Err(err) = &result {
            let error: &(dyn std::error::Error + 'static) = err.as_ref();
            ctx.telemetry().track_exception(error);
        }
        ctx.telemetry().track_event("ApplicationStopped", &[]);
        ctx.telemetry().flush();
        tracing::info!("HTTP server stopped");

        result
    }
}

/// Build the main HTTP router with operational routes, docs and middleware.
pub fn build_router(ctx: &AppContext) -> Router {
    let properties = ctx.properties();
    let (routes, openapi) = docs::api_router().split_for_parts();

    RouterBuilder::new()
        .merge(routes.with_state(ctx.clone()))
        .with_api_docs(&properties.api_docs, openapi)
        .with_not_found_fallback()
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(properties.server.request_timeout_ms)
        .with_request_telemetry(ctx.clone())
        .build()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use health::ReadinessStatus;
    use ingestion_kernel::ApplicationProperties;
    use tower::ServiceExt;

    fn context() -> AppContext {
        let mut properties = ApplicationProperties::default();
        properties.server.host = "127.0.0.1".to_string();
        properties.server.port = 0;
        AppContext::new(properties).unwrap()
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let (status, body) = get(build_router(&context()), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn readyz_is_unavailable_until_marked_ready() {
        let ctx = context();
        let (status, _) = get(build_router(&ctx), "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        ctx.mark_ready();
        let (status, body) = get(build_router(&ctx), "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        let report: ReadinessStatus = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.status, "ready");
        assert_eq!(report.service, "ingestion");
        assert_eq!(report.environment, "local");
        assert!(!report.telemetry_configured);
    }

    #[tokio::test]
    async fn openapi_json_is_served() {
        let (status, body) = get(build_router(&context()), "/api-docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(doc["info"]["title"], "Ingestion API");
        assert!(doc["paths"].get("/healthz").is_some());
    }

    #[tokio::test]
    async fn requests_are_tracked_on_shared_client() {
        let ctx = context();
        let router = build_router(&ctx);
        get(router.clone(), "/healthz").await;
        get(router, "/does-not-exist").await;
        assert_eq!(ctx.telemetry().stats().requests, 2);
    }

    #[tokio::test]
    async fn cors_preflight_is_tracked() {
        let ctx = context();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/healthz")
            .header("origin", "https://example.com")
            .header("access-control-request-method", "GET")
            .body(Body::empty())
            .unwrap();
        let response = build_router(&ctx).oneshot(request).await.unwrap();
        assert!(response.status().is_success());
        assert_eq!(ctx.telemetry().stats().requests, 1);
    }

    #[test]
    fn documented_routes_are_the_reserved_operational_paths() {
        let doc = openapi_document();
        let mut documented: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        documented.sort_unstable();
        let mut reserved = ingestion_kernel::settings::OPERATIONAL_PATHS.to_vec();
        reserved.sort_unstable();
        assert_eq!(documented, reserved);
    }

    #[tokio::test]
    async fn run_until_stops_and_flushes() {
        let app = Application::bind(context()).await.unwrap();
        assert_ne!(app.local_addr().unwrap().port(), 0);
        let ctx = app.context().clone();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(app.run_until(async move {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();

        assert!(!ctx.is_ready());
        let stats = ctx.telemetry().stats();
        assert_eq!(stats.events, 2);
        assert_eq!(stats.flushes, 1);
    }
}
