use std::fs;
use std::sync::Arc;

use ingestion_app::{bootstrap, ApplicationProperties, Environment};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn local_properties() -> ApplicationProperties {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("base.toml"),
        r#"
            [server]
            host = "127.0.0.1"
            port = 0

            [application]
            name = "ingestion-smoke"
        "#,
    )
    .unwrap();
    ApplicationProperties::load_from(dir.path(), Environment::Local).unwrap()
}

async fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn default_configuration_starts_and_serves() {
    let app = bootstrap(local_properties()).await.unwrap();
    let addr = app.local_addr().unwrap();
    let ctx = app.context().clone();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(app.run_until(async move {
        let _ = rx.await;
    }));

    let health = http_get(addr, "/healthz").await;
    assert!(health.starts_with("HTTP/1.1 200"), "{health}");
    assert!(health.ends_with("ok"), "{health}");

    let ready = http_get(addr, "/readyz").await;
    assert!(ready.starts_with("HTTP/1.1 200"), "{ready}");
    assert!(ready.contains("\"service\":\"ingestion-smoke\""), "{ready}");

    tx.send(()).unwrap();
    server.await.unwrap().unwrap();

    assert_eq!(ctx.properties().application.name, "ingestion-smoke");
    assert_eq!(ctx.telemetry().stats().requests, 2);
}

#[tokio::test]
async fn one_telemetry_client_per_context() {
    let app = bootstrap(local_properties()).await.unwrap();
    let first = Arc::clone(app.context().telemetry());
    let second = Arc::clone(app.context().clone().telemetry());
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn invalid_properties_fail_bootstrap() {
    let mut properties = local_properties();
    properties.environment = Environment::Production;
    properties.server.port = 18080;
    let err = bootstrap(properties).await.err().unwrap();
    assert!(format!("{err:#}").contains("telemetry.connection_string"));
}
