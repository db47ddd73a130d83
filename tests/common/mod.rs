//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tokio::net::TcpListener;

use dispatch_engine::config::StaticRouteConfig;
use dispatch_engine::{demo, Engine, EngineConfig, HttpServer, RegistryBuilder, Shutdown};

/// The sample application built against `config`.
pub fn demo_engine(config: &EngineConfig) -> Arc<Engine> {
    let mut builder = RegistryBuilder::new();
    demo::register(&mut builder);
    Arc::new(builder.build(config).unwrap())
}

/// Fully layered router over the sample application.
pub fn demo_router(config: &EngineConfig) -> Router {
    HttpServer::new(config, demo_engine(config)).router()
}

/// `public/index.html` and `public/docs/` inside a temp dir, mapped at `/assets/`.
pub fn static_fixture(config: &mut EngineConfig) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");
    std::fs::create_dir_all(public.join("docs")).unwrap();
    std::fs::write(public.join("index.html"), "<h1>home</h1>").unwrap();
    std::fs::write(public.join("docs").join("index.html"), "<h1>docs</h1>").unwrap();

    config.static_routes.push(StaticRouteConfig {
        verb: "GET".into(),
        path: "/assets/".into(),
        target: format!("staticDir:{}", public.display()),
    });
    dir
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post(uri: &str, content_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Serve the sample application on an ephemeral port.
pub async fn start_server(config: EngineConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(&config, demo_engine(&config)).with_shutdown(shutdown.clone());
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}
