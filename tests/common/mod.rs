//! Shared fixtures for integration tests.

#![allow(dead_code)]

use api_backend::config::AppConfig;
use api_backend::database::SqliteDb;
use api_backend::{AppState, HttpServer, RoutingContext};
use axum::body::Body;
use axum::http::{Request, Response};
use serde_json::Value;
use tempfile::TempDir;

pub const TEST_API_KEY: &str = "test-api-key";

/// A server backed by a throwaway database.
pub struct TestApp {
    pub server: HttpServer,
    pub db: SqliteDb,
    _dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.path = dir.path().join("api.db").to_string_lossy().into_owned();
    config.database.timeout_secs = 5;
    config.api.key = TEST_API_KEY.to_string();
    config.server.allowed_origins = vec!["https://example.com".to_string()];
    config.server.rate_limit.per_ip_limit = 1000;
    config
}

pub async fn spawn_app(context: RoutingContext<AppState>) -> TestApp {
    spawn_app_with(context, |_| {}).await
}

pub async fn spawn_app_with<F>(context: RoutingContext<AppState>, tweak: F) -> TestApp
where
    F: FnOnce(&mut AppConfig),
{
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    tweak(&mut config);

    let db = SqliteDb::connect(&config.database).await.unwrap();
    let server = HttpServer::new(AppState::new(config, db.clone()), context).unwrap();

    TestApp {
        server,
        db,
        _dir: dir,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
