//! Liveness endpoint.

use axum::response::Response;
use serde::Serialize;

use crate::http::response::ok;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

pub async fn health_check() -> Response {
    ok(HealthStatus { status: "healthy" })
}
