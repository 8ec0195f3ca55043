use axum::extract::State;
use axum::response::Response;
use serde::Serialize;

use crate::http::response::{ok, ApiError};
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub status: &'static str,
    pub wal_mode: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Response {
    ok(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn get_database(State(state): State<AppState>) -> Result<Response, ApiError> {
    state
        .db
        .ping()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(ok(DatabaseStatus {
        status: "reachable",
        wal_mode: state.config.database.wal_mode,
    }))
}
