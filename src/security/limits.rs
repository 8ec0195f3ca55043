//! Request processing limits.
//!
//! # Responsibilities
//! - Cap requests processed at once (throttle)
//!
//! # Design Decisions
//! - No queueing: requests over capacity are rejected immediately with 429
//! - Body size and handler time are bounded by tower-http's
//!   `RequestBodyLimitLayer` and `TimeoutLayer` in the server

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Semaphore;

use crate::http::response::ApiError;
use crate::observability::metrics;

/// Shared in-flight request budget.
#[derive(Debug, Clone)]
pub struct InFlightLimit {
    permits: Arc<Semaphore>,
    max: usize,
}

impl InFlightLimit {
    pub fn new(max: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

pub async fn in_flight_limit_middleware(
    State(limit): State<InFlightLimit>,
    request: Request,
    next: Next,
) -> Response {
    // Permit is held until the response is produced.
    let _permit = match limit.permits.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!(max = limit.max, "Server capacity exceeded");
            metrics::record_rejected("capacity");
            return ApiError::CapacityExceeded.into_response();
        }
    };
    next.run(request).await
}
