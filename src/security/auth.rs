//! Shared-secret bearer authentication.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::http::response::ApiError;
use crate::routing::Interceptor;

const BEARER_PREFIX: &str = "Bearer ";

/// The configured API key.
#[derive(Clone)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    pub fn new(key: &str) -> Self {
        Self(Arc::from(key))
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    Missing,
    MalformedPrefix,
    Mismatch,
}

impl AuthFailure {
    pub fn message(self) -> &'static str {
        match self {
            AuthFailure::Missing => "Missing API Key",
            AuthFailure::MalformedPrefix => "Invalid Authorization format.",
            AuthFailure::Mismatch => "Invalid API Key",
        }
    }
}

/// Check the `Authorization` header against `key` in constant time.
pub fn check_authorization(headers: &HeaderMap, key: &ApiKey) -> Result<(), AuthFailure> {
    let value = match headers.get(header::AUTHORIZATION) {
        None => return Err(AuthFailure::Missing),
        Some(value) if value.is_empty() => return Err(AuthFailure::Missing),
        Some(value) => value.to_str().map_err(|_| AuthFailure::MalformedPrefix)?,
    };

    let presented = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthFailure::MalformedPrefix)?;

    if bool::from(presented.as_bytes().ct_eq(key.0.as_bytes())) {
        Ok(())
    } else {
        Err(AuthFailure::Mismatch)
    }
}

pub async fn api_key_middleware(State(key): State<ApiKey>, request: Request, next: Next) -> Response {
    match check_authorization(request.headers(), &key) {
        Ok(()) => next.run(request).await,
        Err(failure) => {
            let remote = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            tracing::warn!(remote = %remote, reason = ?failure, "Rejected unauthenticated request");
            ApiError::Unauthorized(failure.message()).into_response()
        }
    }
}

/// Interceptor requiring `Authorization: Bearer <key>`.
pub fn require_api_key<S>(key: &str) -> Interceptor<S>
where
    S: Clone + Send + Sync + 'static,
{
    Interceptor::new(middleware::from_fn_with_state(ApiKey::new(key), api_key_middleware))
}
