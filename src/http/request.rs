//! Request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) as early as possible
//! - Decode JSON bodies under a fixed size ceiling
//!
//! # Design Decisions
//! - Request types opt into strict decoding with
//!   `#[serde(deny_unknown_fields)]`; every body type in this crate does
//! - Decode failures are rendered as error envelopes, never bare text

use axum::body::Body;
use axum::extract::{FromRequest, Request};
use axum::http::{header, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::response::ApiError;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Ceiling for a single decoded JSON body.
pub const MAX_JSON_BODY_BYTES: usize = 64 * 1024;

/// Issues a random UUID for every request that arrives without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of `request`, or `-` when none has been assigned.
pub fn request_id<B>(request: &axum::http::Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

/// Read at most [`MAX_JSON_BODY_BYTES`] from `body` and deserialize it.
pub async fn decode_json<T: DeserializeOwned>(body: Body) -> Result<T, ApiError> {
    let bytes = axum::body::to_bytes(body, MAX_JSON_BODY_BYTES)
        .await
        .map_err(|_| ApiError::PayloadTooLarge)?;

    serde_json::from_slice(&bytes).map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))
}

/// Extractor for strictly decoded JSON bodies.
#[derive(Debug, Clone)]
pub struct StrictJson<T>(pub T);

impl<T, S> FromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let declared = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > MAX_JSON_BODY_BYTES) {
            return Err(ApiError::PayloadTooLarge);
        }

        decode_json(req.into_body()).await.map(StrictJson)
    }
}
