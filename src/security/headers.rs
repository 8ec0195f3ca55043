//! Client address resolution and response security headers.
//!
//! # Responsibilities
//! - Resolve the real client IP behind proxies
//! - Build the CORS policy from configured origins
//! - Add `nosniff` / `DENY` response headers
//!
//! # Design Decisions
//! - Header precedence: True-Client-IP, X-Real-IP, first X-Forwarded-For entry
//! - Socket peer address is the fallback
//! - An origin of `*` switches CORS to allow-any

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::extract::{ConnectInfo, Request};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

const TRUE_CLIENT_IP: HeaderName = HeaderName::from_static("true-client-ip");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

fn header_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let text = |name: &HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

    text(&TRUE_CLIENT_IP)
        .or_else(|| text(&X_REAL_IP))
        .or_else(|| text(&X_FORWARDED_FOR).and_then(|v| v.split(',').next()))
        .and_then(|v| v.trim().parse().ok())
}

/// Best-effort client IP for `request`.
pub fn client_ip(request: &Request) -> Option<IpAddr> {
    header_ip(request.headers()).or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    })
}

pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                        None
                    }
                }),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(false)
        .max_age(Duration::from_secs(300))
}

pub fn nosniff_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"))
}

pub fn frame_deny_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"))
}
