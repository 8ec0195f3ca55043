//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Materialize feature module routes into the Axum router
//! - Wire up global middleware (request ID, tracing, limits, CORS)
//! - Bind server to listener and shut down gracefully
//! - Purge expired rate-limit windows in the background
//!
//! # Design Decisions
//! - Every rejection produced here is a JSON envelope
//! - Layer order, outermost first: request ID, trace, panic recovery,
//!   metrics, envelope rewrite, body ceiling, timeout, throttle, rate limit,
//!   CORS, security headers

use std::any::Any;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::database::SqliteDb;
use crate::http::request::{request_id, UuidRequestId};
use crate::http::response::ApiError;
use crate::lifecycle::{build_dispatcher, StartupError};
use crate::observability::metrics;
use crate::routing::RoutingContext;
use crate::security::headers::{cors_layer, frame_deny_layer, nosniff_layer};
use crate::security::limits::{in_flight_limit_middleware, InFlightLimit};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: SqliteDb,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, db: SqliteDb) -> Self {
        Self {
            config: Arc::new(config),
            db,
            started_at: Instant::now(),
        }
    }
}

/// HTTP server for the API.
pub struct HttpServer {
    router: Router,
    listing: String,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Build the router from every feature module in `context`.
    pub fn new(state: AppState, context: RoutingContext<AppState>) -> Result<Self, StartupError> {
        let (routes, listing) = build_dispatcher(&context, &state.config)?;
        let limiter = Arc::new(RateLimiter::new(&state.config.server.rate_limit));
        let router = Self::build_router(routes, &state.config, limiter.clone()).with_state(state);

        Ok(Self {
            router,
            listing,
            limiter,
        })
    }

    /// Apply the global middleware stack. The last layer added runs first.
    fn build_router(routes: Router<AppState>, config: &AppConfig, limiter: Arc<RateLimiter>) -> Router<AppState> {
        let server = &config.server;

        routes
            .fallback(not_found)
            .layer(frame_deny_layer())
            .layer(nosniff_layer())
            .layer(cors_layer(&server.allowed_origins))
            .layer(from_fn_with_state(limiter, rate_limit_middleware))
            .layer(from_fn_with_state(
                InFlightLimit::new(server.connections_limit),
                in_flight_limit_middleware,
            ))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                server.handler_timeout(),
            ))
            .layer(RequestBodyLimitLayer::new(server.request_size_limit))
            .layer(from_fn(envelope_bare_errors))
            .layer(from_fn(metrics::track_metrics))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The fully layered router, ready to serve.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Route listing printed at startup.
    pub fn route_listing(&self) -> &str {
        &self.listing
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Serve on `listener` until a value arrives on `shutdown`.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let purge = spawn_window_purge(self.limiter.clone());
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Stopped accepting connections, draining in-flight requests");
            })
            .await;

        purge.abort();
        tracing::info!("HTTP server stopped");
        result
    }
}

fn spawn_window_purge(limiter: Arc<RateLimiter>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(limiter.interval());
        // First tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            limiter.purge_expired();
            tracing::debug!(clients = limiter.tracked_clients(), "Purged expired rate limit windows");
        }
    })
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Give bare error responses from the router and the tower-http limits an
/// envelope body. Status and headers are kept.
async fn envelope_bare_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if is_json {
        return response;
    }

    let error = match response.status() {
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::METHOD_NOT_ALLOWED => ApiError::MethodNotAllowed,
        StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::warn!("Request body too large");
            metrics::record_rejected("body_size");
            ApiError::PayloadTooLarge
        }
        StatusCode::GATEWAY_TIMEOUT => {
            tracing::warn!("Handler timed out");
            metrics::record_rejected("timeout");
            ApiError::Timeout
        }
        _ => return response,
    };

    let (mut parts, _) = response.into_parts();
    let (_, body) = error.into_response().into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, body)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else {
        "unknown panic payload".to_owned()
    };
    metrics::record_rejected("panic");
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}
