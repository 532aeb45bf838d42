//! HTTP routes and the admission middleware.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::trace;

use super::rejection::RateLimited;
use crate::ratelimit::{ClientKey, Decision, MetricsSnapshot, RateLimiter};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The admission filter
    pub rate_limiter: Arc<RateLimiter>,
    /// Take the client address from `X-Forwarded-For`
    pub trust_proxy: bool,
    /// Directory of static assets served for unmatched paths
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    /// Create state around an existing rate limiter.
    pub fn new(rate_limiter: Arc<RateLimiter>, trust_proxy: bool) -> Self {
        Self {
            rate_limiter,
            trust_proxy,
            static_dir: None,
        }
    }

    /// Serve static assets from `dir` for unmatched paths.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }
}

/// Body of the protected data endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataResponse {
    pub message: String,
}

/// Path prefix covered by admission control.
pub const API_PREFIX: &str = "/api";
/// Metrics route, exempt from admission control.
pub const METRICS_PATH: &str = "/api/metrics";

/// Whether requests to `path` spend a token.
///
/// Every path under `/api`, matched or not, is protected except the metrics
/// route. Static assets outside `/api` are not.
pub fn is_protected(path: &str) -> bool {
    let under_api = path
        .strip_prefix(API_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
    under_api && path != METRICS_PATH
}

/// Build the application router.
///
/// The admission middleware wraps every route and the fallback, and lets
/// through anything [`is_protected`] rejects.
pub fn create_router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();

    let router = Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .route("/api/data", get(data_handler))
        .with_state(state.clone());

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(middleware::from_fn_with_state(state, admission_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Admit or reject the request based on its client's bucket.
pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !is_protected(request.uri().path()) {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = ClientKey::resolve(request.headers(), peer, state.trust_proxy);

    match state.rate_limiter.admit(client.as_str()) {
        Decision::Allowed { tokens_remaining } => {
            trace!(client = %client, tokens_remaining, "Forwarding request");
            next.run(request).await
        }
        Decision::Denied => {
            RateLimited::after(state.rate_limiter.config().refill_interval).into_response()
        }
    }
}

async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.rate_limiter.metrics_snapshot())
}

async fn data_handler() -> Json<DataResponse> {
    Json(DataResponse {
        message: "Success".to_string(),
    })
}
