//! The response sent when a client has no tokens left.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Error category reported for rate-limited requests.
pub const RATE_LIMIT_ERROR: &str = "Too Many Requests";
/// Human-readable explanation for rate-limited requests.
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// JSON body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error category
    pub error: String,
    /// Human-readable explanation
    pub message: String,
}

/// 429 response with a `Retry-After` hint.
#[derive(Debug, Clone, Copy)]
pub struct RateLimited {
    /// Seconds the client should wait before retrying
    retry_after_secs: u64,
}

impl RateLimited {
    /// Build a rejection that suggests retrying after one refill interval.
    pub fn after(interval: Duration) -> Self {
        let mut secs = interval.as_secs();
        if interval.subsec_nanos() > 0 {
            secs += 1;
        }
        Self {
            retry_after_secs: secs.max(1),
        }
    }

    /// Seconds the client should wait before retrying.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after_secs
    }
}

impl IntoResponse for RateLimited {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: RATE_LIMIT_ERROR.to_string(),
            message: RATE_LIMIT_MESSAGE.to_string(),
        };

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(self.retry_after_secs));
        response
    }
}
