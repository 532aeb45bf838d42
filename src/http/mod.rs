//! HTTP front end for the admission filter.

mod rejection;
mod server;
mod service;

pub use rejection::{ErrorBody, RateLimited, RATE_LIMIT_ERROR, RATE_LIMIT_MESSAGE};
pub use server::HttpServer;
pub use service::{admission_middleware, create_router, AppState, DataResponse};
