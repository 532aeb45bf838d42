//! Token bucket admission control and state management.

mod bucket;
mod client;
mod limiter;
mod metrics;
mod store;

pub use bucket::{
    BucketConfig, ConsumeOutcome, TokenBucket, DEFAULT_CAPACITY, DEFAULT_REFILL_INTERVAL,
    DEFAULT_REFILL_RATE,
};
pub use client::{ClientKey, FORWARDED_FOR, UNKNOWN_CLIENT};
pub use limiter::{Decision, RateLimiter};
pub use metrics::{MetricsAggregator, MetricsSnapshot};
pub use store::BucketStore;
