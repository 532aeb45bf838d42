//! Per-client admission control.

use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, trace};

use super::bucket::BucketConfig;
use super::metrics::{MetricsAggregator, MetricsSnapshot};
use super::store::BucketStore;

/// Outcome of evaluating one request against its client's bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A token was spent; the request may proceed
    Allowed {
        /// Tokens left after the debit
        tokens_remaining: u64,
    },
    /// No token was available
    Denied,
}

impl Decision {
    /// Whether the request may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// The admission filter shared by every request handler.
///
/// This struct is thread-safe and can be shared across multiple tasks.
pub struct RateLimiter {
    /// Per-client buckets
    store: BucketStore,
    /// Counters derived from admission decisions
    metrics: MetricsAggregator,
    /// Admissions hold this shared; `reset` holds it exclusively
    gate: RwLock<()>,
}

impl RateLimiter {
    /// Create a rate limiter with the default policy.
    pub fn new() -> Self {
        Self::with_config(BucketConfig::default())
    }

    /// Create a rate limiter with the given policy.
    pub fn with_config(config: BucketConfig) -> Self {
        Self {
            store: BucketStore::new(config),
            metrics: MetricsAggregator::new(),
            gate: RwLock::new(()),
        }
    }

    /// The bucket policy.
    pub fn config(&self) -> &BucketConfig {
        self.store.config()
    }

    /// Decide whether `client` may make a request now.
    pub fn admit(&self, client: &str) -> Decision {
        self.admit_at(client, Instant::now())
    }

    /// Decide whether `client` may make a request at `now`.
    ///
    /// Refill, check, debit and the metric update run while the client's
    /// bucket is locked.
    pub fn admit_at(&self, client: &str, now: Instant) -> Decision {
        let _gate = self.gate.read();

        trace!(client = %client, "Checking rate limit");

        self.store.with_bucket(client, now, |bucket, config| {
            let outcome = bucket.try_consume(config, now);

            if outcome.allowed {
                self.metrics.record_served(client);
                debug!(
                    client = %client,
                    tokens_remaining = outcome.tokens_remaining,
                    "Request served"
                );
                Decision::Allowed {
                    tokens_remaining: outcome.tokens_remaining,
                }
            } else {
                let total = self.metrics.record_rejected();
                info!(
                    client = %client,
                    rate_limit_triggered = total,
                    "Rate limit exceeded"
                );
                Decision::Denied
            }
        })
    }

    /// Current counters and the number of tracked clients.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let _gate = self.gate.read();
        self.metrics.snapshot(self.store.len())
    }

    /// Token balance for `client`, if it has a bucket.
    pub fn tokens(&self, client: &str) -> Option<u64> {
        self.store.tokens(client)
    }

    /// Drop every bucket and zero every counter.
    ///
    /// Test and administrative use only; never routed.
    pub fn reset(&self) {
        let _gate = self.gate.write();
        self.store.clear();
        self.metrics.clear();
        info!("Rate limiter state reset");
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new();
        assert_eq!(limiter.metrics_snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_burst_allowance() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.admit_at("192.168.1.2", now).is_allowed());
        }

        let snapshot = limiter.metrics_snapshot();
        assert_eq!(snapshot.requests_served["192.168.1.2"], 10);
        assert_eq!(snapshot.rate_limit_triggered, 0);
        assert_eq!(snapshot.active_buckets, 1);
    }

    #[test]
    fn test_overflow_rejection() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..10 {
            limiter.admit_at("192.168.1.3", now);
        }
        assert_eq!(limiter.admit_at("192.168.1.3", now), Decision::Denied);

        let snapshot = limiter.metrics_snapshot();
        assert_eq!(snapshot.requests_served["192.168.1.3"], 10);
        assert_eq!(snapshot.rate_limit_triggered, 1);
    }

    #[test]
    fn test_refill_grants_exactly_one() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        for _ in 0..10 {
            limiter.admit_at("192.168.1.4", start);
        }
        assert_eq!(limiter.admit_at("192.168.1.4", start), Decision::Denied);

        let later = start + Duration::from_millis(1200);
        assert_eq!(
            limiter.admit_at("192.168.1.4", later),
            Decision::Allowed { tokens_remaining: 0 }
        );
        assert_eq!(limiter.admit_at("192.168.1.4", later), Decision::Denied);
    }

    #[test]
    fn test_partial_interval_is_not_credited() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        for _ in 0..10 {
            limiter.admit_at("192.168.1.9", start);
        }

        let early = start + Duration::from_millis(900);
        assert_eq!(limiter.admit_at("192.168.1.9", early), Decision::Denied);
        assert_eq!(limiter.tokens("192.168.1.9"), Some(0));

        // The 900ms already elapsed still counts toward the next token.
        let full = start + Duration::from_millis(1000);
        assert!(limiter.admit_at("192.168.1.9", full).is_allowed());
    }

    #[test]
    fn test_clients_are_isolated() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.admit_at("192.168.1.5", now).is_allowed());
        }
        for _ in 0..10 {
            assert!(limiter.admit_at("192.168.1.6", now).is_allowed());
        }

        let snapshot = limiter.metrics_snapshot();
        assert_eq!(snapshot.requests_served["192.168.1.5"], 10);
        assert_eq!(snapshot.requests_served["192.168.1.6"], 10);
        assert_eq!(snapshot.rate_limit_triggered, 0);

        assert_eq!(limiter.admit_at("192.168.1.5", now), Decision::Denied);
        assert_eq!(limiter.admit_at("192.168.1.6", now), Decision::Denied);
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let limiter = RateLimiter::new();
        limiter.admit("a");
        limiter.admit("b");

        assert_eq!(limiter.metrics_snapshot(), limiter.metrics_snapshot());
    }

    #[test]
    fn test_reset_restores_full_capacity() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..11 {
            limiter.admit_at("a", now);
        }

        limiter.reset();
        assert_eq!(limiter.metrics_snapshot(), MetricsSnapshot::default());
        assert_eq!(limiter.tokens("a"), None);

        assert_eq!(
            limiter.admit_at("a", now),
            Decision::Allowed { tokens_remaining: 9 }
        );
    }

    #[test]
    fn test_concurrent_admissions_never_overspend() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        let allowed = AtomicU64::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..10 {
                        if limiter.admit_at("shared", now).is_allowed() {
                            allowed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        let snapshot = limiter.metrics_snapshot();
        assert_eq!(allowed.load(Ordering::Relaxed), 10);
        assert_eq!(snapshot.requests_served["shared"], 10);
        assert_eq!(snapshot.rate_limit_triggered, 70);
        assert_eq!(limiter.tokens("shared"), Some(0));
    }
}
