//! Token bucket state and the lazy refill/consume arithmetic.

use std::time::{Duration, Instant};

/// Default burst size.
pub const DEFAULT_CAPACITY: u64 = 10;
/// Default number of tokens credited per refill interval.
pub const DEFAULT_REFILL_RATE: u64 = 1;
/// Default refill interval.
pub const DEFAULT_REFILL_INTERVAL: Duration = Duration::from_millis(1000);

/// Global bucket policy applied to every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketConfig {
    /// Maximum tokens a bucket can hold
    pub capacity: u64,
    /// Tokens credited per `refill_interval`
    pub refill_rate: u64,
    /// Time unit over which `refill_rate` applies
    pub refill_interval: Duration,
}

impl BucketConfig {
    /// Create a new bucket policy.
    pub fn new(capacity: u64, refill_rate: u64, refill_interval: Duration) -> Self {
        Self {
            capacity,
            refill_rate,
            refill_interval,
        }
    }

    /// Whole tokens earned over `elapsed`, rounded down.
    ///
    /// A partial interval earns nothing; 1.9 intervals at one token per
    /// interval earn exactly one token.
    pub fn tokens_for(&self, elapsed: Duration) -> u64 {
        let interval = self.refill_interval.as_nanos();
        if interval == 0 {
            return self.capacity;
        }
        let earned = elapsed.as_nanos() * u128::from(self.refill_rate) / interval;
        u64::try_from(earned).unwrap_or(u64::MAX)
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            refill_rate: DEFAULT_REFILL_RATE,
            refill_interval: DEFAULT_REFILL_INTERVAL,
        }
    }
}

/// Result of a single consume attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOutcome {
    /// Whether a token was debited
    pub allowed: bool,
    /// Tokens left in the bucket after the attempt
    pub tokens_remaining: u64,
}

/// Per-client token bucket.
///
/// Tokens stay within `[0, capacity]`. The bucket is refilled lazily on each
/// consume attempt rather than by a background timer.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Current token balance
    tokens: u64,
    /// When tokens were last credited
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(config: &BucketConfig, now: Instant) -> Self {
        Self {
            tokens: config.capacity,
            last_refill: now,
        }
    }

    /// Current token balance.
    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    /// When tokens were last credited.
    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }

    /// Credit whole tokens earned since the last refill.
    ///
    /// `last_refill` only advances when at least one token is credited, so
    /// partial intervals keep accumulating. A `now` earlier than
    /// `last_refill` counts as zero elapsed time.
    pub fn refill(&mut self, config: &BucketConfig, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let tokens_to_add = config.tokens_for(elapsed);

        if tokens_to_add > 0 {
            self.tokens = self.tokens.saturating_add(tokens_to_add).min(config.capacity);
            self.last_refill = now;
        }
    }

    /// Refill, then debit one token if available.
    pub fn try_consume(&mut self, config: &BucketConfig, now: Instant) -> ConsumeOutcome {
        self.refill(config, now);

        if self.tokens >= 1 {
            self.tokens -= 1;
            ConsumeOutcome {
                allowed: true,
                tokens_remaining: self.tokens,
            }
        } else {
            ConsumeOutcome {
                allowed: false,
                tokens_remaining: self.tokens,
            }
        }
    }
}
