//! Sharded store of per-client token buckets.

use std::time::Instant;

use dashmap::DashMap;
use tracing::debug;

use super::bucket::{BucketConfig, TokenBucket};

/// Owns every client's bucket.
///
/// Buckets are only reachable through [`BucketStore::with_bucket`], which runs
/// the caller's closure while holding the bucket's shard lock. Clients that
/// hash to different shards never contend.
pub struct BucketStore {
    /// Buckets indexed by client identifier
    buckets: DashMap<String, TokenBucket>,
    /// Policy used when creating new buckets
    config: BucketConfig,
}

impl BucketStore {
    /// Create an empty store.
    pub fn new(config: BucketConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
        }
    }

    /// The bucket policy.
    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    /// Run `f` against the bucket for `client`, creating a full one if absent.
    ///
    /// The lookup, creation and everything `f` does happen under one lock,
    /// so concurrent callers for the same client are serialized.
    pub fn with_bucket<F, T>(&self, client: &str, now: Instant, f: F) -> T
    where
        F: FnOnce(&mut TokenBucket, &BucketConfig) -> T,
    {
        let mut bucket = match self.buckets.get_mut(client) {
            Some(bucket) => bucket,
            None => self
                .buckets
                .entry(client.to_string())
                .or_insert_with(|| {
                    debug!(
                        client = %client,
                        capacity = self.config.capacity,
                        "Creating new token bucket"
                    );
                    TokenBucket::new(&self.config, now)
                }),
        };

        f(bucket.value_mut(), &self.config)
    }

    /// Token balance for `client`, if a bucket exists.
    pub fn tokens(&self, client: &str) -> Option<u64> {
        self.buckets.get(client).map(|b| b.tokens())
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no client has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop every bucket.
    ///
    /// Test and administrative use only.
    pub fn clear(&self) {
        self.buckets.clear();
    }
}
