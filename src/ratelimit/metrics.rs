//! Admission counters and their exported snapshot.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Point-in-time view of the admission counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Allowed requests per client
    pub requests_served: BTreeMap<String, u64>,
    /// Denied requests across all clients
    pub rate_limit_triggered: u64,
    /// Number of clients with a bucket
    pub active_buckets: usize,
}

/// Live counters updated on every admission decision.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    /// Allowed requests per client
    requests_served: DashMap<String, AtomicU64>,
    /// Denied requests across all clients
    rate_limit_triggered: AtomicU64,
}

impl MetricsAggregator {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one allowed request for `client`.
    pub fn record_served(&self, client: &str) -> u64 {
        if let Some(count) = self.requests_served.get(client) {
            return count.fetch_add(1, Ordering::Relaxed) + 1;
        }

        self.requests_served
            .entry(client.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed)
            + 1
    }

    /// Count one denied request. Returns the new global total.
    pub fn record_rejected(&self) -> u64 {
        self.rate_limit_triggered.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Allowed requests recorded for `client`.
    pub fn served(&self, client: &str) -> u64 {
        self.requests_served
            .get(client)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Denied requests across all clients.
    pub fn rate_limit_triggered(&self) -> u64 {
        self.rate_limit_triggered.load(Ordering::Relaxed)
    }

    /// Copy the counters into a snapshot.
    pub fn snapshot(&self, active_buckets: usize) -> MetricsSnapshot {
        let requests_served = self
            .requests_served
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();

        MetricsSnapshot {
            requests_served,
            rate_limit_triggered: self.rate_limit_triggered(),
            active_buckets,
        }
    }

    /// Zero every counter.
    pub fn clear(&self) {
        self.requests_served.clear();
        self.rate_limit_triggered.store(0, Ordering::Relaxed);
    }
}
