//! Bucketgate - Per-Client Admission Control
//!
//! This crate implements a token bucket rate limiter that sits in front of an
//! HTTP request pipeline. Each client identifier gets its own lazily refilled
//! bucket; requests without a token are rejected with `429 Too Many Requests`.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
