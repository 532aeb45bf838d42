//! Configuration management for Bucketgate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{BucketgateError, Result};
use crate::ratelimit::{
    BucketConfig, DEFAULT_CAPACITY, DEFAULT_REFILL_INTERVAL, DEFAULT_REFILL_RATE,
};

/// Prefix for environment variable overrides, e.g. `BUCKETGATE__SERVER__HTTP_ADDR`.
pub const ENV_PREFIX: &str = "BUCKETGATE";

/// Main configuration for the Bucketgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,

    /// Take the client address from `X-Forwarded-For`
    #[serde(default = "default_trust_proxy")]
    pub trust_proxy: bool,

    /// Directory of static assets served for unmatched paths
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            trust_proxy: default_trust_proxy(),
            static_dir: None,
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_trust_proxy() -> bool {
    true
}

/// Token bucket policy applied to every protected route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Maximum tokens per client (burst size)
    #[serde(default = "default_capacity")]
    pub capacity: u64,

    /// Tokens credited per refill interval
    #[serde(default = "default_refill_rate")]
    pub refill_rate: u64,

    /// Refill interval in milliseconds
    #[serde(default = "default_refill_interval_ms")]
    pub refill_interval_ms: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            refill_rate: default_refill_rate(),
            refill_interval_ms: default_refill_interval_ms(),
        }
    }
}

fn default_capacity() -> u64 {
    DEFAULT_CAPACITY
}

fn default_refill_rate() -> u64 {
    DEFAULT_REFILL_RATE
}

fn default_refill_interval_ms() -> u64 {
    DEFAULT_REFILL_INTERVAL.as_millis() as u64
}

impl RateLimitingConfig {
    /// Validate and convert into the bucket policy.
    pub fn bucket_config(&self) -> Result<BucketConfig> {
        if self.capacity == 0 {
            return Err(BucketgateError::Config(
                "rate_limiting.capacity must be at least 1".to_string(),
            ));
        }
        if self.refill_rate == 0 {
            return Err(BucketgateError::Config(
                "rate_limiting.refill_rate must be at least 1".to_string(),
            ));
        }
        if self.refill_interval_ms == 0 {
            return Err(BucketgateError::Config(
                "rate_limiting.refill_interval_ms must be at least 1".to_string(),
            ));
        }

        Ok(BucketConfig::new(
            self.capacity,
            self.refill_rate,
            Duration::from_millis(self.refill_interval_ms),
        ))
    }
}

impl BucketgateConfig {
    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| BucketgateError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Layer defaults, an optional YAML file and `BUCKETGATE__*` environment
    /// variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    /// Like [`load`](Self::load), reading environment overrides named
    /// `<prefix>__SECTION__FIELD`.
    pub fn load_with_env_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(
                config::File::from(path).format(config::FileFormat::Yaml),
            );
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Apply command-line and `PORT` overrides to the listen address.
    ///
    /// An explicit `http_addr` wins; otherwise `port` replaces only the port
    /// of the configured address.
    pub fn apply_listen_overrides(
        &mut self,
        http_addr: Option<SocketAddr>,
        port: Option<&str>,
    ) -> Result<()> {
        match (http_addr, port) {
            (Some(addr), _) => self.server.http_addr = addr,
            (None, Some(port)) => {
                let port: u16 = port.trim().parse().map_err(|e| {
                    BucketgateError::Config(format!("Invalid PORT {:?}: {}", port, e))
                })?;
                self.server.http_addr.set_port(port);
            }
            (None, None) => {}
        }
        Ok(())
    }
}
