//! Application configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults
//! 2. optional TOML file
//! 3. `BASKT_`-prefixed environment variables, nested with `__`
//!    (e.g. `BASKT_RISK__MAX_LEVERAGE=5`)

use std::path::Path;
use std::time::Duration;

use baskt_pricing::FeeSkewConfig;
use baskt_risk::RiskCheckConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AdmissionError, AdmissionResult};

/// Query cache sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: u64,
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
}

fn default_cache_ttl_ms() -> u64 {
    5_000
}

fn default_cache_max_size() -> usize {
    1_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_cache_ttl_ms(),
            max_size: default_cache_max_size(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Stream consumer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    #[serde(default = "default_consumer_group")]
    pub group: String,
    /// Unique per process within the group.
    #[serde(default = "default_instance_id")]
    pub instance_id: String,
}

fn default_consumer_group() -> String {
    "risk-admission".to_string()
}

fn default_instance_id() -> String {
    format!("risk-{}", &Uuid::new_v4().to_string()[..8])
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group: default_consumer_group(),
            instance_id: default_instance_id(),
        }
    }
}

/// Querier collaborator endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerierConfig {
    /// REST base URL. Without one the in-process querier is used.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_querier_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_querier_timeout_ms() -> u64 {
    5_000
}

impl Default for QuerierConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_querier_timeout_ms(),
        }
    }
}

impl QuerierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub risk: RiskCheckConfig,
    #[serde(default)]
    pub fee_skew: FeeSkewConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
    #[serde(default)]
    pub querier: QuerierConfig,
}

impl AppConfig {
    /// Load defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&str>) -> AdmissionResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !Path::new(path).exists() {
                return Err(AdmissionError::Config(format!(
                    "config file not found: {path}"
                )));
            }
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("BASKT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AdmissionError::Config(format!("Failed to load config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file only, ignoring the environment.
    pub fn from_file(path: &str) -> AdmissionResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AdmissionError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AdmissionError::Config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AdmissionResult<()> {
        if self.cache.ttl_ms == 0 || self.cache.max_size == 0 {
            return Err(AdmissionError::Config(
                "cache ttl_ms and max_size must be positive".to_string(),
            ));
        }
        if self.consumer.group.is_empty() || self.consumer.instance_id.is_empty() {
            return Err(AdmissionError::Config(
                "consumer group and instance_id must not be empty".to_string(),
            ));
        }
        if let Some(url) = &self.querier.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AdmissionError::Config(format!(
                    "querier base_url must be http(s), got {url}"
                )));
            }
        }
        self.risk
            .validate()
            .map_err(|e| AdmissionError::Config(e.to_string()))?;
        self.fee_skew
            .validate()
            .map_err(|e| AdmissionError::Config(e.to_string()))?;
        Ok(())
    }
}
