//! Configuration management
//!
//! TOML configuration with environment variable overrides and defaults for
//! every field. The storage section describes the tier layout handed to the
//! planner:
//!
//! ```toml
//! [storage]
//! raw_resident_span = 7200
//! raw_chunk_span = 600
//!
//! [[storage.tiers]]
//! interval = 300
//! chunk_span = 3600
//! resident_chunks = 6
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result, ValidationError};
use crate::types::{TierDescriptor, TierSet};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Storage tier layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Query planning and execution
    #[serde(default)]
    pub query: QueryConfig,

    /// Ingestion lag tracking
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Monitoring and observability
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Span of raw data kept in memory, in seconds
    #[serde(default = "default_raw_resident_span")]
    pub raw_resident_span: u32,

    /// Span of a raw chunk in seconds
    #[serde(default = "default_raw_chunk_span")]
    pub raw_chunk_span: u32,

    /// Rollup tiers, ascending by interval
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierDescriptor>,
}

/// Query configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Series fetched concurrently per batch
    #[serde(default = "default_max_parallel_fetches")]
    pub max_parallel_fetches: usize,

    /// Lower point bound applied when a request gives none
    #[serde(default = "default_min_points")]
    pub default_min_points: u32,

    /// Upper point bound applied when a request gives none
    #[serde(default = "default_max_points")]
    pub default_max_points: u32,

    /// Lag priority above which results are flagged (unset = never)
    #[serde(default)]
    pub lag_priority_threshold: Option<i64>,
}

/// Ingestion configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// Lag measurements kept per partition
    #[serde(default = "default_lag_window")]
    pub lag_window: usize,

    /// Partitions consumed by this node
    #[serde(default = "default_partitions")]
    pub partitions: Vec<i32>,
}

/// Monitoring configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

// Default value functions
fn default_raw_resident_span() -> u32 { 7200 }
fn default_raw_chunk_span() -> u32 { 600 }
fn default_tiers() -> Vec<TierDescriptor> {
    vec![
        TierDescriptor::new(300, 3600, 6),
        TierDescriptor::new(3600, 21600, 4),
    ]
}
fn default_max_parallel_fetches() -> usize { 16 }
fn default_min_points() -> u32 { 1 }
fn default_max_points() -> u32 { 800 }
fn default_lag_window() -> usize { 5 }
fn default_partitions() -> Vec<i32> { vec![0] }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            raw_resident_span: default_raw_resident_span(),
            raw_chunk_span: default_raw_chunk_span(),
            tiers: default_tiers(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_parallel_fetches: default_max_parallel_fetches(),
            default_min_points: default_min_points(),
            default_max_points: default_max_points(),
            lag_priority_threshold: None,
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            lag_window: default_lag_window(),
            partitions: default_partitions(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // Storage
        if let Ok(span) = std::env::var("ROLLUP_RAW_RESIDENT_SPAN") {
            if let Ok(s) = span.parse() {
                self.storage.raw_resident_span = s;
            }
        }

        // Query
        if let Ok(fetches) = std::env::var("ROLLUP_MAX_PARALLEL_FETCHES") {
            if let Ok(f) = fetches.parse() {
                self.query.max_parallel_fetches = f;
            }
        }

        // Monitoring
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.monitoring.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.storage.raw_chunk_span == 0 {
            return Err(ValidationError::Failed("raw_chunk_span must be > 0".to_string()));
        }

        let mut previous = 0;
        for (i, tier) in self.storage.tiers.iter().enumerate() {
            let field = format!("storage.tiers[{}]", i);
            if tier.interval == 0 {
                return Err(ValidationError::InvalidFormat {
                    field,
                    message: "interval must be > 0".to_string(),
                });
            }
            if tier.interval <= previous {
                return Err(ValidationError::InvalidFormat {
                    field,
                    message: format!(
                        "interval {} must be greater than the previous tier's {}",
                        tier.interval, previous
                    ),
                });
            }
            if tier.chunk_span == 0 || tier.chunk_span % tier.interval != 0 {
                return Err(ValidationError::InvalidFormat {
                    field,
                    message: format!(
                        "chunk_span {} must be a non-zero multiple of interval {}",
                        tier.chunk_span, tier.interval
                    ),
                });
            }
            if tier.resident_chunks == 0 {
                return Err(ValidationError::InvalidFormat {
                    field,
                    message: "resident_chunks must be > 0".to_string(),
                });
            }
            previous = tier.interval;
        }

        if self.query.max_parallel_fetches == 0 {
            return Err(ValidationError::OutOfRange {
                field: "query.max_parallel_fetches".to_string(),
                value: "0".to_string(),
                min: "1".to_string(),
                max: usize::MAX.to_string(),
            });
        }
        if self.query.default_max_points == 0
            || self.query.default_min_points > self.query.default_max_points
        {
            return Err(ValidationError::Failed(format!(
                "default point budget {}-{} is invalid",
                self.query.default_min_points, self.query.default_max_points
            )));
        }
        if let Some(threshold) = self.query.lag_priority_threshold {
            if threshold < 0 {
                return Err(ValidationError::OutOfRange {
                    field: "query.lag_priority_threshold".to_string(),
                    value: threshold.to_string(),
                    min: "0".to_string(),
                    max: i64::MAX.to_string(),
                });
            }
        }

        if self.ingestion.lag_window == 0 {
            return Err(ValidationError::Failed("lag_window must be > 0".to_string()));
        }

        Ok(())
    }

    /// Tier set handed to the planner
    pub fn tier_set(&self) -> TierSet {
        TierSet::new(self.storage.raw_resident_span, self.storage.tiers.clone())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
