//! Configuration management for the Warehouse Stock Management Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with WSM_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::ExpirationThresholds;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Per-product lock acquisition
    pub locking: LockingConfig,

    /// Expiration classification thresholds
    pub expiration: ExpirationConfig,

    /// Reconciliation engine tuning
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

/// How movements wait for the per-product exclusive lock
#[derive(Debug, Deserialize, Clone)]
pub struct LockingConfig {
    /// Acquisition attempts before surfacing ConcurrentModification
    pub max_retries: u32,

    /// Base backoff between attempts; doubles on each retry
    pub backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExpirationConfig {
    /// Days remaining at or under which a lot is Critical
    pub critical_days: i64,

    /// Days remaining at or under which a lot is Caution
    pub caution_days: i64,
}

impl ExpirationConfig {
    pub fn thresholds(&self) -> ExpirationThresholds {
        ExpirationThresholds {
            critical_days: self.critical_days,
            caution_days: self.caution_days,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReconciliationConfig {
    /// Window for counting repeated drift on the same product
    pub drift_window_hours: i32,

    /// Drift events within the window that escalate to an operator warning
    pub drift_alert_threshold: i64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("WSM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("locking.max_retries", 3)?
            .set_default("locking.backoff_ms", 50)?
            .set_default("expiration.critical_days", 7)?
            .set_default("expiration.caution_days", 30)?
            .set_default("reconciliation.drift_window_hours", 24)?
            .set_default("reconciliation.drift_alert_threshold", 3)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WSM_ prefix)
            .add_source(
                Environment::with_prefix("WSM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
