//! Configuration for Courier

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Dispatch worker configuration
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Campaign scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Delivery status poller configuration
    #[serde(default)]
    pub poller: PollerConfig,

    /// Outbound HTTP configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (postgres)
    pub url: String,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

/// Dispatch worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Interval between queue polls (seconds)
    #[serde(default = "default_worker_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum jobs claimed per poll
    #[serde(default = "default_worker_batch_size")]
    pub batch_size: i64,

    /// Maximum delivery attempts per job
    #[serde(default = "default_worker_max_attempts")]
    pub max_attempts: i32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_worker_poll_interval(),
            batch_size: default_worker_batch_size(),
            max_attempts: default_worker_max_attempts(),
        }
    }
}

fn default_worker_poll_interval() -> u64 {
    5
}

fn default_worker_batch_size() -> i64 {
    10
}

fn default_worker_max_attempts() -> i32 {
    5
}

/// Campaign scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between scheduler ticks (seconds)
    #[serde(default = "default_scheduler_tick")]
    pub tick_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_scheduler_tick(),
        }
    }
}

fn default_scheduler_tick() -> u64 {
    60
}

/// Delivery status poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Enable the status poller
    #[serde(default)]
    pub enabled: bool,

    /// Interval between poll cycles (seconds)
    #[serde(default = "default_poller_interval")]
    pub interval_secs: u64,

    /// Maximum messages refreshed per cycle
    #[serde(default = "default_poller_batch_size")]
    pub batch_size: i64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_poller_interval(),
            batch_size: default_poller_batch_size(),
        }
    }
}

fn default_poller_interval() -> u64 {
    300
}

fn default_poller_batch_size() -> i64 {
    100
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout for provider calls (seconds)
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./config.toml"),
            std::path::PathBuf::from("/etc/courier/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(crate::Error::Config(
            "No configuration file found".to_string(),
        ))
    }
}
