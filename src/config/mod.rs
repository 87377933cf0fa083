/// Configuration management for the Flowforge engine
///
/// Server bind address, database location and queue backend selection, all
/// overridable through FLOWFORGE_* environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Execution queue configuration
    pub queue: QueueConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the SQLite database file (default: "data")
    pub data_dir: String,
}

/// Which queue backend dispatches executions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// In-process channel; jobs are lost on restart
    Memory,
    /// SQLite-backed; pending jobs survive restarts
    Durable,
}

/// Execution queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    /// Durable backend poll interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("FLOWFORGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("FLOWFORGE_PORT")
                    .unwrap_or_else(|_| "3004".to_string())
                    .parse()
                    .unwrap_or(3004),
            },
            database: DatabaseConfig {
                data_dir: std::env::var("FLOWFORGE_DATA_DIR")
                    .unwrap_or_else(|_| "data".to_string()),
            },
            queue: QueueConfig {
                backend: match std::env::var("FLOWFORGE_QUEUE").as_deref() {
                    Ok("durable") => QueueBackend::Durable,
                    _ => QueueBackend::Memory,
                },
                poll_interval_ms: std::env::var("FLOWFORGE_QUEUE_POLL_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .unwrap_or(500),
            },
        }
    }
}
