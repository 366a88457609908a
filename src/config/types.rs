// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

/// Server listening configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads; CPU core count when unset
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// "info" or "error"
    pub level: String,
    /// Log accepted connections
    pub access_log: bool,
}

/// Performance tuning configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    /// Reject new connections above this count when set
    #[serde(default)]
    pub max_connections: Option<u64>,
}

/// HTTP behavior configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Largest accepted request body, by Content-Length, in bytes
    pub max_body_size: u64,
}
