//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults. The listening port may additionally be supplied as the first
/// command-line argument, which takes precedence over the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port the proxy listens on
    pub listen_port: u16,
    /// Maximum number of concurrently handled client connections
    pub max_connections: usize,
    /// Interval in seconds between cache statistics log lines
    pub stats_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PROXY_PORT` - Listening port (default: 8080)
    /// - `MAX_CONNECTIONS` - Concurrent connection bound (default: 256)
    /// - `STATS_INTERVAL` - Statistics logging frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        Self {
            listen_port: env::var("PROXY_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            max_connections: env::var("MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
            stats_interval: env::var("STATS_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: 8080,
            max_connections: 256,
            stats_interval: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.listen_port, 8080);
        assert_eq!(config.max_connections, 256);
        assert_eq!(config.stats_interval, 60);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("PROXY_PORT");
        env::remove_var("MAX_CONNECTIONS");
        env::remove_var("STATS_INTERVAL");

        let config = Config::from_env();
        assert_eq!(config.listen_port, 8080);
        assert_eq!(config.max_connections, 256);
        assert_eq!(config.stats_interval, 60);
    }
}
