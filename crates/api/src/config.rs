//! Application configuration loaded from environment variables.

use std::time::Duration;

use views::{ConsumerConfig, EngineConfig, ScriptBudget};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset selects the
///   in-memory store
/// - `SCRIPT_FUEL`: evaluation steps per map run (default: `100000`)
/// - `SCRIPT_TIMEOUT_MS`: wall-clock limit per map run (default: `250`)
/// - `SCRIPT_MAX_EMITS`: emits per map run (default: `10000`)
/// - `SCRIPT_MAX_VALUE_BYTES`: bytes of values a map run may copy or build
///   (default: `16777216`)
/// - `CASCADE_CONCURRENCY`: documents re-indexed at once when a design
///   changes (default: `8`)
/// - `QUEUE_MAX_DELIVERIES`: attempts per change (default: `5`)
/// - `QUEUE_RETRY_DELAY_MS`: pause before a redelivery (default: `500`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub script_fuel: u64,
    pub script_timeout_ms: u64,
    pub script_max_emits: usize,
    pub script_max_value_bytes: u64,
    pub cascade_concurrency: usize,
    pub queue_max_deliveries: u32,
    pub queue_retry_delay_ms: u64,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            script_fuel: env_or("SCRIPT_FUEL", defaults.script_fuel),
            script_timeout_ms: env_or("SCRIPT_TIMEOUT_MS", defaults.script_timeout_ms),
            script_max_emits: env_or("SCRIPT_MAX_EMITS", defaults.script_max_emits),
            script_max_value_bytes: env_or(
                "SCRIPT_MAX_VALUE_BYTES",
                defaults.script_max_value_bytes,
            ),
            cascade_concurrency: env_or("CASCADE_CONCURRENCY", defaults.cascade_concurrency),
            queue_max_deliveries: env_or("QUEUE_MAX_DELIVERIES", defaults.queue_max_deliveries),
            queue_retry_delay_ms: env_or("QUEUE_RETRY_DELAY_MS", defaults.queue_retry_delay_ms),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// View engine settings.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            budget: ScriptBudget {
                fuel: self.script_fuel,
                timeout: Duration::from_millis(self.script_timeout_ms),
                max_emits: self.script_max_emits,
                max_value_bytes: self.script_max_value_bytes,
            },
            cascade_concurrency: self.cascade_concurrency.max(1),
        }
    }

    /// Change consumer settings.
    pub fn consumer(&self) -> ConsumerConfig {
        ConsumerConfig {
            max_deliveries: self.queue_max_deliveries.max(1),
            retry_delay: Duration::from_millis(self.queue_retry_delay_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            script_fuel: 100_000,
            script_timeout_ms: 250,
            script_max_emits: 10_000,
            script_max_value_bytes: 16 * 1024 * 1024,
            cascade_concurrency: 8,
            queue_max_deliveries: 5,
            queue_retry_delay_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_defaults_match_library_defaults() {
        let config = Config::default();
        assert_eq!(config.engine(), EngineConfig::default());
        assert_eq!(config.consumer(), ConsumerConfig::default());
    }

    #[test]
    fn test_zero_limits_are_clamped() {
        let config = Config {
            cascade_concurrency: 0,
            queue_max_deliveries: 0,
            ..Config::default()
        };
        assert_eq!(config.engine().cascade_concurrency, 1);
        assert_eq!(config.consumer().max_deliveries, 1);
    }
}
