//! Configuration Module
//!
//! Handles loading cache settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::{CacheError, Result};

/// Which store implementation backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Shared Redis server
    Redis,
    /// In-process map, for local development without a server
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "redis" => Ok(Backend::Redis),
            "memory" => Ok(Backend::Memory),
            _ => Err(format!("unknown backend '{value}', expected redis or memory")),
        }
    }
}

/// Cache configuration parameters.
///
/// Read once at startup; there is no runtime reconfiguration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store host
    pub redis_host: String,
    /// Store port
    pub redis_port: u16,
    /// Namespace prepended to every key this process writes
    pub namespace: String,
    /// Expiration applied by `set`, None = entries persist until removed
    pub default_ttl: Option<u64>,
    /// Store implementation
    pub backend: Backend,
    /// Memory backend expiry sweep interval in seconds
    pub purge_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_HOST` - Store host (default: 127.0.0.1)
    /// - `REDIS_PORT` - Store port (default: 6379)
    /// - `CACHE_NAMESPACE` - Key namespace (default: magazine)
    /// - `CACHE_DEFAULT_TTL` - Expiration in seconds (default: unset, no expiration)
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `CACHE_PURGE_INTERVAL` - Memory backend sweep in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_host: env::var("REDIS_HOST").unwrap_or(defaults.redis_host),
            redis_port: parse_var("REDIS_PORT").unwrap_or(defaults.redis_port),
            namespace: env::var("CACHE_NAMESPACE").unwrap_or(defaults.namespace),
            default_ttl: parse_var("CACHE_DEFAULT_TTL").filter(|ttl| *ttl > 0),
            backend: parse_var("CACHE_BACKEND").unwrap_or(defaults.backend),
            purge_interval: parse_var("CACHE_PURGE_INTERVAL").unwrap_or(defaults.purge_interval),
        }
    }

    /// Connection URL for the Redis client.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }

    /// Default expiration as a Duration.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl.map(Duration::from_secs)
    }

    /// Rejects settings the cache cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(CacheError::InvalidInput(
                "CACHE_NAMESPACE must not be empty".to_string(),
            ));
        }
        if self.redis_host.is_empty() {
            return Err(CacheError::InvalidInput(
                "REDIS_HOST must not be empty".to_string(),
            ));
        }
        if let Some(ttl) = self.default_ttl {
            if ttl.checked_mul(1000).is_none() {
                return Err(CacheError::InvalidInput(format!(
                    "CACHE_DEFAULT_TTL of {ttl}s is too large"
                )));
            }
        }
        if self.backend == Backend::Memory && self.purge_interval == 0 {
            return Err(CacheError::InvalidInput(
                "CACHE_PURGE_INTERVAL must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads and parses `name`. An unset variable yields None silently; a set
/// but unparseable one is logged and also yields None.
fn parse_var<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).ok()?;
    parse_value(name, &raw)
}

fn parse_value<T>(name: &str, raw: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("Ignoring {}={:?}: {}; using default", name, raw, err);
            None
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_host: "127.0.0.1".to_string(),
            redis_port: 6379,
            namespace: "magazine".to_string(),
            default_ttl: None,
            backend: Backend::Redis,
            purge_interval: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.redis_host, "127.0.0.1");
        assert_eq!(config.redis_port, 6379);
        assert_eq!(config.namespace, "magazine");
        assert!(config.default_ttl.is_none());
        assert_eq!(config.backend, Backend::Redis);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("REDIS_HOST");
        env::remove_var("REDIS_PORT");
        env::remove_var("CACHE_NAMESPACE");
        env::remove_var("CACHE_DEFAULT_TTL");
        env::remove_var("CACHE_BACKEND");
        env::remove_var("CACHE_PURGE_INTERVAL");

        let config = Config::from_env();
        assert_eq!(config.redis_url(), "redis://127.0.0.1:6379");
        assert_eq!(config.namespace, "magazine");
        assert!(config.default_ttl().is_none());
        assert_eq!(config.purge_interval, 60);
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("Redis".parse::<Backend>(), Ok(Backend::Redis));
        assert_eq!("memory".parse::<Backend>(), Ok(Backend::Memory));
        assert!("etcd".parse::<Backend>().is_err());
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        assert_eq!(parse_value::<u16>("REDIS_PORT", "63790"), None);
        assert_eq!(parse_value::<u16>("REDIS_PORT", " 6380 "), Some(6380));
        assert_eq!(parse_value::<Backend>("CACHE_BACKEND", "memroy"), None);
        assert_eq!(parse_value::<Backend>("CACHE_BACKEND", "Memory"), Some(Backend::Memory));
        assert_eq!(parse_value::<u64>("CACHE_DEFAULT_TTL", "ten"), None);
    }

    #[test]
    fn test_validate_rejects_overflowing_default_ttl() {
        let config = Config {
            default_ttl: Some(u64::MAX / 1000 + 1),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CacheError::InvalidInput(_))));

        let config = Config {
            default_ttl: Some(u64::MAX / 1000),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_namespace() {
        let config = Config {
            namespace: "  ".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CacheError::InvalidInput(_))));
    }

    #[test]
    fn test_default_ttl_duration() {
        let config = Config {
            default_ttl: Some(90),
            ..Config::default()
        };
        assert_eq!(config.default_ttl(), Some(Duration::from_secs(90)));
    }
}
