//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The two values a worker is built from (cache name and size ceiling) are
//! split out into [`WorkerConfig`], which is immutable once the worker starts.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database backing Cache Storage.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the worker is registered for and that network fetches go to.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix of the cache store name.
    ///
    /// Set via SWCACHE_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version token embedded in the cache store name.
    ///
    /// Changing it invalidates the whole store on the next activation.
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Largest declared response size eligible for caching.
    ///
    /// Set via SWCACHE_MAX_FILE_SIZE_BYTES environment variable.
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,

    /// Path the worker script is served from.
    ///
    /// Set via SWCACHE_SCRIPT_PATH environment variable.
    #[serde(default = "default_script_path")]
    pub script_path: String,

    /// Registration scope.
    ///
    /// Set via SWCACHE_SCOPE environment variable.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Whether the platform exposes worker capability at all.
    ///
    /// Set via SWCACHE_SERVICE_WORKERS environment variable.
    #[serde(default = "default_true")]
    pub service_workers: bool,

    /// User-Agent string for network requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8069".into()
}

fn default_cache_prefix() -> String {
    "swcache".into()
}

fn default_cache_version() -> String {
    "1".into()
}

fn default_max_file_size_bytes() -> u64 {
    5_242_880 // 5MB
}

fn default_script_path() -> String {
    "/sw.js".into()
}

fn default_scope() -> String {
    "/".into()
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            max_file_size_bytes: default_max_file_size_bytes(),
            script_path: default_script_path(),
            scope: default_scope(),
            service_workers: true,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the cache store for the configured version.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// Constants injected into the worker script.
    pub fn worker(&self) -> WorkerConfig {
        WorkerConfig { cache_name: self.cache_name(), max_file_size_bytes: self.max_file_size_bytes }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

/// Build-time constants a worker is constructed from.
///
/// Constructed once when the worker script is parsed and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WorkerConfig {
    /// Name of the single cache store this worker owns.
    pub cache_name: String,
    /// Responses declaring a larger Content-Length are never stored.
    pub max_file_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./swcache.sqlite"));
        assert_eq!(config.origin, "http://localhost:8069");
        assert_eq!(config.cache_name(), "swcache-1");
        assert_eq!(config.max_file_size_bytes, 5_242_880);
        assert_eq!(config.script_path, "/sw.js");
        assert_eq!(config.scope, "/");
        assert!(config.service_workers);
        assert_eq!(config.timeout_ms, 20_000);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_worker_config_from_app_config() {
        let config = AppConfig { cache_version: "2024.10".into(), max_file_size_bytes: 1_000_000, ..Default::default() };
        let worker = config.worker();
        assert_eq!(worker.cache_name, "swcache-2024.10");
        assert_eq!(worker.max_file_size_bytes, 1_000_000);
    }

    #[test]
    fn test_load_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SWCACHE_CACHE_VERSION", "abc123");
            jail.set_env("SWCACHE_MAX_FILE_SIZE_BYTES", "1000000");
            jail.set_env("SWCACHE_SERVICE_WORKERS", "false");

            let config = AppConfig::load().unwrap();
            assert_eq!(config.cache_name(), "swcache-abc123");
            assert_eq!(config.max_file_size_bytes, 1_000_000);
            assert!(!config.service_workers);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("swcache.toml", "cache_prefix = \"assets\"\nscope = \"/shop/\"")?;
            jail.set_env("SWCACHE_CONFIG_FILE", "swcache.toml");

            let config = AppConfig::load().unwrap();
            assert_eq!(config.cache_name(), "assets-1");
            assert_eq!(config.scope, "/shop/");
            Ok(())
        });
    }
}
