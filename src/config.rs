use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::version::error::ConfigError;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default lifetime of a cached registry response in milliseconds (15 minutes)
pub const DEFAULT_CACHE_TTL_MS: u64 = 15 * 60 * 1000;

/// Default interval between background sweeps of expired cache entries (5 minutes)
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// Timeout for a single registry query in milliseconds (30 seconds)
pub const DEFAULT_REGISTRY_TIMEOUT_MS: u64 = 30_000;

/// Maximum number of registry queries in flight during a scan
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Environment variable holding the log filter directive
pub const LOG_ENV_VAR: &str = "IMAGE_REPORTER_LOG";

/// Reporter configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ReporterConfig {
    pub cache: CacheConfig,
    pub scan: ScanConfig,
}

impl ReporterConfig {
    /// Loads a JSON configuration file; missing fields use defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan.validate()?;
        self.cache.validate()
    }
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub enabled: bool,
    /// Lifetime of a cached response in milliseconds
    pub ttl_ms: u64,
    /// Background sweep interval in milliseconds, 0 disables the sweep
    pub cleanup_interval_ms: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.ttl_ms == 0 {
            return Err(ConfigError::InvalidCacheTtl);
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: DEFAULT_CACHE_TTL_MS,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
        }
    }
}

/// Scan-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanConfig {
    /// Upper bound on concurrent registry queries, at most `Semaphore::MAX_PERMITS`
    pub max_concurrency: usize,
    /// Deadline of a single registry query in milliseconds
    pub registry_timeout_ms: u64,
}

impl ScanConfig {
    pub fn registry_timeout(&self) -> Duration {
        Duration::from_millis(self.registry_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 || self.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.registry_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            registry_timeout_ms: DEFAULT_REGISTRY_TIMEOUT_MS,
        }
    }
}

/// Returns the path to the data directory for image-reporter.
/// Uses $XDG_DATA_HOME/image-reporter if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/image-reporter,
/// or ./image-reporter if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("image-reporter.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("image-reporter")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn reporter_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<ReporterConfig>(json!({
            "cache": {
                "ttlMs": 1000
            }
        }))
        .unwrap();

        assert_eq!(result.cache.ttl_ms, 1000);
        assert!(result.cache.enabled);
        assert_eq!(result.cache.cleanup_interval_ms, DEFAULT_CLEANUP_INTERVAL_MS);
        assert_eq!(result.scan, ScanConfig::default());
    }

    #[test]
    fn reporter_config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<ReporterConfig>(json!({
            "cache": {
                "enabled": false,
                "ttlMs": 5000,
                "cleanupIntervalMs": 0
            },
            "scan": {
                "maxConcurrency": 4,
                "registryTimeoutMs": 2000
            }
        }))
        .unwrap();

        assert_eq!(
            result,
            ReporterConfig {
                cache: CacheConfig {
                    enabled: false,
                    ttl_ms: 5000,
                    cleanup_interval_ms: 0,
                },
                scan: ScanConfig {
                    max_concurrency: 4,
                    registry_timeout_ms: 2000,
                },
            }
        );
        assert_eq!(result.scan.registry_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let config = ReporterConfig {
            scan: ScanConfig {
                max_concurrency: 0,
                ..ScanConfig::default()
            },
            ..ReporterConfig::default()
        };

        assert_eq!(config.validate(), Err(ConfigError::InvalidConcurrency));
    }

    #[test]
    fn validate_rejects_concurrency_above_semaphore_limit() {
        let config = ScanConfig {
            max_concurrency: Semaphore::MAX_PERMITS + 1,
            ..ScanConfig::default()
        };
        let at_limit = ScanConfig {
            max_concurrency: Semaphore::MAX_PERMITS,
            ..ScanConfig::default()
        };

        assert_eq!(config.validate(), Err(ConfigError::InvalidConcurrency));
        assert_eq!(at_limit.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let config = ScanConfig {
            registry_timeout_ms: 0,
            ..ScanConfig::default()
        };

        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout));
    }

    #[test]
    fn validate_rejects_zero_ttl_only_when_cache_enabled() {
        let enabled = CacheConfig {
            ttl_ms: 0,
            ..CacheConfig::default()
        };
        let disabled = CacheConfig {
            enabled: false,
            ttl_ms: 0,
            ..CacheConfig::default()
        };

        assert_eq!(enabled.validate(), Err(ConfigError::InvalidCacheTtl));
        assert_eq!(disabled.validate(), Ok(()));
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "scan": {{ "maxConcurrency": 3 }} }}"#).unwrap();

        let config = ReporterConfig::load(file.path()).unwrap();

        assert_eq!(config.scan.max_concurrency, 3);
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn load_reports_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let result = ReporterConfig::load(file.path());

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_reports_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "scan": {{ "maxConcurrency": 0 }} }}"#).unwrap();

        let result = ReporterConfig::load(file.path());

        assert_eq!(result, Err(ConfigError::InvalidConcurrency));
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/image-reporter"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.local/share/image-reporter"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./image-reporter"));
    }
}
