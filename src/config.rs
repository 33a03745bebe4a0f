use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default manifest time-to-live in milliseconds (10 minutes)
pub const DEFAULT_MANIFEST_TTL_MS: u64 = 10 * 60 * 1000;

/// Default report time-to-live in milliseconds (1 minute)
pub const DEFAULT_REPORT_TTL_MS: u64 = 60 * 1000;

/// Default package latest-version time-to-live in milliseconds (10 minutes)
pub const DEFAULT_PACKAGE_TTL_MS: u64 = 10 * 60 * 1000;

/// Entries kept per in-memory cache before expired, then oldest, entries are evicted
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

/// Timeout for every upstream call in milliseconds (5 seconds)
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// Upstream defaults
// =============================================================================

/// Maximum number of outstanding registry lookups per resolution pass
pub const DEFAULT_FETCH_CONCURRENCY: usize = 16;

/// Number of events kept per stats ring
pub const DEFAULT_STATS_CAPACITY: usize = 10;

pub const DEFAULT_MANIFEST_BASE_URL: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_MANIFEST_REF: &str = "HEAD";
pub const DEFAULT_MANIFEST_PATH: &str = "package.json";
pub const DEFAULT_REGISTRY_BASE_URL: &str = "https://registry.npmjs.org";

/// User agent sent to every upstream service
pub const USER_AGENT: &str = "dep-freshness";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub stats: StatsConfig,
    pub upstream: UpstreamConfig,
}

impl Config {
    /// Load configuration from a JSON file, defaulting every missing field
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Cache-related configuration, time-to-live values in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub manifest_ttl: u64,
    pub report_ttl: u64,
    pub package_ttl: u64,
    /// Upper bound on entries held by each of the manifest, report and package caches
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn manifest_ttl(&self) -> Duration {
        Duration::from_millis(self.manifest_ttl)
    }

    pub fn report_ttl(&self) -> Duration {
        Duration::from_millis(self.report_ttl)
    }

    pub fn package_ttl(&self) -> Duration {
        Duration::from_millis(self.package_ttl)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            manifest_ttl: DEFAULT_MANIFEST_TTL_MS,
            report_ttl: DEFAULT_REPORT_TTL_MS,
            package_ttl: DEFAULT_PACKAGE_TTL_MS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

/// Upstream request limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchConfig {
    /// Hard timeout for a single upstream call in milliseconds
    pub timeout: u64,
    /// Maximum concurrent registry lookups per resolution pass
    pub concurrency: usize,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT_MS,
            concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsConfig {
    pub capacity: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_STATS_CAPACITY,
        }
    }
}

/// Locations of the manifest host and the package registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpstreamConfig {
    pub manifest_base_url: String,
    /// Branch, tag or commit the manifest is read from
    pub manifest_ref: String,
    pub manifest_path: String,
    pub registry_base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            manifest_base_url: DEFAULT_MANIFEST_BASE_URL.to_string(),
            manifest_ref: DEFAULT_MANIFEST_REF.to_string(),
            manifest_path: DEFAULT_MANIFEST_PATH.to_string(),
            registry_base_url: DEFAULT_REGISTRY_BASE_URL.to_string(),
        }
    }
}

/// Returns the path to the data directory for dep-freshness.
/// Uses $XDG_DATA_HOME/dep-freshness if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/dep-freshness,
/// or ./dep-freshness if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("dep-freshness.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("dep-freshness")
}
