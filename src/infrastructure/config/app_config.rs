//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::args::CliArgs;
use super::storage::ConfigError;
use crate::infrastructure::image::disk_cache::DEFAULT_MAX_CACHE_SIZE;
use crate::infrastructure::image::memory_cache::DEFAULT_CACHE_SIZE;

const APP_NAME: &str = "vignette";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from `config.toml` and merged with CLI
/// arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path. Logs go to stderr when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Image loader configuration.
    #[serde(default)]
    pub loader: LoaderConfig,
}

/// Image loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Maximum images in memory cache.
    #[serde(default = "default_memory_cache_size")]
    pub memory_cache_size: usize,

    /// Maximum disk cache size in bytes.
    #[serde(default = "default_disk_cache_size")]
    pub disk_cache_size: u64,

    /// Disk cache directory. Defaults to the platform cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Persist downloaded bytes before decoding and decode from the durable
    /// copy.
    #[serde(default = "default_true")]
    pub persist_raw: bool,

    /// Worker pool configuration.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            memory_cache_size: default_memory_cache_size(),
            disk_cache_size: default_disk_cache_size(),
            cache_dir: None,
            persist_raw: true,
            pool: PoolConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Worker threads kept for async work.
    #[serde(default = "default_core_threads")]
    pub core_threads: usize,

    /// Upper bound on blocking threads and on concurrently running loads.
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,

    /// Seconds an idle blocking thread is kept alive.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            core_threads: default_core_threads(),
            max_threads: default_max_threads(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

/// HTTP settings for network fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Initial body buffer size in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Largest accepted body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            buffer_size: default_buffer_size(),
            max_body_bytes: default_max_body_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

fn available_cores() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

fn default_core_threads() -> usize {
    available_cores() + 1
}

fn default_max_threads() -> usize {
    available_cores() * 2 + 1
}

const fn default_keep_alive_secs() -> u64 {
    10
}

const fn default_memory_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

const fn default_disk_cache_size() -> u64 {
    DEFAULT_MAX_CACHE_SIZE
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_buffer_size() -> usize {
    8 * 1024
}

const fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}

fn default_user_agent() -> String {
    format!("{APP_NAME}/{}", crate::VERSION)
}

const fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.loader.cache_dir = Some(cache_dir.clone());
        }
        if args.no_persist_raw {
            self.loader.persist_raw = false;
        }
        if let Some(timeout) = args.timeout_secs {
            self.loader.network.timeout_secs = timeout;
        }
    }

    /// Checks constraints the TOML schema cannot express.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pool = &self.loader.pool;
        if pool.core_threads == 0 {
            return Err(ConfigError::Invalid(
                "loader.pool.core_threads must be at least 1".to_string(),
            ));
        }
        if pool.max_threads < pool.core_threads {
            return Err(ConfigError::Invalid(format!(
                "loader.pool.max_threads ({}) is below core_threads ({})",
                pool.max_threads, pool.core_threads
            )));
        }
        if self.loader.network.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "loader.network.max_body_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
