//! Application configuration.

/// Configuration types.
pub mod app_config;
/// Command-line arguments.
pub mod args;
/// Configuration file storage.
pub mod storage;

pub use app_config::{AppConfig, LoaderConfig, LogLevel, NetworkConfig, PoolConfig};
pub use args::CliArgs;
pub use storage::{ConfigError, ConfigStore};
