use super::app_config::{AppConfig, LoaderConfig};
use directories::ProjectDirs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors raised while locating, writing or checking `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No platform config directory could be determined.
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The file parsed but holds inconsistent values.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Locates `config.toml` and turns it into an [`AppConfig`].
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Uses `path_override` when given, otherwise `config.toml` in the
    /// platform config directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigDirNotFound` if no override is given and the platform
    /// directory cannot be determined.
    pub fn new(path_override: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path_override {
            return Ok(Self::at(path.to_path_buf()));
        }
        ProjectDirs::from("org", "vignette", "vignette")
            .map(|dirs| Self::at(dirs.config_dir().join(CONFIG_FILE_NAME)))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Uses the file at `path`.
    #[must_use]
    pub const fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Reads the configuration.
    ///
    /// A missing file is replaced by a commented template and defaults are
    /// returned. A file that is not valid TOML is left alone and defaults are
    /// used.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read or the template written, and
    /// `Invalid` if the values fail [`AppConfig::validate`].
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No config file, writing template");
            self.write_template()?;
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let config = match toml::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unparseable config file, using defaults");
                return Ok(AppConfig::default());
            }
        };
        config.validate()?;
        debug!(path = %self.path.display(), "Configuration loaded");
        Ok(config)
    }

    fn write_template(&self) -> Result<(), ConfigError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(template(&LoaderConfig::default()).as_bytes())?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Every key commented out at its default value.
fn template(loader: &LoaderConfig) -> String {
    format!(
        r#"# vignette configuration. Every key is optional; the values shown are the
# defaults.

# log_level = "info"
# log_path = "/path/to/vignette.log"

[loader]
# memory_cache_size = {memory}
# disk_cache_size = {disk}
# cache_dir = "/path/to/image/cache"
# persist_raw = {persist}

[loader.pool]
# Defaults depend on the number of CPU cores.
# core_threads = {core}
# max_threads = {max}
# keep_alive_secs = {keep_alive}

[loader.network]
# timeout_secs = {timeout}
# buffer_size = {buffer}
# max_body_bytes = {max_body}
# user_agent = "{user_agent}"
"#,
        memory = loader.memory_cache_size,
        disk = loader.disk_cache_size,
        persist = loader.persist_raw,
        core = loader.pool.core_threads,
        max = loader.pool.max_threads,
        keep_alive = loader.pool.keep_alive_secs,
        timeout = loader.network.timeout_secs,
        buffer = loader.network.buffer_size,
        max_body = loader.network.max_body_bytes,
        user_agent = loader.network.user_agent,
    )
}
