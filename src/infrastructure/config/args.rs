use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the `vignette` binary.
#[derive(Debug, Parser)]
#[command(
    name = "vignette",
    version,
    about = "Load images through a memory, disk and network cache",
    long_about = None
)]
pub struct CliArgs {
    /// Image URLs. Several URLs are loaded as one batch.
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Requested width (0 keeps the native size).
    #[arg(long, default_value_t = 0)]
    pub width: u32,

    /// Requested height (0 keeps the native size).
    #[arg(long, default_value_t = 0)]
    pub height: u32,

    /// Directory that receives the applied images as PNG files.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Image shown when a single load fails.
    #[arg(long, value_name = "PATH")]
    pub error_placeholder: Option<PathBuf>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Disk cache directory.
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Decode downloads directly instead of from the persisted raw copy.
    #[arg(long)]
    pub no_persist_raw: bool,

    /// Request timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}
