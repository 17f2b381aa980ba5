//! Process-wide loader instance.

use std::sync::OnceLock;

use tracing::info;

use super::ImageLoader;
use crate::domain::errors::LoadError;

static LOADER: OnceLock<ImageLoader> = OnceLock::new();

/// Installs the process-wide loader. Only the first call succeeds.
///
/// # Errors
/// Returns `CallerError` if a loader is already installed.
pub fn install(loader: ImageLoader) -> Result<&'static ImageLoader, LoadError> {
    let mut installed = false;
    let instance = LOADER.get_or_init(|| {
        installed = true;
        loader
    });
    if !installed {
        return Err(LoadError::caller("Image loader already installed"));
    }
    info!("Process-wide image loader installed");
    Ok(instance)
}

/// Returns the process-wide loader.
///
/// # Errors
/// Returns `CallerError` if [`install`] was never called.
pub fn global() -> Result<&'static ImageLoader, LoadError> {
    LOADER
        .get()
        .ok_or_else(|| LoadError::caller("Image loader not installed"))
}
