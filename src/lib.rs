//! Vignette - a tiered image loader.
//!
//! Images are looked up in memory, then on disk, then over the network.
//! Results are delivered to consumers through a dispatcher that drops
//! anything the consumer no longer wants.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters and the loader itself.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "vignette";
