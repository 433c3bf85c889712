#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Logger initialization for the BattleJong binaries.
//!
//! The filter is taken from `BATTLEJONG_LOG`, then `RUST_LOG`, then a build-profile default.

use battlejong_env_utils::default_env;
use thiserror::Error;

pub use log;

#[cfg(feature = "macros")]
mod macros;

#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: &str = "battlejong=trace";
#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: &str = "battlejong=info";

#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    SetLogger(#[from] log::SetLoggerError),
}

/// Resolves the filter directive the logger will be initialized with.
#[must_use]
pub fn filter() -> String {
    default_env(
        "BATTLEJONG_LOG",
        &default_env("RUST_LOG", DEFAULT_LOG_LEVEL),
    )
}

/// Installs the global logger.
///
/// # Errors
///
/// * If a global logger has already been installed
pub fn init() -> Result<(), InitError> {
    let filter = filter();

    env_logger::Builder::new()
        .parse_filters(&filter)
        .format_timestamp_millis()
        .try_init()?;

    log::debug!("Initialized logging with filter '{filter}'");

    Ok(())
}
