//! # Spindash Engine
//!
//! Headless driver for the Spindash audio core.
//!
//! Loads `spindash.toml` (or the path given as the first argument), then
//! runs the audio engine against the simulated backend and a sandbox level
//! for the configured number of tics.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod soak;

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{EngineConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("spindash=info".parse()?))
        .init();

    info!("Spindash starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let config = EngineConfig::load_from(&path);

    let report = soak::run(&config)?;
    info!(
        "Started {} of {} sounds over {} tics",
        report.started, report.requested, report.tics
    );

    info!("Spindash shutdown complete");
    Ok(())
}
