//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the deskmock binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::engine::Request;
use crate::error::{MockError, Result};

/// Helpdesk API emulator command-line interface.
#[derive(Parser, Debug)]
#[command(name = "deskmock", about = "In-memory helpdesk API emulator", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Base URL the engine pretends to live at.
    #[arg(long, global = true, env = "DESKMOCK_URL")]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a file of requests against a fresh engine.
    ///
    /// The file holds either a JSON array of requests or one request per line.
    Run {
        /// Path to the request script.
        script: PathBuf,

        /// Load the default fixture scenario first.
        #[arg(long)]
        seed: bool,

        /// Stop at the first request that fails.
        #[arg(long)]
        fail_fast: bool,
    },

    /// List the resource kinds and their endpoints.
    Kinds,

    /// Serve the engine over HTTP until interrupted.
    #[cfg(feature = "test-server")]
    Serve {
        /// Port to listen on; 0 picks a free one.
        #[arg(long, default_value_t = 0)]
        port: u16,

        /// Load the default fixture scenario first.
        #[arg(long)]
        seed: bool,
    },
}

/// Parse a request script: a JSON array, or one JSON request per line.
///
/// Blank lines and lines starting with `#` are skipped in the line format.
///
/// # Errors
///
/// Returns [`MockError::InvalidRequest`] naming the offending line.
pub fn parse_script(text: &str) -> Result<Vec<Request>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line)
                .map_err(|e| MockError::InvalidRequest(format!("line {}: {e}", index + 1)))
        })
        .collect()
}
