//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{GenerationMode, Settings};
use crate::error::{ParlaError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Speaking requires the synthesizer and a generation path.
    Say,
    /// Animating requires a generation path.
    Animate,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
/// Local backends are not checked here; the orchestrator falls through them.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    if let Operation::Say = operation {
        check_tool(&settings.voice.piper_binary, "--version")?;
    }

    match settings.generation.mode {
        GenerationMode::Remote => check_api_key(settings)?,
        GenerationMode::Local => {
            if settings.generation.backends.is_empty() {
                return Err(ParlaError::Config(
                    "generation.backends is empty; add \"neural\" or \"local\"".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Check if the remote API key is configured.
fn check_api_key(settings: &Settings) -> Result<()> {
    let var = &settings.remote.api_key_env;
    match settings.remote_api_key() {
        Some(_) => Ok(()),
        None => Err(ParlaError::Config(format!(
            "{} not set. Set it with: export {}='...' (or add it to .env)",
            var, var
        ))),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str, version_arg: &str) -> Result<()> {
    match Command::new(name).arg(version_arg).output() {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ParlaError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ParlaError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
