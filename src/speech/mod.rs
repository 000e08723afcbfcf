//! Speech collaborators: getting text in, getting audio out.
//!
//! The orchestrator only needs an audio file; these traits are the seams
//! where capture and synthesis plug in.

mod console;
mod piper;

pub use console::ConsoleTranscriber;
pub use piper::PiperSynthesizer;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source of user text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Block until the first non-empty utterance and return it.
    async fn transcribe(&self) -> Result<String>;
}

/// Text-to-speech engine.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` with `voice` and return the audio file path.
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<PathBuf>;
}

/// Voice selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Male,
    #[default]
    Female,
}

impl std::str::FromStr for Voice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" | "m" | "1" => Ok(Voice::Male),
            "female" | "f" | "2" => Ok(Voice::Female),
            _ => Err(format!("Unknown voice: {} (expected male or female)", s)),
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Voice::Male => write!(f, "male"),
            Voice::Female => write!(f, "female"),
        }
    }
}
