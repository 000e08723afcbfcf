//! Error types for Parla.

use crate::media::Outcome;
use thiserror::Error;

/// Library-level error type for Parla operations.
#[derive(Error, Debug)]
pub enum ParlaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input file missing or empty: {0}")]
    InputMissing(String),

    #[error("Backend '{backend}' unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    #[error("Backend '{backend}' failed: {diagnostic}")]
    BackendExecutionFailed { backend: String, diagnostic: String },

    #[error("Job submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Remote generation failed for job {job_id}: {reason}")]
    RemoteGenerationFailed { job_id: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Job {job_id} still running after {attempts} polls")]
    PollingExhausted { job_id: String, attempts: u32 },

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ParlaError {
    /// Classify this error into the terminal outcome reported to callers.
    ///
    /// Missing prerequisites (executable, checkpoint, media host) map to
    /// `BackendUnavailable`; everything that ran and went wrong maps to
    /// `BackendFailed`.
    pub fn outcome(&self) -> Outcome {
        match self {
            ParlaError::InputMissing(_) => Outcome::NoSource,
            ParlaError::BackendUnavailable { .. } | ParlaError::ToolNotFound(_) => {
                Outcome::BackendUnavailable
            }
            _ => Outcome::BackendFailed,
        }
    }
}

/// Result type alias for Parla operations.
pub type Result<T> = std::result::Result<T, ParlaError>;
