//! Parla - Talking Avatar Generation
//!
//! A local-first CLI tool that turns speech into a talking-head video.
//!
//! The name "Parla" comes from the Italian and Catalan word for "speaks."
//!
//! # Overview
//!
//! Parla allows you to:
//! - Capture text and synthesize it with Piper voices
//! - Animate a reference face with the audio using Wav2Lip, falling back to
//!   a still-image ffmpeg render
//! - Hand generation off to a hosted lip-sync API and wait for the result
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `media` - Media references, requests and outcomes
//! - `store` - Artifact store for generated files
//! - `render` - Local rendering backends
//! - `remote` - Remote job submission and polling
//! - `host` - Exposing local media over HTTP for remote jobs
//! - `speech` - Text capture and speech synthesis
//! - `orchestrator` - Backend selection and outcome interpretation
//! - `pipeline` - End-to-end text → audio → video
//!
//! # Example
//!
//! ```rust,no_run
//! use parla::config::Settings;
//! use parla::media::{GenerationRequest, MediaReference};
//! use parla::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let request = GenerationRequest::new(
//!         MediaReference::local("outputs/speech.wav"),
//!         MediaReference::local(settings.default_face()),
//!         "avatar.mp4",
//!     )?;
//!     let result = orchestrator.generate(&request).await;
//!     println!("{}", result.outcome);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod media;
pub mod orchestrator;
pub mod pipeline;
pub mod remote;
pub mod render;
pub mod speech;
pub mod store;

pub use error::{ParlaError, Result};
