//! Configuration module for Parla.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    BackendKind, FfmpegSettings, GeneralSettings, GenerationMode, GenerationSettings,
    RemoteSettings, Settings, VoiceSettings, Wav2LipSettings,
};
