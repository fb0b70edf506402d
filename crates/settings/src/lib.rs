//! RelayCraft Settings
//!
//! Settings file for the settlement engine: the module params and the
//! logging filter, stored as JSON.
//!
//! ## Usage
//!
//! ```no_run
//! use relaycraft_settings::Settings;
//!
//! // Load or create default settings
//! let mut settings = Settings::load_or_default()?;
//!
//! // Tighten the proof requirement
//! settings.params.proof.proof_request_probability = 0.5;
//!
//! // Save settings
//! settings.save()?;
//! # Ok::<(), relaycraft_settings::SettingsError>(())
//! ```

mod config;

pub use config::{LoggingSettings, Settings};

use std::path::PathBuf;

use relaycraft_core::CoreError;
use thiserror::Error;

/// Overrides the directory holding `settings.json`.
pub const CONFIG_DIR_ENV: &str = "RELAYCRAFT_CONFIG_DIR";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    ReadError(std::io::Error),

    #[error("Failed to write settings: {0}")]
    WriteError(std::io::Error),

    #[error("Failed to parse settings: {0}")]
    ParseError(serde_json::Error),

    #[error("Failed to create config directory: {0}")]
    CreateDirError(std::io::Error),

    #[error("Invalid params: {0}")]
    InvalidParams(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Directory holding the settings file
pub fn default_config_dir() -> PathBuf {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(".relaycraft"),
    }
}

/// Get the default settings file path
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}
