//! Error types for aibuild core
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for the core crate
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed project properties: {0}")]
    Properties(String),

    #[error("Malformed form file {file}: {message}")]
    Form { file: String, message: String },

    #[error("Project error: {0}")]
    Project(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Io(e) => format!("File operation failed: {}", e),
            CoreError::Properties(msg) => format!("The project settings are invalid: {}", msg),
            CoreError::Form { file, .. } => format!("The screen file {} could not be read", file),
            CoreError::NotFound(msg) => format!("Not found: {}", msg),
            _ => self.to_string(),
        }
    }
}
