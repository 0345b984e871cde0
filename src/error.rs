// src/error.rs

//! Unified error handling for the sniper application.

use std::fmt;

use thiserror::Error;

/// Result type alias for sniper operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Portal authentication failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Malformed doctor locator id
    #[error("Invalid doctor locator '{locator}': {message}")]
    Locator { locator: String, message: String },

    /// Seen-appointment store error
    #[error("Storage error for {context}: {message}")]
    Storage { context: String, message: String },

    /// Portal query error
    #[error("Portal error for {context}: {message}")]
    Portal { context: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Create a locator parsing error.
    pub fn locator(locator: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Locator {
            locator: locator.into(),
            message: message.to_string(),
        }
    }

    /// Create a storage error with context.
    pub fn storage(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Storage {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a portal error with context.
    pub fn portal(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Portal {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
