// src/error.rs

//! Unified error handling for the linksweep application.

use std::fmt;

use thiserror::Error;

/// Result type alias for linksweep operations.
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

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-supplied search parameters failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote GitHub API call failed
    #[error("GitHub API error in {context}: {message}")]
    RemoteApi { context: String, message: String },

    /// External process (git clone/branch query) failed
    #[error("Process error for {context}: {message}")]
    Process { context: String, message: String },

    /// File scan exhausted its per-file error budget
    #[error("Scan error in {file}: {message}")]
    Scan { file: String, message: String },

    /// Store read/write failed
    #[error("Store error: {0}")]
    Store(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Crawl exceeded its deadline (synthesized by the scheduler)
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Recovered panic or other internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a remote API error with operation context.
    pub fn remote_api(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::RemoteApi {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a process execution error with context.
    pub fn process(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Process {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a scan error for a file.
    pub fn scan(file: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Scan {
            file: file.into(),
            message: message.to_string(),
        }
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
