//! Error types for modelreg
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use std::fmt;
use thiserror::Error;

/// The main error type for modelreg
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Registry Errors
    // ============================================================================
    /// An error reported by the registry service, classified by its code
    #[error("{code}: {message}")]
    Registry { code: ErrorCode, message: String },

    #[error("Registration of model '{name}' version '{version}' failed: {message}")]
    RegistrationFailed {
        name: String,
        version: String,
        message: String,
    },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Error codes reported by the registry service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ResourceAlreadyExists,
    AlreadyExists,
    ResourceDoesNotExist,
    NotFound,
    InvalidParameterValue,
    InvalidState,
    PermissionDenied,
    InternalError,
    /// A code this crate doesn't classify, kept verbatim
    Other(String),
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn as_str(&self) -> &str {
        match self {
            Self::ResourceAlreadyExists => "RESOURCE_ALREADY_EXISTS",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::ResourceDoesNotExist => "RESOURCE_DOES_NOT_EXIST",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidParameterValue => "INVALID_PARAMETER_VALUE",
            Self::InvalidState => "INVALID_STATE",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::Other(code) => code,
        }
    }

    /// Parse a wire code, keeping unknown codes as `Other`
    pub fn parse(code: &str) -> Self {
        match code {
            "RESOURCE_ALREADY_EXISTS" => Self::ResourceAlreadyExists,
            "ALREADY_EXISTS" => Self::AlreadyExists,
            "RESOURCE_DOES_NOT_EXIST" => Self::ResourceDoesNotExist,
            "NOT_FOUND" => Self::NotFound,
            "INVALID_PARAMETER_VALUE" => Self::InvalidParameterValue,
            "INVALID_STATE" => Self::InvalidState,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "INTERNAL_ERROR" => Self::InternalError,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a registry error with the given code
    pub fn registry(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Registry {
            code,
            message: message.into(),
        }
    }

    /// Create a NOT_FOUND registry error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::registry(ErrorCode::NotFound, message)
    }

    /// Create an INVALID_PARAMETER_VALUE registry error
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::registry(ErrorCode::InvalidParameterValue, message)
    }

    /// Create an unsupported operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Registry code carried by this error, if any
    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            Error::Registry { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Check if this error reports an existing resource
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self.code(),
            Some(ErrorCode::ResourceAlreadyExists | ErrorCode::AlreadyExists)
        )
    }

    /// Check if this error reports a missing resource
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Registry { code, .. } => {
                matches!(code, ErrorCode::ResourceDoesNotExist | ErrorCode::NotFound)
            }
            Error::HttpStatus { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for modelreg
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
