//! Typed error handling for the hub
//!
//! The hub's failure domains are deliberately narrow: admission (the only
//! errors a client ever observes, as a refused upgrade), configuration, and
//! collaborator calls (always logged and swallowed). Delivery failures are
//! not modeled as errors at all: a dead connection is torn down and its
//! siblings proceed; nothing in this crate is fatal to the process.
//!
//! # Example
//!
//! ```rust,ignore
//! use huddle::core::error::{AdmissionError, HubError};
//!
//! match verifier.verify(token).await {
//!     Ok(user_id) => admit(user_id),
//!     Err(AdmissionError::ExpiredToken) => refuse_quietly(),
//!     Err(e) => refuse_and_log(e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main error type for the hub
#[derive(Debug)]
pub enum HubError {
    /// Connection admission errors (refused upgrades)
    Admission(AdmissionError),

    /// Configuration errors
    Config(ConfigError),

    /// Collaborator call errors (logged and swallowed by callers)
    Collaborator(CollaboratorError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubError::Admission(e) => write!(f, "{}", e),
            HubError::Config(e) => write!(f, "{}", e),
            HubError::Collaborator(e) => write!(f, "{}", e),
            HubError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for HubError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HubError::Admission(e) => Some(e),
            HubError::Config(e) => Some(e),
            HubError::Collaborator(e) => Some(e),
            HubError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl HubError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            HubError::Admission(_) => StatusCode::UNAUTHORIZED,
            HubError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HubError::Collaborator(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HubError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            HubError::Admission(e) => e.error_code(),
            HubError::Config(_) => "CONFIG_ERROR",
            HubError::Collaborator(e) => e.error_code(),
            HubError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Admission Errors
// =============================================================================

/// Errors refusing a connection before the upgrade completes
///
/// No hub state exists when one of these is returned; nothing is surfaced to
/// any other party.
#[derive(Debug)]
pub enum AdmissionError {
    /// No credential token on the upgrade request
    MissingToken,

    /// Token failed signature or structural validation
    InvalidToken { message: String },

    /// Token signature is valid but the token has expired
    ExpiredToken,

    /// Token resolved to a principal the verifier does not know
    UnknownPrincipal,
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionError::MissingToken => write!(f, "No token provided"),
            AdmissionError::InvalidToken { message } => {
                write!(f, "Invalid token: {}", message)
            }
            AdmissionError::ExpiredToken => write!(f, "Token expired"),
            AdmissionError::UnknownPrincipal => write!(f, "Unknown principal"),
        }
    }
}

impl std::error::Error for AdmissionError {}

impl AdmissionError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AdmissionError::MissingToken => "MISSING_TOKEN",
            AdmissionError::InvalidToken { .. } => "INVALID_TOKEN",
            AdmissionError::ExpiredToken => "EXPIRED_TOKEN",
            AdmissionError::UnknownPrincipal => "UNKNOWN_PRINCIPAL",
        }
    }
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        HubError::Admission(self).into_response()
    }
}

impl From<AdmissionError> for HubError {
    fn from(err: AdmissionError) -> Self {
        HubError::Admission(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found
    FileNotFound { path: String },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for HubError {
    fn from(err: ConfigError) -> Self {
        HubError::Config(err)
    }
}

// =============================================================================
// Collaborator Errors
// =============================================================================

/// Errors from external collaborators
///
/// These never propagate past the hub boundary: a failed notification fetch
/// or presence write is logged and the live path continues.
#[derive(Debug)]
pub enum CollaboratorError {
    /// Pending-notification fetch failed during registration
    NotificationFetch { message: String },

    /// Best-effort presence write failed
    PresencePersist { message: String },
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollaboratorError::NotificationFetch { message } => {
                write!(f, "Notification fetch failed: {}", message)
            }
            CollaboratorError::PresencePersist { message } => {
                write!(f, "Presence persist failed: {}", message)
            }
        }
    }
}

impl std::error::Error for CollaboratorError {}

impl CollaboratorError {
    pub fn error_code(&self) -> &'static str {
        match self {
            CollaboratorError::NotificationFetch { .. } => "NOTIFICATION_FETCH_FAILED",
            CollaboratorError::PresencePersist { .. } => "PRESENCE_PERSIST_FAILED",
        }
    }
}

impl From<CollaboratorError> for HubError {
    fn from(err: CollaboratorError) -> Self {
        HubError::Collaborator(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<std::io::Error> for HubError {
    fn from(err: std::io::Error) -> Self {
        HubError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for HubError {
    fn from(err: serde_yaml::Error) -> Self {
        HubError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for hub operations
pub type HubResult<T> = Result<T, HubError>;

// =============================================================================
// Tests
// =============================================================================
