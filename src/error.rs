//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the client.
//! It centralizes error management, providing a consistent way to represent the
//! failures a request can run into: the server answered with an error, the request
//! could not be built, or no response arrived at all. Client-side failures
//! (validation, persisted storage, configuration) share the same type.
//!
//! `From` implementations for `reqwest::Error`, `serde_json::Error`,
//! `validator::ValidationErrors` and `std::io::Error` allow easy conversion
//! using the `?` operator.

use reqwest::StatusCode;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the client.
#[derive(Debug)]
pub enum AppError {
    /// The API rejected the credential (HTTP 401), or no live session exists.
    Unauthorized(String),
    /// The API rejected the request as malformed (HTTP 400).
    BadRequest(String),
    /// The requested resource does not exist (HTTP 404).
    NotFound(String),
    /// Any other non-success response. `message` comes from the response body.
    Api { status: u16, message: String },
    /// The request could not be built or sent (bad URL, invalid header, ...).
    Request(String),
    /// The request was sent but no response arrived (connection refused, timeout).
    Network(String),
    /// A response arrived but its body could not be decoded.
    Decode(String),
    /// Client-side input validation failed before any request was made.
    ValidationError(String),
    /// Reading or writing persisted client state failed.
    Storage(String),
    /// Invalid or missing configuration.
    Config(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Api { status, message } => write!(f, "API Error ({}): {}", status, message),
            AppError::Request(msg) => write!(f, "Request Error: {}", msg),
            AppError::Network(msg) => write!(f, "Network Error: {}", msg),
            AppError::Decode(msg) => write!(f, "Decode Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage Error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Builds the error for a non-success HTTP response.
    ///
    /// `message` is whatever the body's `message` field carried, or a
    /// generic fallback when the body had none.
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
            StatusCode::BAD_REQUEST => AppError::BadRequest(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            _ => AppError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Text suitable for a one-line alert shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg) => msg.clone(),
            AppError::Api { message, .. } => message.clone(),
            AppError::Network(_) => {
                "No response from the server. Check your connection and try again.".to_string()
            }
            AppError::Request(msg) => format!("Could not send the request: {}", msg),
            other => other.to_string(),
        }
    }

    /// Whether a query may be attempted again after this error.
    ///
    /// Only transport failures and server-side (5xx) errors qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(_) => true,
            AppError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized(_))
    }
}

/// Converts `reqwest::Error` into `AppError`.
///
/// Builder errors are request-setup failures; connect and timeout errors mean
/// no response arrived; body decoding failures become `Decode`.
impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> AppError {
        if error.is_builder() {
            AppError::Request(error.to_string())
        } else if error.is_decode() {
            AppError::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            AppError::from_status(status, error.to_string())
        } else {
            AppError::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> AppError {
        AppError::Decode(error.to_string())
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// The detailed validation messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> AppError {
        AppError::Storage(error.to_string())
    }
}
