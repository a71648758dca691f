//! Error types for the OTRS client.
//!
//! This module defines `OtrsError`, the unified error type used throughout
//! the crate for consistent error handling and propagation.
//!
//! # Security
//!
//! The agent password travels in every credential-authenticated request
//! body, so any text derived from a request or response must be passed
//! through [`OtrsError::sanitize_message`] before it is logged or returned.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for all OTRS operations.
#[derive(Error, Debug)]
pub enum OtrsError {
    /// Configuration error - missing or invalid environment variables.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP request failed during transmission.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// HTTP response returned a non-success status code without a SOAP fault.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code returned.
        status: reqwest::StatusCode,
        /// The (truncated) response body.
        body: String,
    },

    /// Request timed out.
    #[error("request timed out after {duration:?} - the server may be slow or unreachable")]
    Timeout {
        /// How long we waited before timing out.
        duration: Duration,
        /// The SOAP operation that timed out.
        operation: String,
    },

    /// The HTTP layer rejected our credentials.
    #[error("authentication failed - check OTRS_LOGIN and OTRS_PASSWORD")]
    Authentication,

    /// An operation needing authentication was called without credentials or a session.
    #[error("not authenticated - call register_credentials() or session_create() first")]
    NotAuthenticated,

    /// The SOAP layer returned a `Fault` element.
    #[error("SOAP fault {code}: {message}")]
    SoapFault {
        /// Content of `faultcode`.
        code: String,
        /// Content of `faultstring`.
        message: String,
    },

    /// The GenericTicketConnector returned an `Error` element.
    #[error("OTRS error {code}: {message}")]
    Remote {
        /// Content of `ErrorCode`, e.g. `TicketGet.AccessDenied`.
        code: String,
        /// Content of `ErrorMessage`.
        message: String,
    },

    /// The response body was not well-formed XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The response was well-formed XML but not what the operation expects.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A field value could not be coerced to its schema type.
    #[error("invalid value for {field}: {value:?} is not an integer")]
    InvalidField {
        /// The XML field name.
        field: String,
        /// The raw value that failed coercion.
        value: String,
    },

    /// Input validation failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Reading an attachment from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Attachment content was not valid base64.
    #[error("attachment content is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// JSON serialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OtrsError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        OtrsError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        OtrsError::Config(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        OtrsError::Validation(message.into())
    }

    /// Creates a malformed response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        OtrsError::MalformedResponse(message.into())
    }

    /// Creates a coercion error for a numeric field.
    pub fn invalid_field(field: impl Into<String>, value: impl Into<String>) -> Self {
        OtrsError::InvalidField {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration, operation: impl Into<String>) -> Self {
        OtrsError::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Returns true if the server refused the credentials or session.
    ///
    /// OTRS reports these as `<Operation>.AuthFail` error codes, or as
    /// `SessionCreate.AuthFail` when logging in.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        match self {
            OtrsError::Authentication | OtrsError::NotAuthenticated => true,
            OtrsError::Remote { code, .. } => code.ends_with(".AuthFail"),
            _ => false,
        }
    }

    /// Replaces every occurrence of `secret` in `message` with `[REDACTED]`.
    #[must_use]
    pub fn sanitize_message(message: &str, secret: &str) -> String {
        if secret.is_empty() {
            return message.to_string();
        }
        message.replace(secret, "[REDACTED]")
    }

    /// Redacts `secret` from the server-supplied text of this error.
    #[must_use]
    pub fn redacted(self, secret: &str) -> Self {
        match self {
            OtrsError::SoapFault { code, message } => OtrsError::SoapFault {
                code,
                message: Self::sanitize_message(&message, secret),
            },
            OtrsError::Remote { code, message } => OtrsError::Remote {
                code,
                message: Self::sanitize_message(&message, secret),
            },
            OtrsError::HttpStatus { status, body } => OtrsError::HttpStatus {
                status,
                body: Self::sanitize_message(&body, secret),
            },
            other => other,
        }
    }

    /// Display message with `secret` redacted.
    #[must_use]
    pub fn sanitized_display(&self, secret: &str) -> String {
        Self::sanitize_message(&self.to_string(), secret)
    }
}
