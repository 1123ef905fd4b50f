//! Error types for recsync.
//!
//! One variant per failure class the sync engine distinguishes. The HTTP
//! layer maps each to a status code; the importer uses the distinction to
//! decide what aborts a pagination loop and what is merely collected.

use std::fmt;
use thiserror::Error;

/// The unified error type for recsync operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid tenant credential.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    /// Missing or malformed parameter or field.
    #[error("bad request: {0}")]
    BadRequest(#[from] InvalidInputError),

    /// No record exists for the requested key.
    #[error("record not found: {key}")]
    NotFound { key: String },

    /// The external API failed or returned malformed data.
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// The record store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    /// Build a `NotFound` error for a key.
    pub fn not_found(key: impl fmt::Display) -> Self {
        Error::NotFound {
            key: key.to_string(),
        }
    }
}

/// Tenant credential errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Neither a token nor a payload-carried customer id was supplied.
    #[error("missing tenant credential")]
    MissingCredential,

    /// The token could not be decoded or verified.
    #[error("invalid token: {reason}")]
    InvalidToken { reason: String },

    /// Token and payload name different customers.
    #[error("token customer '{token}' does not match payload customer '{payload}'")]
    TenantMismatch { token: String, payload: String },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// A required field or parameter is absent.
    #[error("missing required field '{field}'")]
    MissingField { field: String },

    /// Invalid customer id.
    #[error("invalid customer id '{value}': {reason}")]
    CustomerId { value: String, reason: String },

    /// Invalid record type.
    #[error("invalid record type '{value}': {reason}")]
    RecordType { value: String, reason: String },

    /// Invalid record id.
    #[error("invalid record id '{value}': {reason}")]
    RecordId { value: String, reason: String },

    /// Invalid list cursor.
    #[error("invalid cursor '{value}'")]
    Cursor { value: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

impl InvalidInputError {
    /// Shorthand for a missing field.
    pub fn missing(field: &str) -> Self {
        InvalidInputError::MissingField {
            field: field.to_string(),
        }
    }
}

/// Errors raised by calls to the external system.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Non-success HTTP response.
    #[error("{0}")]
    Http(HttpStatusError),

    /// The response body did not have the expected shape.
    #[error("malformed response: {message}")]
    Malformed { message: String },

    /// The customer has no connection to import from.
    #[error("no connection found for customer '{customer_id}'")]
    NoConnection { customer_id: String },

    /// No endpoint is configured for the requested destination.
    #[error("no endpoint configured for '{target}'")]
    NotConfigured { target: String },

    /// The action kept returning cursors past the configured page cap.
    #[error("{record_type}: page limit of {max_pages} exceeded")]
    PageLimitExceeded { record_type: String, max_pages: u32 },
}

/// A non-success HTTP response from the external system.
#[derive(Debug)]
pub struct HttpStatusError {
    /// HTTP status code.
    pub status: u16,
    /// Error message or body text from the server.
    pub message: Option<String>,
}

impl fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpStatusError {}

impl HttpStatusError {
    /// Create a new HTTP status error.
    pub fn new(status: u16, message: Option<String>) -> Self {
        Self { status, message }
    }

    /// Check if the external system rejected our credentials.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

impl From<HttpStatusError> for UpstreamError {
    fn from(err: HttpStatusError) -> Self {
        UpstreamError::Http(err)
    }
}

impl From<HttpStatusError> for Error {
    fn from(err: HttpStatusError) -> Self {
        Error::Upstream(UpstreamError::Http(err))
    }
}

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem or connection failure.
    #[error("io error: {message}")]
    Io { message: String },

    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// A stored document is unreadable.
    #[error("corrupt document at {location}: {message}")]
    Corrupt { location: String, message: String },
}
