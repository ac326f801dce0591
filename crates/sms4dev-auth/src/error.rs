//! Error types for SMS4Dev authentication and key management.
//!
//! Every failure is an [`AuthError`]. Each variant maps onto a stable,
//! machine-readable [`ErrorCode`] that the HTTP layer puts in the `Code`
//! field of error bodies.

use std::fmt;

use crate::credentials::ValidationFailure;

/// Machine-readable error codes exposed to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Static credentials did not match a stored credential.
    AuthFailure,
    /// Signed request is missing one of the required headers.
    MissingHeaders,
    /// Static request is missing the key or the secret header.
    MissingCredentials,
    /// The timestamp header is not an ISO-8601 instant.
    InvalidTimestamp,
    /// The timestamp is outside the freshness window.
    TimestampExpired,
    /// The access key of a signed request is unknown.
    InvalidAccessKey,
    /// The provided signature differs from the recomputed one.
    SignatureDoesNotMatch,
    /// A credential with this key id already exists.
    KeyAlreadyExists,
    /// No credential with this key id exists.
    KeyNotFound,
    /// The credential may not be deleted.
    KeyProtected,
    /// The request payload is malformed.
    InvalidRequest,
}

impl ErrorCode {
    /// Returns the code string used in error bodies.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthFailure => "AuthFailure",
            Self::MissingHeaders => "MissingHeaders",
            Self::MissingCredentials => "MissingCredentials",
            Self::InvalidTimestamp => "InvalidTimestamp",
            Self::TimestampExpired => "TimestampExpired",
            Self::InvalidAccessKey => "InvalidAccessKey",
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            Self::KeyAlreadyExists => "KeyAlreadyExists",
            Self::KeyNotFound => "KeyNotFound",
            Self::KeyProtected => "KeyProtected",
            Self::InvalidRequest => "InvalidRequest",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::MissingHeaders | Self::InvalidTimestamp | Self::InvalidRequest => {
                http::StatusCode::BAD_REQUEST
            }
            Self::MissingCredentials
            | Self::AuthFailure
            | Self::TimestampExpired
            | Self::InvalidAccessKey
            | Self::SignatureDoesNotMatch => http::StatusCode::UNAUTHORIZED,
            Self::KeyProtected => http::StatusCode::FORBIDDEN,
            Self::KeyNotFound => http::StatusCode::NOT_FOUND,
            Self::KeyAlreadyExists => http::StatusCode::CONFLICT,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while authenticating a request or managing credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Static mode without both `X-SMS4DEV-KEY` and `X-SMS4DEV-SECRET`.
    #[error("Missing credentials: X-SMS4DEV-KEY and X-SMS4DEV-SECRET are required")]
    MissingCredentials,

    /// Signed mode without all of the listed headers.
    #[error("Missing required headers: {}", .0.join(", "))]
    MissingHeaders(Vec<&'static str>),

    /// Static credentials were rejected. The reason is kept for logs only.
    #[error("Invalid access key or secret")]
    AuthFailure(ValidationFailure),

    /// The timestamp could not be parsed.
    #[error("Invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    /// The timestamp is too far from the server clock.
    #[error("Request timestamp is outside the allowed window of {window_secs} seconds")]
    TimestampExpired {
        /// Absolute difference between request and server time, in seconds.
        skew_secs: i64,
        /// The configured freshness window, in seconds.
        window_secs: u64,
    },

    /// The access key id of a signed request is unknown.
    #[error("Invalid access key: {0}")]
    InvalidAccessKey(String),

    /// The provided signature does not match the recomputed one.
    #[error("The request signature we calculated does not match the signature you provided")]
    SignatureDoesNotMatch {
        /// The canonical string the server signed.
        string_to_sign: String,
    },

    /// A credential with this key id already exists.
    #[error("Access key already exists: {0}")]
    KeyAlreadyExists(String),

    /// No credential with this key id exists.
    #[error("Access key not found: {0}")]
    KeyNotFound(String),

    /// The credential is protected from deletion.
    #[error("Access key is protected and cannot be deleted: {0}")]
    KeyProtected(String),

    /// The request payload is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AuthError {
    /// The machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingCredentials => ErrorCode::MissingCredentials,
            Self::MissingHeaders(_) => ErrorCode::MissingHeaders,
            Self::AuthFailure(_) => ErrorCode::AuthFailure,
            Self::InvalidTimestamp(_) => ErrorCode::InvalidTimestamp,
            Self::TimestampExpired { .. } => ErrorCode::TimestampExpired,
            Self::InvalidAccessKey(_) => ErrorCode::InvalidAccessKey,
            Self::SignatureDoesNotMatch { .. } => ErrorCode::SignatureDoesNotMatch,
            Self::KeyAlreadyExists(_) => ErrorCode::KeyAlreadyExists,
            Self::KeyNotFound(_) => ErrorCode::KeyNotFound,
            Self::KeyProtected(_) => ErrorCode::KeyProtected,
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
        }
    }
}
