//! API error type.
//!
//! Authentication and key management failures carry an
//! [`sms4dev_auth::ErrorCode`]; the transport adds its own codes for unknown
//! routes, wrong methods and internal failures.

use std::fmt;

use sms4dev_auth::{AuthError, ErrorCode};

/// Error codes returned in the `Code` field of error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ApiErrorCode {
    /// An authentication or key management error.
    Auth(ErrorCode),
    /// No route matches the request path.
    NotFound,
    /// The route exists but not for this method.
    MethodNotAllowed,
    /// Unexpected server-side failure.
    InternalError,
}

impl ApiErrorCode {
    /// Returns the code string used in error bodies.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth(code) => code.as_str(),
            Self::NotFound => "NotFound",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::InternalError => "InternalError",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::Auth(code) => code.status_code(),
            Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An API error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The error code.
    pub code: ApiErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// Canonical string the server signed, attached only in development mode.
    pub string_to_sign: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::with_message(ApiErrorCode::Auth(err.code()), err.to_string())
    }
}

impl ApiError {
    /// Create a new `ApiError` with a custom message.
    #[must_use]
    pub fn with_message(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            string_to_sign: None,
        }
    }

    /// Convert an authentication error, optionally keeping the canonical
    /// string of a signature mismatch for client debugging.
    #[must_use]
    pub fn from_auth(err: AuthError, expose_string_to_sign: bool) -> Self {
        let string_to_sign = match &err {
            AuthError::SignatureDoesNotMatch { string_to_sign } if expose_string_to_sign => {
                Some(string_to_sign.clone())
            }
            _ => None,
        };
        Self {
            string_to_sign,
            ..Self::from(err)
        }
    }

    /// The HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        self.code.status_code()
    }

    // -- Convenience constructors --

    /// No route for this path.
    #[must_use]
    pub fn not_found(path: &str) -> Self {
        Self::with_message(ApiErrorCode::NotFound, format!("No route for path: {path}"))
    }

    /// The path exists but does not accept this method.
    #[must_use]
    pub fn method_not_allowed(method: &http::Method, path: &str) -> Self {
        Self::with_message(
            ApiErrorCode::MethodNotAllowed,
            format!("Method {method} is not allowed for path: {path}"),
        )
    }

    /// Malformed request payload.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::Auth(ErrorCode::InvalidRequest), message)
    }

    /// Internal server error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::InternalError, message)
    }
}
