//! Request router.
//!
//! Routing is by method and path only:
//!
//! ```text
//! GET    /health, /_health       health probe              (public)
//! GET    /api/auth/verify        authenticated identity
//! GET    /api/keys               list keys, secrets masked
//! POST   /api/keys               create {"keyId","secret"}
//! POST   /api/keys/generate      generate a random key
//! DELETE /api/keys/{keyId}       delete a key
//! POST   /api/keys/validate      validate {"keyId","secret"} (public)
//! OPTIONS *                      CORS preflight            (public)
//! ```

use std::fmt;

use percent_encoding::percent_decode_str;

use crate::error::ApiError;

const KEYS_PATH: &str = "/api/keys";

/// An API operation resolved from method and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOperation {
    /// Liveness probe.
    Health,
    /// CORS preflight.
    Preflight,
    /// Echo the identity the request authenticated as.
    VerifyAuth,
    /// List credentials with masked secrets.
    ListKeys,
    /// Register a caller-chosen credential.
    CreateKey,
    /// Generate a random credential.
    GenerateKey,
    /// Delete a credential.
    DeleteKey {
        /// Percent-decoded key id from the path.
        key_id: String,
    },
    /// Check a key/secret pair.
    ValidateKey,
}

impl ApiOperation {
    /// Operation name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::Preflight => "Preflight",
            Self::VerifyAuth => "VerifyAuth",
            Self::ListKeys => "ListKeys",
            Self::CreateKey => "CreateKey",
            Self::GenerateKey => "GenerateKey",
            Self::DeleteKey { .. } => "DeleteKey",
            Self::ValidateKey => "ValidateKey",
        }
    }

    /// Whether the request must pass the authenticator before dispatch.
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Health | Self::Preflight | Self::ValidateKey)
    }
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the operation for a method and path.
///
/// A single trailing slash is ignored.
pub fn resolve_operation(method: &http::Method, path: &str) -> Result<ApiOperation, ApiError> {
    if method == http::Method::OPTIONS {
        return Ok(ApiOperation::Preflight);
    }

    let normalized = match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path,
    };

    let allow = |op: ApiOperation, expected: &http::Method| {
        if method == expected {
            Ok(op)
        } else {
            Err(ApiError::method_not_allowed(method, path))
        }
    };

    match normalized {
        "/health" | "/_health" => allow(ApiOperation::Health, &http::Method::GET),
        "/api/auth/verify" => allow(ApiOperation::VerifyAuth, &http::Method::GET),
        KEYS_PATH if method == http::Method::GET => Ok(ApiOperation::ListKeys),
        KEYS_PATH => allow(ApiOperation::CreateKey, &http::Method::POST),
        "/api/keys/generate" if method != http::Method::DELETE => {
            allow(ApiOperation::GenerateKey, &http::Method::POST)
        }
        "/api/keys/validate" if method != http::Method::DELETE => {
            allow(ApiOperation::ValidateKey, &http::Method::POST)
        }
        other => match other.strip_prefix("/api/keys/") {
            Some(raw) if !raw.is_empty() && !raw.contains('/') => {
                let key_id = percent_decode_str(raw)
                    .decode_utf8()
                    .map_err(|_| ApiError::invalid_request("key id is not valid UTF-8"))?
                    .into_owned();
                allow(ApiOperation::DeleteKey { key_id }, &http::Method::DELETE)
            }
            _ => Err(ApiError::not_found(path)),
        },
    }
}
