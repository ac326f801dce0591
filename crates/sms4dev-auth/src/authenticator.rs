//! Request authentication.
//!
//! Each request goes through the same steps:
//!
//! 1. Select the mode once from the headers present: a request carrying both
//!    `X-SMS4DEV-TIMESTAMP` and `X-SMS4DEV-SIGNATURE` is a signed request,
//!    anything else is a static-credential request.
//! 2. Static mode compares `X-SMS4DEV-SECRET` against the stored secret.
//! 3. Signed mode checks the timestamp against the freshness window,
//!    recomputes the signature over the canonical request and compares it to
//!    the provided one in constant time.
//!
//! Every rejection is terminal. The authenticator holds no per-request state
//! and can be shared across any number of concurrent requests.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::canonical::build_string_to_sign;
use crate::compare::constant_time_eq;
use crate::credentials::CredentialProvider;
use crate::error::{AuthError, ErrorCode};
use crate::request::{
    KEY_HEADER, RequestDescriptor, SECRET_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use crate::signer::sign;

/// Default maximum distance between request time and server time, in seconds.
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 900;

/// Headers a signed request must carry, as reported to clients.
const REQUIRED_SIGNED_HEADERS: [&str; 3] = [
    "X-SMS4DEV-KEY",
    "X-SMS4DEV-TIMESTAMP",
    "X-SMS4DEV-SIGNATURE",
];

/// How a request was (or would be) authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Plaintext key and secret headers.
    Static,
    /// HMAC-SHA256 signed request.
    Hmac,
    /// Admitted without credentials by the insecure escape hatch.
    Insecure,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Hmac => "hmac",
            Self::Insecure => "insecure",
        })
    }
}

/// Signature material extracted from a signed request's headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureContext<'a> {
    /// Value of `X-SMS4DEV-KEY`, if present.
    pub access_key_id: Option<&'a str>,
    /// Value of `X-SMS4DEV-TIMESTAMP`.
    pub timestamp: &'a str,
    /// Value of `X-SMS4DEV-SIGNATURE`.
    pub signature: &'a str,
}

/// Credentials presented by a request, resolved once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials<'a> {
    /// Static key/secret headers (either may be missing).
    Static {
        /// Value of `X-SMS4DEV-KEY`, if present.
        access_key_id: Option<&'a str>,
        /// Value of `X-SMS4DEV-SECRET`, if present.
        secret: Option<&'a str>,
    },
    /// Timestamp and signature headers are both present.
    Signed(SignatureContext<'a>),
}

impl<'a> Credentials<'a> {
    /// Pick the authentication mode from the headers of `request`.
    #[must_use]
    pub fn from_request(request: &'a RequestDescriptor) -> Self {
        let access_key_id = request.header(KEY_HEADER);
        match (
            request.header(TIMESTAMP_HEADER),
            request.header(SIGNATURE_HEADER),
        ) {
            (Some(timestamp), Some(signature)) => Self::Signed(SignatureContext {
                access_key_id,
                timestamp,
                signature,
            }),
            _ => Self::Static {
                access_key_id,
                secret: request.header(SECRET_HEADER),
            },
        }
    }

    /// The mode these credentials select.
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        match self {
            Self::Static { .. } => AuthMode::Static,
            Self::Signed(_) => AuthMode::Hmac,
        }
    }
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// The access key that authenticated the request; absent in insecure mode.
    pub access_key_id: Option<String>,
    /// How the request was authenticated.
    pub mode: AuthMode,
}

/// Allow/deny outcome with a structured reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Error code when denied.
    pub error: Option<ErrorCode>,
    /// Human-readable detail, safe to show to the client.
    pub detail: String,
    /// The authenticated access key, when allowed.
    pub access_key_id: Option<String>,
    /// The mode that was selected.
    pub mode: AuthMode,
}

/// Authenticator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatorConfig {
    /// Maximum `|request time - server time|`, in whole seconds.
    pub freshness_window_secs: u64,
    /// Admit requests that carry no `X-SMS4DEV-*` header at all.
    pub allow_insecure: bool,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW_SECS,
            allow_insecure: false,
        }
    }
}

/// Verifies static and signed requests against a credential provider.
pub struct Authenticator {
    credentials: Arc<dyn CredentialProvider>,
    config: AuthenticatorConfig,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("credentials", &"...")
            .field("config", &self.config)
            .finish()
    }
}

impl Authenticator {
    /// Create an authenticator reading secrets from `credentials`.
    pub fn new(credentials: Arc<dyn CredentialProvider>, config: AuthenticatorConfig) -> Self {
        if config.allow_insecure {
            warn!("insecure mode enabled: requests without credentials will be admitted");
        }
        Self {
            credentials,
            config,
        }
    }

    /// The active settings.
    #[must_use]
    pub fn config(&self) -> &AuthenticatorConfig {
        &self.config
    }

    /// Verify a request against the current wall clock.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] that rejected the request.
    pub fn verify(&self, request: &RequestDescriptor) -> Result<AuthContext, AuthError> {
        self.verify_at(request, Utc::now())
    }

    /// Verify a request as if the server clock read `now`.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] that rejected the request.
    pub fn verify_at(
        &self,
        request: &RequestDescriptor,
        now: DateTime<Utc>,
    ) -> Result<AuthContext, AuthError> {
        if self.config.allow_insecure && !request.has_scheme_headers() {
            warn!(
                method = request.method(),
                path = request.path(),
                "admitting request without credentials (insecure mode)"
            );
            return Ok(AuthContext {
                access_key_id: None,
                mode: AuthMode::Insecure,
            });
        }

        match Credentials::from_request(request) {
            Credentials::Static {
                access_key_id,
                secret,
            } => self.verify_static(access_key_id, secret),
            Credentials::Signed(context) => self.verify_signed(request, context, now),
        }
    }

    /// Verify a request and fold the outcome into an [`AuthDecision`].
    #[must_use]
    pub fn authenticate(&self, request: &RequestDescriptor) -> AuthDecision {
        self.authenticate_at(request, Utc::now())
    }

    /// [`authenticate`](Self::authenticate) with an explicit server clock.
    #[must_use]
    pub fn authenticate_at(&self, request: &RequestDescriptor, now: DateTime<Utc>) -> AuthDecision {
        match self.verify_at(request, now) {
            Ok(context) => AuthDecision {
                allowed: true,
                error: None,
                detail: "authenticated".to_owned(),
                access_key_id: context.access_key_id,
                mode: context.mode,
            },
            Err(err) => AuthDecision {
                allowed: false,
                error: Some(err.code()),
                detail: err.to_string(),
                access_key_id: None,
                mode: Credentials::from_request(request).mode(),
            },
        }
    }

    fn verify_static(
        &self,
        access_key_id: Option<&str>,
        secret: Option<&str>,
    ) -> Result<AuthContext, AuthError> {
        let (Some(access_key_id), Some(secret)) = (access_key_id, secret) else {
            debug!("static credentials missing");
            return Err(AuthError::MissingCredentials);
        };

        let validation = self.credentials.validate(access_key_id, secret);
        if let Some(reason) = validation.reason {
            warn!(access_key_id, %reason, "static credential rejected");
            return Err(AuthError::AuthFailure(reason));
        }

        debug!(access_key_id, "static credential verified");
        Ok(AuthContext {
            access_key_id: Some(access_key_id.to_owned()),
            mode: AuthMode::Static,
        })
    }

    fn verify_signed(
        &self,
        request: &RequestDescriptor,
        context: SignatureContext<'_>,
        now: DateTime<Utc>,
    ) -> Result<AuthContext, AuthError> {
        let Some(access_key_id) = context.access_key_id else {
            debug!("signed request without access key");
            return Err(AuthError::MissingHeaders(REQUIRED_SIGNED_HEADERS.to_vec()));
        };

        let timestamp = DateTime::parse_from_rfc3339(context.timestamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| AuthError::InvalidTimestamp(context.timestamp.to_owned()))?;

        let skew = (now - timestamp).abs();
        let window_secs = self.config.freshness_window_secs;
        let window = i64::try_from(window_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        if skew > window {
            let skew_secs = skew.num_seconds();
            warn!(access_key_id, skew_secs, window_secs, "signed request outside freshness window");
            return Err(AuthError::TimestampExpired {
                skew_secs,
                window_secs,
            });
        }

        let secret = self.credentials.get_secret_key(access_key_id).inspect_err(|_| {
            warn!(access_key_id, "signed request with unknown access key");
        })?;

        let string_to_sign = build_string_to_sign(request, context.timestamp);
        debug!(access_key_id, %string_to_sign, "verifying signature");

        let expected = sign(secret.expose(), &string_to_sign);
        if constant_time_eq(expected.as_bytes(), context.signature.as_bytes()) {
            debug!(access_key_id, "signature verification succeeded");
            Ok(AuthContext {
                access_key_id: Some(access_key_id.to_owned()),
                mode: AuthMode::Hmac,
            })
        } else {
            warn!(access_key_id, "signature mismatch");
            Err(AuthError::SignatureDoesNotMatch { string_to_sign })
        }
    }
}
