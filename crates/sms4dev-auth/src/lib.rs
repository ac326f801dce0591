//! Request authentication for the SMS4Dev mock SMS provider.
//!
//! Two schemes are accepted on every protected endpoint:
//!
//! - **Static**: the plaintext `X-SMS4DEV-KEY` and `X-SMS4DEV-SECRET` headers
//!   are compared against the credential store.
//! - **HMAC**: the request carries `X-SMS4DEV-KEY`, `X-SMS4DEV-TIMESTAMP` and
//!   `X-SMS4DEV-SIGNATURE`, where the signature is
//!   `Base64(HMAC-SHA256(secret, string_to_sign))` over a canonical form of
//!   the request, and the timestamp must be within a freshness window.
//!
//! The crate also owns the in-memory credential store and the access key
//! lifecycle built on it.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sms4dev_auth::{
//!     Authenticator, AuthenticatorConfig, CredentialStore, RequestDescriptor, RequestSigner,
//! };
//!
//! let store = Arc::new(CredentialStore::from_pairs([("K1", "S1")]));
//! let authenticator = Authenticator::new(store, AuthenticatorConfig::default());
//!
//! let request = RequestSigner::new("K1", "S1")
//!     .sign_now(RequestDescriptor::new("GET", "/api/messages"));
//! assert!(authenticator.authenticate(&request).allowed);
//! ```
//!
//! # Modules
//!
//! - [`authenticator`] - Mode selection and request verification
//! - [`canonical`] - Canonical string-to-sign construction
//! - [`compare`] - Constant-time equality
//! - [`credentials`] - Credential provider trait and in-memory store
//! - [`error`] - Authentication error types and codes
//! - [`keys`] - Access key lifecycle
//! - [`request`] - Transport-independent request descriptor
//! - [`signer`] - HMAC-SHA256 signing and the client-side signer

pub mod authenticator;
pub mod canonical;
pub mod compare;
pub mod credentials;
pub mod error;
pub mod keys;
pub mod request;
pub mod signer;

pub use authenticator::{
    AuthContext, AuthDecision, AuthMode, Authenticator, AuthenticatorConfig, Credentials,
};
pub use credentials::{
    CredentialProvider, CredentialStore, MaskedCredential, SecretKey, Validation,
    ValidationFailure,
};
pub use error::{AuthError, ErrorCode};
pub use keys::{GeneratedKey, KeyManager};
pub use request::{Payload, RequestDescriptor};
pub use signer::{RequestSigner, format_timestamp, hash_payload, sign};
