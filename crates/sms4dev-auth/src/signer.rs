//! HMAC-SHA256 request signing.
//!
//! The server side only needs [`sign`] and [`hash_payload`]. [`RequestSigner`]
//! is the client half of the scheme: it stamps a request with the key,
//! timestamp and signature headers so that [`crate::Authenticator`] accepts it.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};

use crate::canonical::build_string_to_sign;
use crate::credentials::SecretKey;
use crate::request::{KEY_HEADER, RequestDescriptor, SIGNATURE_HEADER, TIMESTAMP_HEADER};

type HmacSha256 = Hmac<Sha256>;

/// Compute `Base64(HMAC-SHA256(secret, string_to_sign))`.
///
/// Both inputs are taken as UTF-8 bytes, so the output is identical on every
/// platform.
///
/// # Examples
///
/// ```
/// use sms4dev_auth::signer::sign;
///
/// assert_eq!(sign("S1", "hello"), "4flUL0RaRmR9GIsoDmoA2YS1qdVYQQtFZZKCGGknbzk=");
/// ```
#[must_use]
pub fn sign(secret: &str, string_to_sign: &str) -> String {
    STANDARD.encode(hmac_sha256(secret.as_bytes(), string_to_sign.as_bytes()))
}

/// Compute the SHA-256 hash of the given payload as lower-case hex.
///
/// # Examples
///
/// ```
/// use sms4dev_auth::signer::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Format an instant the way browsers' `Date.toISOString()` does.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use sms4dev_auth::signer::format_timestamp;
///
/// let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
/// assert_eq!(format_timestamp(t), "2024-05-01T12:00:00.000Z");
/// ```
#[must_use]
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Client-side signer holding one credential.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    access_key_id: String,
    secret: SecretKey,
}

impl RequestSigner {
    /// Create a signer for the given credential.
    pub fn new(access_key_id: impl Into<String>, secret: impl Into<SecretKey>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret: secret.into(),
        }
    }

    /// The headers a client must send for `request` signed at `timestamp`.
    ///
    /// The key and timestamp headers take part in the canonical string, so
    /// they are added to the request before the signature is computed.
    #[must_use]
    pub fn signature_headers(
        &self,
        request: &RequestDescriptor,
        timestamp: &str,
    ) -> [(&'static str, String); 3] {
        let stamped = request
            .clone()
            .replace_header(KEY_HEADER, self.access_key_id.as_str())
            .replace_header(TIMESTAMP_HEADER, timestamp);
        let signature = sign(
            self.secret.expose(),
            &build_string_to_sign(&stamped, timestamp),
        );

        [
            (KEY_HEADER, self.access_key_id.clone()),
            (TIMESTAMP_HEADER, timestamp.to_owned()),
            (SIGNATURE_HEADER, signature),
        ]
    }

    /// Return `request` with the key, timestamp and signature headers set.
    #[must_use]
    pub fn sign(&self, request: RequestDescriptor, timestamp: &str) -> RequestDescriptor {
        self.signature_headers(&request, timestamp)
            .into_iter()
            .fold(request, |req, (name, value)| req.replace_header(name, value))
    }

    /// Sign `request` with the current time.
    #[must_use]
    pub fn sign_now(&self, request: RequestDescriptor) -> RequestDescriptor {
        self.sign(request, &format_timestamp(Utc::now()))
    }
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
