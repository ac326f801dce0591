//! Access key lifecycle: list, create, generate, delete and public validate.
//!
//! Every operation except [`KeyManager::validate_public`] must only be
//! reached after the request was authenticated. The HTTP layer enforces that.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::{info, warn};

use crate::credentials::{
    CredentialProvider, CredentialStore, MaskedCredential, SecretKey, Validation,
};
use crate::error::AuthError;

/// Prefix of generated key ids.
pub const GENERATED_KEY_PREFIX: &str = "SMS4DEV";

/// Random bytes behind a generated key id (20 hex characters).
const KEY_ID_RANDOM_BYTES: usize = 10;

/// Random bytes behind a generated secret (40 Base64 characters).
const SECRET_RANDOM_BYTES: usize = 30;

/// Attempts before giving up on finding an unused key id.
const MAX_GENERATE_ATTEMPTS: usize = 8;

/// A freshly generated credential. This is the only time the secret is shown.
#[derive(Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedKey {
    /// The new access key id.
    pub key_id: String,
    /// The new secret, in full.
    pub secret: String,
}

impl std::fmt::Debug for GeneratedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedKey")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Key management operations over a shared [`CredentialStore`].
#[derive(Debug, Clone)]
pub struct KeyManager {
    store: Arc<CredentialStore>,
    protected_key: Option<String>,
}

impl KeyManager {
    /// Create a manager with no protected key.
    #[must_use]
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self {
            store,
            protected_key: None,
        }
    }

    /// Refuse deletion of `key_id`. Used for the development example key.
    #[must_use]
    pub fn with_protected_key(mut self, key_id: impl Into<String>) -> Self {
        self.protected_key = Some(key_id.into());
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// All credentials, secrets masked, in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<MaskedCredential> {
        self.store.list()
    }

    /// Register a caller-chosen credential.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidRequest`] for a blank key id or secret,
    /// [`AuthError::KeyAlreadyExists`] if the key id is taken.
    pub fn create(&self, key_id: &str, secret: &str) -> Result<MaskedCredential, AuthError> {
        let key_id = key_id.trim();
        if key_id.is_empty() {
            return Err(AuthError::InvalidRequest("keyId must not be empty".to_owned()));
        }
        if secret.is_empty() {
            return Err(AuthError::InvalidRequest("secret must not be empty".to_owned()));
        }
        if !self.store.insert_new(key_id, secret) {
            return Err(AuthError::KeyAlreadyExists(key_id.to_owned()));
        }
        info!(key_id, "access key created");
        Ok(MaskedCredential {
            key_id: key_id.to_owned(),
            masked_secret: SecretKey::new(secret).masked(),
        })
    }

    /// Generate and store a random credential.
    ///
    /// # Errors
    ///
    /// [`AuthError::KeyAlreadyExists`] if no unused key id was found within a
    /// few attempts. With 80 random bits per id this does not happen in
    /// practice.
    pub fn generate(&self) -> Result<GeneratedKey, AuthError> {
        let mut last = String::new();
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let key_id = generate_key_id();
            let secret = generate_secret();
            if self.store.insert_new(key_id.as_str(), secret.as_str()) {
                info!(key_id = %key_id, "access key generated");
                return Ok(GeneratedKey { key_id, secret });
            }
            warn!(key_id = %key_id, "generated key id collided, retrying");
            last = key_id;
        }
        Err(AuthError::KeyAlreadyExists(last))
    }

    /// Remove a credential.
    ///
    /// # Errors
    ///
    /// [`AuthError::KeyProtected`] for the protected key,
    /// [`AuthError::KeyNotFound`] if the key id is unknown.
    pub fn delete(&self, key_id: &str) -> Result<(), AuthError> {
        if self.protected_key.as_deref() == Some(key_id) {
            warn!(key_id, "refusing to delete protected access key");
            return Err(AuthError::KeyProtected(key_id.to_owned()));
        }
        if !self.store.remove(key_id) {
            return Err(AuthError::KeyNotFound(key_id.to_owned()));
        }
        info!(key_id, "access key deleted");
        Ok(())
    }

    /// Check a key/secret pair without requiring prior authentication.
    #[must_use]
    pub fn validate_public(&self, key_id: &str, secret: &str) -> Validation {
        self.store.validate(key_id, secret)
    }
}

/// `SMS4DEV` followed by 20 upper-case hex characters.
fn generate_key_id() -> String {
    let buf: [u8; KEY_ID_RANDOM_BYTES] = rand::random();
    format!("{GENERATED_KEY_PREFIX}{}", hex::encode_upper(buf))
}

/// 40 URL-safe Base64 characters.
fn generate_secret() -> String {
    let buf: [u8; SECRET_RANDOM_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::credentials::ValidationFailure;
    use crate::error::ErrorCode;

    fn manager() -> KeyManager {
        KeyManager::new(Arc::new(CredentialStore::from_pairs([("K1", "S1")])))
    }

    #[test]
    fn test_should_generate_well_formed_key_ids_and_secrets() {
        let id = generate_key_id();
        assert_eq!(id.len(), GENERATED_KEY_PREFIX.len() + 20);
        assert!(id.starts_with(GENERATED_KEY_PREFIX));
        assert!(
            id[GENERATED_KEY_PREFIX.len()..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );

        let secret = generate_secret();
        assert_eq!(secret.len(), 40);
        assert!(
            secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_should_generate_distinct_usable_keys_with_secret_only_once() {
        let keys = manager();
        let first = keys.generate().unwrap();
        let second = keys.generate().unwrap();
        assert_ne!(first.key_id, second.key_id);
        assert_ne!(first.secret, second.secret);

        assert!(keys.validate_public(&first.key_id, &first.secret).valid);
        assert!(keys.validate_public(&second.key_id, &second.secret).valid);

        let listing = keys.list();
        assert_eq!(listing.len(), 3);
        for entry in &listing {
            assert_ne!(entry.masked_secret, first.secret);
            assert_ne!(entry.masked_secret, second.secret);
            assert!(entry.masked_secret.starts_with("********"));
        }
    }

    #[test]
    fn test_should_generate_many_unique_ids() {
        let keys = manager();
        let ids: HashSet<String> = (0..200).map(|_| keys.generate().unwrap().key_id).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_should_create_and_reject_duplicates() {
        let keys = manager();
        let created = keys.create("K2", "secret-two").unwrap();
        assert_eq!(created.key_id, "K2");
        assert_eq!(created.masked_secret, "********-two");

        let err = keys.create("K2", "other").unwrap_err();
        assert_eq!(err.code(), ErrorCode::KeyAlreadyExists);
        assert!(keys.validate_public("K2", "secret-two").valid);
    }

    #[test]
    fn test_should_reject_blank_create_input() {
        let keys = manager();
        assert_eq!(
            keys.create("  ", "x").unwrap_err().code(),
            ErrorCode::InvalidRequest
        );
        assert_eq!(
            keys.create("K3", "").unwrap_err().code(),
            ErrorCode::InvalidRequest
        );
        assert_eq!(keys.list().len(), 1);
    }

    #[test]
    fn test_should_delete_and_report_missing_keys() {
        let keys = manager();
        keys.delete("K1").unwrap();
        assert!(keys.list().is_empty());
        assert_eq!(keys.delete("K1").unwrap_err().code(), ErrorCode::KeyNotFound);
        assert_eq!(
            keys.validate_public("K1", "S1").reason,
            Some(ValidationFailure::NotFound)
        );
    }

    #[test]
    fn test_should_protect_designated_key() {
        let keys = manager().with_protected_key("K1");
        assert_eq!(keys.delete("K1").unwrap_err().code(), ErrorCode::KeyProtected);
        assert!(keys.store().contains("K1"));
    }

    #[test]
    fn test_should_validate_publicly_with_reasons() {
        let keys = manager();
        assert!(keys.validate_public("K1", "S1").valid);
        assert_eq!(
            keys.validate_public("K1", "S2").reason,
            Some(ValidationFailure::Mismatch)
        );
        assert_eq!(
            keys.validate_public("nobody", "S1").reason,
            Some(ValidationFailure::NotFound)
        );
    }

    #[test]
    fn test_should_redact_generated_secret_in_debug() {
        let generated = manager().generate().unwrap();
        assert!(!format!("{generated:?}").contains(&generated.secret));
    }
}
