//! Credential lookup and the in-memory credential store.
//!
//! [`CredentialProvider`] is the read-only seam the authenticator depends on.
//! [`CredentialStore`] implements it and adds the mutations used by key
//! management. The store lives only as long as the process.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use tracing::debug;

use crate::compare::constant_time_eq;
use crate::error::AuthError;

/// Glyphs shown in place of the hidden part of a secret.
const MASK: &str = "********";

/// Number of trailing secret characters revealed by [`SecretKey::masked`].
const VISIBLE_SUFFIX: usize = 4;

/// A secret access key. `Debug` never prints the value.
#[derive(Clone)]
pub struct SecretKey(String);

impl SecretKey {
    /// Wrap a secret value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The plaintext secret. Callers must not log it.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Display form: a fixed mask followed by the last four characters.
    ///
    /// Secrets of four characters or fewer are masked entirely. The mask
    /// length is fixed so the display form does not reveal the secret length.
    ///
    /// # Examples
    ///
    /// ```
    /// use sms4dev_auth::credentials::SecretKey;
    ///
    /// assert_eq!(SecretKey::new("SMS4DEV_SECRET_EXAMPLE").masked(), "********MPLE");
    /// assert_eq!(SecretKey::new("abc").masked(), "********");
    /// ```
    #[must_use]
    pub fn masked(&self) -> String {
        let count = self.0.chars().count();
        if count <= VISIBLE_SUFFIX {
            return MASK.to_owned();
        }
        let suffix: String = self.0.chars().skip(count - VISIBLE_SUFFIX).collect();
        format!("{MASK}{suffix}")
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

impl From<String> for SecretKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Why a key/secret pair was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFailure {
    /// The key id is unknown.
    NotFound,
    /// The key id exists but the secret differs.
    Mismatch,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not_found",
            Self::Mismatch => "mismatch",
        })
    }
}

/// Outcome of checking a key/secret pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Validation {
    /// Whether the pair matches a stored credential.
    pub valid: bool,
    /// Rejection reason, absent when valid.
    pub reason: Option<ValidationFailure>,
}

impl Validation {
    const VALID: Self = Self {
        valid: true,
        reason: None,
    };

    fn invalid(reason: ValidationFailure) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }
}

/// A credential as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedCredential {
    /// The access key id.
    pub key_id: String,
    /// The masked secret.
    pub masked_secret: String,
}

/// Trait for looking up secret access keys by access key ID.
///
/// Implementations may back this with any credential source; the
/// authenticator only ever reads through it.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the secret access key for the given access key ID.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidAccessKey`] if the access key ID is not recognized.
    fn get_secret_key(&self, access_key_id: &str) -> Result<SecretKey, AuthError>;

    /// Check a key/secret pair. The secret comparison is constant-time.
    fn validate(&self, access_key_id: &str, secret: &str) -> Validation {
        match self.get_secret_key(access_key_id) {
            Ok(stored) if constant_time_eq(stored.expose().as_bytes(), secret.as_bytes()) => {
                Validation::VALID
            }
            Ok(_) => Validation::invalid(ValidationFailure::Mismatch),
            Err(_) => Validation::invalid(ValidationFailure::NotFound),
        }
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    secrets: HashMap<String, SecretKey>,
    /// Key ids in first-insertion order, for stable listings.
    order: Vec<String>,
}

/// Thread-safe in-memory credential store.
///
/// A single read/write lock guards the map: lookups and validations share
/// the lock, additions and removals take it exclusively.
///
/// # Examples
///
/// ```
/// use sms4dev_auth::credentials::{CredentialProvider, CredentialStore};
///
/// let store = CredentialStore::from_pairs([("K1", "S1")]);
/// assert!(store.validate("K1", "S1").valid);
/// assert_eq!(store.list()[0].masked_secret, "********");
/// ```
#[derive(Debug, Default)]
pub struct CredentialStore {
    inner: RwLock<StoreInner>,
}

impl CredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `(key_id, secret)` pairs.
    ///
    /// Later duplicates overwrite earlier ones, as with [`add`](Self::add).
    pub fn from_pairs<K, S>(pairs: impl IntoIterator<Item = (K, S)>) -> Self
    where
        K: Into<String>,
        S: Into<SecretKey>,
    {
        let store = Self::new();
        for (key_id, secret) in pairs {
            store.add(key_id, secret);
        }
        store
    }

    /// Look up the secret for a key id.
    #[must_use]
    pub fn lookup(&self, key_id: &str) -> Option<SecretKey> {
        self.inner.read().secrets.get(key_id).cloned()
    }

    /// Whether a key id is present.
    #[must_use]
    pub fn contains(&self, key_id: &str) -> bool {
        self.inner.read().secrets.contains_key(key_id)
    }

    /// Insert or overwrite a credential.
    ///
    /// Adding an existing key id replaces its secret and keeps its listing
    /// position. Returns the replaced secret, if any.
    pub fn add(&self, key_id: impl Into<String>, secret: impl Into<SecretKey>) -> Option<SecretKey> {
        let key_id = key_id.into();
        let mut inner = self.inner.write();
        let previous = inner.secrets.insert(key_id.clone(), secret.into());
        if previous.is_none() {
            inner.order.push(key_id.clone());
        }
        debug!(key_id = %key_id, replaced = previous.is_some(), "stored credential");
        previous
    }

    /// Insert a credential only if the key id is absent.
    ///
    /// The check and the insert happen under one write lock. Returns `false`
    /// and leaves the store untouched if the key id already exists.
    pub fn insert_new(&self, key_id: impl Into<String>, secret: impl Into<SecretKey>) -> bool {
        let key_id = key_id.into();
        let mut inner = self.inner.write();
        if inner.secrets.contains_key(&key_id) {
            return false;
        }
        inner.secrets.insert(key_id.clone(), secret.into());
        inner.order.push(key_id);
        true
    }

    /// Remove a credential. Returns whether it existed.
    pub fn remove(&self, key_id: &str) -> bool {
        let mut inner = self.inner.write();
        let removed = inner.secrets.remove(key_id).is_some();
        if removed {
            inner.order.retain(|id| id != key_id);
            debug!(key_id, "removed credential");
        }
        removed
    }

    /// All credentials with masked secrets, in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<MaskedCredential> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|key_id| {
                inner.secrets.get(key_id).map(|secret| MaskedCredential {
                    key_id: key_id.clone(),
                    masked_secret: secret.masked(),
                })
            })
            .collect()
    }

    /// Number of stored credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().secrets.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().secrets.is_empty()
    }
}

impl CredentialProvider for CredentialStore {
    fn get_secret_key(&self, access_key_id: &str) -> Result<SecretKey, AuthError> {
        self.lookup(access_key_id)
            .ok_or_else(|| AuthError::InvalidAccessKey(access_key_id.to_owned()))
    }
}
