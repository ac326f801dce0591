//! Configuration management for SMS4Dev.
//!
//! All configuration is driven by environment variables. Credentials can be
//! seeded at startup either as a single pair (`SMS4DEV_ACCESS_KEY_ID` +
//! `SMS4DEV_ACCESS_KEY_SECRET`) or as a list (`SMS4DEV_ACCESS_KEYS`, formatted
//! `id:secret,id:secret`).

use tracing::warn;

use crate::error::{Sms4devError, Sms4devResult};

/// Access key id of the example credential seeded in development mode.
pub const EXAMPLE_ACCESS_KEY_ID: &str = "SMS4DEV_KEY_EXAMPLE";

/// Secret of the example credential seeded in development mode.
pub const EXAMPLE_ACCESS_KEY_SECRET: &str = "SMS4DEV_SECRET_EXAMPLE";

/// Default freshness window for signed requests, in seconds.
const DEFAULT_TIMESTAMP_WINDOW_SECS: u64 = 900;

/// Global configuration for SMS4Dev.
#[derive(Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sms4devConfig {
    /// Bind address for the API server.
    pub gateway_listen: String,
    /// Log level.
    pub log_level: String,
    /// Development mode: seeds and protects the example credential and adds
    /// debugging detail to signature errors.
    pub dev_mode: bool,
    /// Admit requests that carry no credential headers at all.
    pub allow_insecure_keys: bool,
    /// Maximum allowed skew between a request timestamp and the server clock.
    pub timestamp_window_secs: u64,
    /// Credentials seeded into the store at startup, as `(key_id, secret)`.
    #[serde(skip_serializing)]
    pub access_keys: Vec<(String, String)>,
}

impl std::fmt::Debug for Sms4devConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key_ids: Vec<&str> = self.access_keys.iter().map(|(id, _)| id.as_str()).collect();
        f.debug_struct("Sms4devConfig")
            .field("gateway_listen", &self.gateway_listen)
            .field("log_level", &self.log_level)
            .field("dev_mode", &self.dev_mode)
            .field("allow_insecure_keys", &self.allow_insecure_keys)
            .field("timestamp_window_secs", &self.timestamp_window_secs)
            .field("access_keys", &key_ids)
            .finish()
    }
}

impl Default for Sms4devConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:5081".to_owned(),
            log_level: "info".to_owned(),
            dev_mode: false,
            allow_insecure_keys: false,
            timestamp_window_secs: DEFAULT_TIMESTAMP_WINDOW_SECS,
            access_keys: Vec::new(),
        }
    }
}

impl Sms4devConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Sms4devError::InvalidEnv`] if a variable is present but
    /// malformed.
    pub fn from_env() -> Sms4devResult<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Sms4devError::InvalidEnv`] if a variable is present but
    /// malformed.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Sms4devResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        } else if let Some(port) = lookup("PORT") {
            config.gateway_listen = format!("0.0.0.0:{port}");
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("SMS4DEV_DEV_MODE") {
            config.dev_mode = parse_bool(&v);
        }
        if let Some(v) = lookup("SMS4DEV_ALLOW_INSECURE_KEYS") {
            config.allow_insecure_keys = parse_bool(&v);
        }
        if let Some(v) = lookup("SMS4DEV_TIMESTAMP_WINDOW_SECS") {
            config.timestamp_window_secs =
                v.trim().parse().map_err(|_| Sms4devError::InvalidEnv {
                    name: "SMS4DEV_TIMESTAMP_WINDOW_SECS",
                    reason: format!("expected a number of seconds, got {v:?}"),
                })?;
        }

        match (
            lookup("SMS4DEV_ACCESS_KEY_ID"),
            lookup("SMS4DEV_ACCESS_KEY_SECRET"),
        ) {
            (Some(id), Some(secret)) => config.access_keys.push((id, secret)),
            (Some(_), None) | (None, Some(_)) => {
                warn!(
                    "SMS4DEV_ACCESS_KEY_ID and SMS4DEV_ACCESS_KEY_SECRET must be set together, ignoring"
                );
            }
            (None, None) => {}
        }
        if let Some(v) = lookup("SMS4DEV_ACCESS_KEYS") {
            config.access_keys.extend(parse_access_keys(&v)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Sms4devError::Config`] for a zero freshness window, which
    /// would reject every signed request.
    pub fn validate(&self) -> Sms4devResult<()> {
        if self.timestamp_window_secs == 0 {
            return Err(Sms4devError::Config(
                "timestamp window must be at least one second".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Parse an `id:secret,id:secret` list.
///
/// Whitespace around entries is ignored and empty entries are skipped. The
/// secret is everything after the first `:`, so secrets may contain colons.
///
/// # Errors
///
/// Returns [`Sms4devError::InvalidEnv`] if an entry has no `:` or an empty
/// key id or secret.
pub fn parse_access_keys(raw: &str) -> Sms4devResult<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((id, secret)) if !id.is_empty() && !secret.is_empty() => {
                Ok((id.to_owned(), secret.to_owned()))
            }
            _ => Err(Sms4devError::InvalidEnv {
                name: "SMS4DEV_ACCESS_KEYS",
                reason: "entries must look like <key_id>:<secret>".to_owned(),
            }),
        })
        .collect()
}

fn parse_bool(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
