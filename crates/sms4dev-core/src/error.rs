//! Error types for the SMS4Dev core.

/// Core error type for SMS4Dev infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum Sms4devError {
    /// An environment variable holds a value that cannot be used.
    #[error("invalid value for {name}: {reason}")]
    InvalidEnv {
        /// Name of the offending variable.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for SMS4Dev operations.
pub type Sms4devResult<T> = Result<T, Sms4devError>;
