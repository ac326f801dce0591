//! Core configuration and error types for the SMS4Dev mock provider.
//!
//! This crate holds the pieces shared by the authentication layer, the HTTP
//! layer and the server binary: environment-driven configuration and the
//! configuration error type.

mod config;
mod error;

pub use config::{
    EXAMPLE_ACCESS_KEY_ID, EXAMPLE_ACCESS_KEY_SECRET, Sms4devConfig, parse_access_keys,
};
pub use error::{Sms4devError, Sms4devResult};
