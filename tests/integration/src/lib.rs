//! Integration tests for the SMS4Dev server.
//!
//! These tests require a running server at `localhost:5081` started with
//! `SMS4DEV_DEV_MODE=true` (or with the credential given in
//! `SMS4DEV_TEST_KEY_ID` / `SMS4DEV_TEST_KEY_SECRET`). They are marked
//! `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p sms4dev-integration -- --ignored
//! ```

use std::sync::Once;

use sms4dev_auth::{Payload, RequestDescriptor, RequestSigner};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("SMS4DEV_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:5081".to_owned())
}

/// Access key id used by the tests.
#[must_use]
pub fn key_id() -> String {
    std::env::var("SMS4DEV_TEST_KEY_ID").unwrap_or_else(|_| "SMS4DEV_KEY_EXAMPLE".to_owned())
}

/// Secret matching [`key_id`].
#[must_use]
pub fn key_secret() -> String {
    std::env::var("SMS4DEV_TEST_KEY_SECRET")
        .unwrap_or_else(|_| "SMS4DEV_SECRET_EXAMPLE".to_owned())
}

/// Create an HTTP client.
#[must_use]
pub fn client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::new()
}

/// Build a request carrying the static key and secret headers.
#[must_use]
pub fn static_request(
    client: &reqwest::Client,
    method: reqwest::Method,
    path: &str,
    secret: &str,
) -> reqwest::RequestBuilder {
    client
        .request(method, format!("{}{path}", endpoint_url()))
        .header("X-SMS4DEV-KEY", key_id())
        .header("X-SMS4DEV-SECRET", secret)
}

/// Build a signed request.
///
/// Query values are put into the URL as-is, so they must not need encoding.
/// `timestamp` defaults to the current time.
#[must_use]
pub fn signed_request(
    client: &reqwest::Client,
    method: reqwest::Method,
    path: &str,
    query: &[(&str, &str)],
    body: Option<serde_json::Value>,
    secret: &str,
    timestamp: Option<&str>,
) -> reqwest::RequestBuilder {
    let mut descriptor = RequestDescriptor::new(method.as_str(), path);
    let mut url = format!("{}{path}", endpoint_url());
    if !query.is_empty() {
        let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        url.push('?');
        url.push_str(&pairs.join("&"));
    }
    for (k, v) in query {
        descriptor = descriptor.with_query(*k, *v);
    }
    if let Some(json) = &body {
        descriptor = descriptor.with_body(Payload::Json(json.clone()));
    }

    let signer = RequestSigner::new(key_id(), secret);
    let signed = match timestamp {
        Some(ts) => signer.sign(descriptor, ts),
        None => signer.sign_now(descriptor),
    };

    let mut req = client.request(method, url);
    for (name, value) in signed.headers() {
        req = req.header(name.as_str(), value.as_str());
    }
    if let Some(json) = body {
        req = req
            .header("content-type", "application/json")
            .body(serde_json::to_vec(&json).unwrap_or_default());
    }
    req
}

mod test_auth;
mod test_keys;
