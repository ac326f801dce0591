//! Canonical request construction for SMS4Dev signed requests.
//!
//! The string to sign is seven newline-separated segments:
//!
//! ```text
//! HTTPMethod\n
//! Path\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! SignedHeaders\n
//! HashedPayload\n
//! Timestamp
//! ```
//!
//! Clients and server must agree on this byte for byte. Any change to the
//! segment order, the encoding or the sort rule is a new wire format and
//! must bump [`CANONICAL_VERSION`].

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::request::{RequestDescriptor, SIGNATURE_HEADER, is_scheme_header};
use crate::signer::hash_payload;

/// Version of the canonical string format.
pub const CANONICAL_VERSION: u32 = 1;

/// Characters left as-is by JavaScript's `encodeURIComponent`.
///
/// Everything else, including `&`, `=` and `+`, is percent-encoded.
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Build the string to sign for a request and its timestamp.
///
/// # Examples
///
/// ```
/// use sms4dev_auth::canonical::build_string_to_sign;
/// use sms4dev_auth::request::RequestDescriptor;
///
/// let req = RequestDescriptor::new("get", "/api/messages");
/// let sts = build_string_to_sign(&req, "2024-01-01T00:00:00.000Z");
/// assert!(sts.starts_with("GET\n/api/messages\n"));
/// assert!(sts.ends_with("\n2024-01-01T00:00:00.000Z"));
/// ```
#[must_use]
pub fn build_string_to_sign(request: &RequestDescriptor, timestamp: &str) -> String {
    let method = request.method().to_uppercase();
    let query = build_canonical_query_string(request.query());
    let headers = collect_signed_headers(request.headers());
    let canonical_headers = build_canonical_headers(&headers);
    let signed_headers = build_signed_headers_string(&headers);
    let payload_hash = hash_payload(&request.body().signable_bytes());

    format!(
        "{method}\n{path}\n{query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}\n{timestamp}",
        path = request.path(),
    )
}

/// Build the canonical query string.
///
/// Keys and values are encoded individually, then the `key=value` pairs are
/// sorted as whole strings so values containing `&` or `=` sort stably.
///
/// # Examples
///
/// ```
/// use sms4dev_auth::canonical::build_canonical_query_string;
///
/// let params = vec![
///     ("b".to_owned(), "2".to_owned()),
///     ("a".to_owned(), "x&y=z".to_owned()),
/// ];
/// assert_eq!(build_canonical_query_string(&params), "a=x%26y%3Dz&b=2");
/// ```
#[must_use]
pub fn build_canonical_query_string(params: &[(String, String)]) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect();
    pairs.sort_unstable();
    pairs.join("&")
}

/// Collect the signable scheme headers, keyed by lower-case name.
///
/// The signature header is excluded. Values are trimmed; repeated names are
/// folded into one comma-separated value in arrival order.
#[must_use]
pub fn collect_signed_headers(headers: &[(String, String)]) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        if !is_scheme_header(name) {
            continue;
        }
        let lower = name.to_ascii_lowercase();
        if lower == SIGNATURE_HEADER {
            continue;
        }
        let value = value.trim();
        map.entry(lower)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_owned());
    }
    map
}

/// Build the `name:value` block, one header per line, sorted by name.
#[must_use]
pub fn build_canonical_headers(headers: &BTreeMap<String, String>) -> String {
    let mut lines: Vec<String> = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect();
    lines.sort_unstable();
    lines.join("\n")
}

/// Build the `;`-separated list of signed header names.
#[must_use]
pub fn build_signed_headers_string(headers: &BTreeMap<String, String>) -> String {
    headers.keys().map(String::as_str).collect::<Vec<_>>().join(";")
}

fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT_ENCODE_SET).to_string()
}
