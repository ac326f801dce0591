//! Strongly-typed view of an incoming request.
//!
//! [`RequestDescriptor`] is built once at the HTTP boundary and passed by
//! reference to the authenticator and the canonicalizer. It owns everything
//! signing depends on: method, path, decoded query pairs, headers and body.

use bytes::Bytes;

/// Prefix shared by every header of the authentication scheme (lower-case).
pub const HEADER_PREFIX: &str = "x-sms4dev-";

/// Access key id header (both modes).
pub const KEY_HEADER: &str = "x-sms4dev-key";

/// Plaintext secret header (static mode only).
pub const SECRET_HEADER: &str = "x-sms4dev-secret";

/// ISO-8601 request time header (signed mode).
pub const TIMESTAMP_HEADER: &str = "x-sms4dev-timestamp";

/// Base64 HMAC-SHA256 signature header (signed mode).
pub const SIGNATURE_HEADER: &str = "x-sms4dev-signature";

/// Request body as seen by the signing scheme.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// No body.
    #[default]
    Empty,
    /// A JSON document. Object key order is preserved as received.
    Json(serde_json::Value),
    /// A body that is not valid JSON.
    Raw(Bytes),
}

impl Payload {
    /// Classify raw body bytes: empty, JSON, or opaque.
    #[must_use]
    pub fn from_bytes(body: &Bytes) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }
        serde_json::from_slice(body).map_or_else(|_| Self::Raw(body.clone()), Self::Json)
    }

    /// Whether this payload hashes as the empty string.
    ///
    /// Mirrors the reference client: `null`, booleans, numbers, `""`, `{}`
    /// and `[]` carry no signable content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Json(value) => match value {
                serde_json::Value::Null
                | serde_json::Value::Bool(_)
                | serde_json::Value::Number(_) => true,
                serde_json::Value::String(s) => s.is_empty(),
                serde_json::Value::Array(items) => items.is_empty(),
                serde_json::Value::Object(map) => map.is_empty(),
            },
            Self::Raw(bytes) => bytes.is_empty(),
        }
    }

    /// The exact bytes that feed the payload hash.
    #[must_use]
    pub fn signable_bytes(&self) -> Vec<u8> {
        if self.is_empty() {
            return Vec::new();
        }
        match self {
            Self::Empty => Vec::new(),
            Self::Json(value) => serde_json::to_vec(value).unwrap_or_default(),
            Self::Raw(bytes) => bytes.to_vec(),
        }
    }
}

/// Immutable description of an HTTP request, as far as authentication cares.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDescriptor {
    method: String,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Payload,
}

impl RequestDescriptor {
    /// Create a descriptor with no query, headers or body.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Build a descriptor from HTTP request parts and the collected body.
    ///
    /// Query parameters are percent-decoded here; the canonicalizer encodes
    /// them again in its own normalized form. Header values that are not
    /// valid UTF-8 are decoded lossily.
    #[must_use]
    pub fn from_parts(parts: &http::request::Parts, body: &Bytes) -> Self {
        let query = parts
            .uri
            .query()
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        Self {
            method: parts.method.as_str().to_owned(),
            path: parts.uri.path().to_owned(),
            query,
            headers,
            body: Payload::from_bytes(body),
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a header. Existing headers with the same name are kept.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a header, dropping every existing header with the same name.
    #[must_use]
    pub fn replace_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: Payload) -> Self {
        self.body = body;
        self
    }

    /// The HTTP method as received.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request path, without query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded query parameters in arrival order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// All headers in arrival order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The request body.
    #[must_use]
    pub fn body(&self) -> &Payload {
        &self.body
    }

    /// First value of a header, looked up case-insensitively.
    ///
    /// Empty values count as absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Whether any header of the authentication scheme is present.
    #[must_use]
    pub fn has_scheme_headers(&self) -> bool {
        self.headers.iter().any(|(n, _)| is_scheme_header(n))
    }
}

/// Whether a header name belongs to the `X-SMS4DEV-` namespace.
#[must_use]
pub fn is_scheme_header(name: &str) -> bool {
    name.len() >= HEADER_PREFIX.len()
        && name.as_bytes()[..HEADER_PREFIX.len()].eq_ignore_ascii_case(HEADER_PREFIX.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_descriptor_from_http_parts() {
        let (parts, ()) = http::Request::builder()
            .method("POST")
            .uri("http://localhost:5081/api/send?to=%2B123&tag=a%26b")
            .header("X-SMS4DEV-KEY", "K1")
            .header("Content-Type", "application/json")
            .body(())
            .unwrap()
            .into_parts();
        let body = Bytes::from_static(br#"{"to":"+123","body":"hi"}"#);

        let req = RequestDescriptor::from_parts(&parts, &body);
        assert_eq!(req.method(), "POST");
        assert_eq!(req.path(), "/api/send");
        assert_eq!(
            req.query(),
            &[
                ("to".to_owned(), "+123".to_owned()),
                ("tag".to_owned(), "a&b".to_owned()),
            ]
        );
        assert_eq!(req.header("x-sms4dev-key"), Some("K1"));
        assert!(matches!(req.body(), Payload::Json(_)));
    }

    #[test]
    fn test_should_look_up_headers_case_insensitively() {
        let req = RequestDescriptor::new("GET", "/").with_header("X-Sms4Dev-Timestamp", " 2024 ");
        assert_eq!(req.header(TIMESTAMP_HEADER), Some("2024"));
        assert_eq!(req.header(SIGNATURE_HEADER), None);
    }

    #[test]
    fn test_should_treat_blank_header_as_absent() {
        let req = RequestDescriptor::new("GET", "/").with_header(KEY_HEADER, "   ");
        assert_eq!(req.header(KEY_HEADER), None);
    }

    #[test]
    fn test_should_replace_header_regardless_of_case() {
        let req = RequestDescriptor::new("GET", "/")
            .with_header("X-SMS4DEV-KEY", "old")
            .replace_header(KEY_HEADER, "new");
        assert_eq!(req.headers().len(), 1);
        assert_eq!(req.header(KEY_HEADER), Some("new"));
    }

    #[test]
    fn test_should_classify_payloads() {
        assert_eq!(Payload::from_bytes(&Bytes::new()), Payload::Empty);
        assert_eq!(Payload::from_bytes(&Bytes::from_static(b"  \n")), Payload::Empty);
        assert!(matches!(
            Payload::from_bytes(&Bytes::from_static(b"{\"a\":1}")),
            Payload::Json(_)
        ));
        assert!(matches!(
            Payload::from_bytes(&Bytes::from_static(b"not json")),
            Payload::Raw(_)
        ));
    }

    #[test]
    fn test_should_treat_empty_json_values_as_empty() {
        for raw in ["{}", "[]", "null", "\"\"", "0", "true"] {
            let payload = Payload::from_bytes(&Bytes::from(raw));
            assert!(payload.is_empty(), "{raw} should count as empty");
            assert!(payload.signable_bytes().is_empty());
        }
    }

    #[test]
    fn test_should_preserve_json_key_order_in_signable_bytes() {
        let payload = Payload::from_bytes(&Bytes::from_static(br#"{ "phone": "+1", "signName": "Test" }"#));
        assert_eq!(payload.signable_bytes(), br#"{"phone":"+1","signName":"Test"}"#.to_vec());
    }

    #[test]
    fn test_should_keep_number_text_in_signable_bytes() {
        let raw: &[u8] = br#"{"n":100000000000000000000,"m":1e+21,"f":0.1,"i":-7}"#;
        let payload = Payload::from_bytes(&Bytes::copy_from_slice(raw));
        assert_eq!(payload.signable_bytes(), raw.to_vec());
    }

    #[test]
    fn test_should_detect_scheme_headers() {
        assert!(is_scheme_header("X-SMS4DEV-KEY"));
        assert!(is_scheme_header("x-sms4dev-custom"));
        assert!(!is_scheme_header("x-sms4de"));
        assert!(!is_scheme_header("content-type"));
    }
}
