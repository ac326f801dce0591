//! Response serialization and error formatting.

use serde::Serialize;

use crate::body::ApiResponseBody;
use crate::error::ApiError;

/// Content type for JSON responses.
pub const CONTENT_TYPE: &str = "application/json";

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-sms4dev-request-id";

/// Serialize an error into a JSON response body.
///
/// ```json
/// {
///   "Code": "SignatureDoesNotMatch",
///   "Message": "The request signature we calculated does not match ...",
///   "RequestId": "5f0c..."
/// }
/// ```
///
/// A `StringToSign` field is added when the error carries one.
#[must_use]
pub fn error_to_json(error: &ApiError, request_id: &str) -> Vec<u8> {
    let mut body = serde_json::json!({
        "Code": error.code.as_str(),
        "Message": error.message,
        "RequestId": request_id,
    });
    if let Some(string_to_sign) = &error.string_to_sign {
        body["StringToSign"] = serde_json::Value::String(string_to_sign.clone());
    }
    serde_json::to_vec(&body).expect("JSON serialization of error cannot fail")
}

/// Convert an [`ApiError`] into a complete HTTP error response.
#[must_use]
pub fn error_to_response(error: &ApiError, request_id: &str) -> http::Response<ApiResponseBody> {
    http::Response::builder()
        .status(error.status_code())
        .header("content-type", CONTENT_TYPE)
        .header(REQUEST_ID_HEADER, request_id)
        .body(ApiResponseBody::from_bytes(error_to_json(error, request_id)))
        .expect("valid error response")
}

/// Build a JSON response with the given status.
pub fn json_response<T: Serialize>(
    status: http::StatusCode,
    value: &T,
) -> Result<http::Response<ApiResponseBody>, ApiError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| ApiError::internal_error(format!("Failed to serialize response: {e}")))?;
    Ok(http::Response::builder()
        .status(status)
        .header("content-type", CONTENT_TYPE)
        .body(ApiResponseBody::from_bytes(json))
        .expect("valid JSON response"))
}

/// Build an empty response with the given status.
#[must_use]
pub fn empty_response(status: http::StatusCode) -> http::Response<ApiResponseBody> {
    http::Response::builder()
        .status(status)
        .body(ApiResponseBody::empty())
        .expect("valid empty response")
}
