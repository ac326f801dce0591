//! API handler trait and operation dispatch.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use sms4dev_auth::{AuthContext, AuthMode, KeyManager};

use crate::body::ApiResponseBody;
use crate::error::ApiError;
use crate::response::{empty_response, json_response};
use crate::router::ApiOperation;

/// Trait that the business logic provider must implement.
///
/// The handler receives a resolved operation, the raw body bytes and, for
/// protected operations, the identity the request authenticated as. It is
/// the boundary between the HTTP transport and the key management logic.
pub trait ApiHandler: Send + Sync + 'static {
    /// Handle an operation and produce an HTTP response.
    fn handle_operation(
        &self,
        op: ApiOperation,
        body: Bytes,
        auth: Option<AuthContext>,
    ) -> Result<http::Response<ApiResponseBody>, ApiError>;
}

/// Dispatch an operation to the handler.
pub fn dispatch_operation<H: ApiHandler>(
    handler: &H,
    op: ApiOperation,
    body: Bytes,
    auth: Option<AuthContext>,
) -> Result<http::Response<ApiResponseBody>, ApiError> {
    tracing::debug!(operation = %op, "dispatching API operation");
    handler.handle_operation(op, body, auth)
}

/// `{"keyId": ..., "secret": ...}` request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyPairInput {
    key_id: String,
    secret: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyOutput<'a> {
    authenticated: bool,
    key_id: Option<&'a str>,
    mode: AuthMode,
}

#[derive(Debug, Serialize)]
struct ListKeysOutput {
    keys: Vec<sms4dev_auth::MaskedCredential>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteKeyOutput<'a> {
    message: &'static str,
    key_id: &'a str,
}

/// Handler serving the health probe and the key management API.
#[derive(Debug, Clone)]
pub struct KeyApiHandler {
    keys: KeyManager,
}

impl KeyApiHandler {
    /// Create a handler over a key manager.
    #[must_use]
    pub fn new(keys: KeyManager) -> Self {
        Self { keys }
    }
}

impl ApiHandler for KeyApiHandler {
    fn handle_operation(
        &self,
        op: ApiOperation,
        body: Bytes,
        auth: Option<AuthContext>,
    ) -> Result<http::Response<ApiResponseBody>, ApiError> {
        use http::StatusCode;

        match op {
            ApiOperation::Health => {
                json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
            }
            ApiOperation::Preflight => Ok(empty_response(StatusCode::NO_CONTENT)),
            ApiOperation::VerifyAuth => {
                let auth = auth.ok_or_else(|| {
                    ApiError::internal_error("authenticated operation reached without identity")
                })?;
                json_response(
                    StatusCode::OK,
                    &VerifyOutput {
                        authenticated: true,
                        key_id: auth.access_key_id.as_deref(),
                        mode: auth.mode,
                    },
                )
            }
            ApiOperation::ListKeys => json_response(
                StatusCode::OK,
                &ListKeysOutput {
                    keys: self.keys.list(),
                },
            ),
            ApiOperation::CreateKey => {
                let input = parse_key_pair(&body)?;
                let created = self.keys.create(&input.key_id, &input.secret)?;
                json_response(StatusCode::CREATED, &created)
            }
            ApiOperation::GenerateKey => {
                let generated = self.keys.generate()?;
                json_response(StatusCode::CREATED, &generated)
            }
            ApiOperation::DeleteKey { key_id } => {
                self.keys.delete(&key_id)?;
                json_response(
                    StatusCode::OK,
                    &DeleteKeyOutput {
                        message: "deleted",
                        key_id: &key_id,
                    },
                )
            }
            ApiOperation::ValidateKey => {
                let input = parse_key_pair(&body)?;
                let validation = self.keys.validate_public(&input.key_id, &input.secret);
                json_response(StatusCode::OK, &validation)
            }
        }
    }
}

fn parse_key_pair(body: &Bytes) -> Result<KeyPairInput, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::invalid_request(format!("Invalid JSON body: {e}")))
}
