//! Hyper `Service` implementation for the SMS4Dev API.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::BodyExt;
use tracing::{debug, info};

use sms4dev_auth::{Authenticator, RequestDescriptor};

use crate::body::ApiResponseBody;
use crate::dispatch::{ApiHandler, dispatch_operation};
use crate::error::ApiError;
use crate::response::{REQUEST_ID_HEADER, error_to_response};
use crate::router::resolve_operation;

/// Headers browsers may send on cross-origin API calls.
const CORS_ALLOW_HEADERS: &str =
    "content-type, x-sms4dev-key, x-sms4dev-secret, x-sms4dev-timestamp, x-sms4dev-signature";

/// Configuration for the API HTTP service.
#[derive(Clone)]
pub struct ApiHttpConfig {
    /// Authenticator applied to every protected operation.
    pub authenticator: Arc<Authenticator>,
    /// Attach the server's string-to-sign to `SignatureDoesNotMatch` errors.
    pub expose_string_to_sign: bool,
}

impl fmt::Debug for ApiHttpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiHttpConfig")
            .field("authenticator", &self.authenticator)
            .field("expose_string_to_sign", &self.expose_string_to_sign)
            .finish()
    }
}

/// Hyper `Service` implementation for the API.
///
/// Wraps an [`ApiHandler`] implementation, authenticates protected
/// operations and routes requests to the handler.
#[derive(Debug)]
pub struct ApiHttpService<H: ApiHandler> {
    handler: Arc<H>,
    config: Arc<ApiHttpConfig>,
}

impl<H: ApiHandler> ApiHttpService<H> {
    /// Create a new `ApiHttpService`.
    pub fn new(handler: Arc<H>, config: ApiHttpConfig) -> Self {
        Self {
            handler,
            config: Arc::new(config),
        }
    }
}

impl<H: ApiHandler> Clone for ApiHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H, B> hyper::service::Service<http::Request<B>> for ApiHttpService<H>
where
    H: ApiHandler,
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: fmt::Display + Send,
{
    type Response = http::Response<ApiResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let config = Arc::clone(&self.config);
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let response = process_request(req, handler.as_ref(), &config, &request_id).await;
            let response = add_common_headers(response, &request_id);
            Ok(response)
        })
    }
}

/// Process a single HTTP request through the full pipeline.
async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    config: &ApiHttpConfig,
    request_id: &str,
) -> http::Response<ApiResponseBody>
where
    H: ApiHandler,
    B: http_body::Body<Data = Bytes>,
    B::Error: fmt::Display,
{
    let (parts, incoming) = req.into_parts();

    // 1. Route on method and path.
    let op = match resolve_operation(&parts.method, parts.uri.path()) {
        Ok(op) => op,
        Err(err) => return error_to_response(&err, request_id),
    };

    // 2. Collect body.
    let body = match collect_body(incoming).await {
        Ok(body) => body,
        Err(err) => return error_to_response(&err, request_id),
    };

    // 3. Authenticate protected operations.
    let auth = if op.requires_auth() {
        let descriptor = RequestDescriptor::from_parts(&parts, &body);
        match config.authenticator.verify(&descriptor) {
            Ok(context) => {
                debug!(operation = %op, mode = %context.mode, "request authenticated");
                Some(context)
            }
            Err(err) => {
                info!(
                    operation = %op,
                    code = %err.code(),
                    request_id,
                    "request rejected",
                );
                let err = ApiError::from_auth(err, config.expose_string_to_sign);
                return error_to_response(&err, request_id);
            }
        }
    } else {
        None
    };

    // 4. Dispatch to handler.
    match dispatch_operation(handler, op, body, auth) {
        Ok(response) => response,
        Err(err) => error_to_response(&err, request_id),
    }
}

/// Collect the incoming body into a single `Bytes` buffer.
async fn collect_body<B>(incoming: B) -> Result<Bytes, ApiError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: fmt::Display,
{
    incoming
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| ApiError::internal_error(format!("Failed to read request body: {e}")))
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<ApiResponseBody>,
    request_id: &str,
) -> http::Response<ApiResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }

    headers.insert("server", http::HeaderValue::from_static("SMS4Dev"));

    // CORS headers.
    headers.insert(
        "access-control-allow-origin",
        http::HeaderValue::from_static("*"),
    );
    headers.insert(
        "access-control-allow-methods",
        http::HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        http::HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    headers.insert(
        "access-control-expose-headers",
        http::HeaderValue::from_static(REQUEST_ID_HEADER),
    );

    response
}
