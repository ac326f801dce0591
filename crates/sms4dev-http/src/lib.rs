//! HTTP service layer for the SMS4Dev authentication and key management API.
//!
//! This crate puts [`sms4dev_auth`] behind hyper:
//!
//! - **Router**: Resolves the operation from method and path
//! - **Handler trait**: Defines the boundary between HTTP and business logic
//! - **Service**: Hyper `Service` that authenticates protected operations
//! - **Response helpers**: JSON success/error response formatting

pub mod body;
pub mod dispatch;
pub mod error;
pub mod response;
pub mod router;
pub mod service;

pub use body::ApiResponseBody;
pub use dispatch::{ApiHandler, KeyApiHandler};
pub use error::{ApiError, ApiErrorCode};
pub use router::ApiOperation;
pub use service::{ApiHttpConfig, ApiHttpService};
