//! Pipeline-level error types
//!
//! These errors abort the middleware chain. Action-execution failures
//! never appear here; the safe invoker contains them as
//! [`ActionResult::Error`](crate::result::ActionResult) data and they are
//! delivered to the client through the encrypted envelope instead.

use crate::codec::CodecError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors that terminate the actions middleware.
#[derive(Debug, Error)]
pub enum ActionsError {
    /// No action is registered under the requested identity.
    #[error("action `{0}` was not found")]
    ActionNotFound(String),

    /// GET was used to invoke an action instead of delivering a result.
    #[error("action `{0}` must be invoked via POST; GET only delivers results")]
    InvalidInvocationMethod(String),

    /// The result envelope could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Reading the request body failed.
    #[error("failed to read request body: {0}")]
    Body(String),

    /// The request body exceeded the configured buffering limit.
    #[error("request body exceeds the {0}-byte limit")]
    BodyTooLarge(usize),

    /// The action payload (form or JSON body) failed to parse.
    #[error("malformed action payload: {0}")]
    Payload(String),
}

impl IntoResponse for ActionsError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::ActionNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Self::InvalidInvocationMethod(_) => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            Self::Codec(err) => {
                // The envelope is client-supplied; log the detail but never
                // echo it back.
                tracing::warn!(error = %err, "rejected action result envelope");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            Self::Body(_) | Self::Payload(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::BodyTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
        };
        (status, body).into_response()
    }
}
