//! Safe action invocation
//!
//! [`call_safely`] is the boundary that keeps the dispatcher's control
//! path single: whatever a handler does, the invoker produces an
//! encodable [`ActionResult`] and never lets a failure escape.

use crate::form::FormData;
use crate::result::{ActionFailure, ActionResult};
use async_trait::async_trait;
use serde_json::Value;

/// The argument payload handed to an action handler.
#[derive(Debug, Clone)]
pub enum ActionInput {
    /// Fields from a form submission (urlencoded or multipart).
    Form(FormData),
    /// A JSON request body.
    Json(Value),
    /// No usable body accompanied the invocation.
    Empty,
}

impl ActionInput {
    /// Convenience accessor for a form field, `None` for non-form input.
    #[must_use]
    pub fn form_field(&self, name: &str) -> Option<&str> {
        match self {
            Self::Form(form) => form.get(name),
            Self::Json(_) | Self::Empty => None,
        }
    }

    /// The JSON payload, `None` for non-JSON input.
    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Form(_) | Self::Empty => None,
        }
    }
}

/// A server-side function invocable from a client request.
///
/// Implementations return their payload as a [`serde_json::Value`] so the
/// result can travel through the encrypted envelope. Failures are data:
/// return an [`ActionFailure`] with the HTTP status the final response
/// should carry.
///
/// Closures can be registered directly via
/// [`InMemoryRegistry::register_fn`](crate::registry::InMemoryRegistry::register_fn).
#[async_trait]
pub trait ActionHandler: Send + Sync + 'static {
    /// Execute the action with the parsed request input.
    async fn call(&self, input: ActionInput) -> Result<Value, ActionFailure>;
}

/// Invoke `handler`, converting any failure into result data.
///
/// This never returns an error: an `Err` from the handler becomes
/// [`ActionResult::Error`], which is delivered to the client through the
/// same encrypted channel as a success.
pub async fn call_safely(handler: &dyn ActionHandler, input: ActionInput) -> ActionResult {
    match handler.call(input).await {
        Ok(data) => ActionResult::Ok { data },
        Err(failure) => {
            tracing::debug!(
                status = failure.status,
                kind = %failure.kind,
                "action handler failed; failure captured as result data"
            );
            ActionResult::from(failure)
        }
    }
}
