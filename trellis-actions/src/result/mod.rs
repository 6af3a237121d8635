//! Action result and failure types
//!
//! An action produces exactly one [`ActionResult`]: either the handler's
//! JSON payload or a structured failure carrying HTTP semantics. Both
//! variants serialize losslessly through JSON, which is what allows a
//! result to travel through the encrypted envelope across the
//! POST → redirect → GET boundary.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The outcome of a single action invocation.
///
/// Exactly one variant is ever populated. Results must stay JSON-safe:
/// anything a handler returns is a [`serde_json::Value`], and failures
/// carry only a status code, a kind name, and a message.
///
/// # Example
///
/// ```rust
/// use trellis_actions::result::ActionResult;
/// use serde_json::json;
///
/// let result = ActionResult::Ok { data: json!({"count": 3}) };
/// assert!(!result.is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ActionResult {
    /// The handler returned normally.
    Ok {
        /// The handler's JSON return value.
        data: Value,
    },
    /// The handler failed; the failure is data, not a pipeline error.
    Error {
        /// HTTP status the final response should carry.
        status: u16,
        /// Stable error kind name (e.g. `"BadRequest"`).
        kind: String,
        /// Human-readable message.
        message: String,
    },
}

impl ActionResult {
    /// Whether this result is the error variant.
    #[must_use]
    pub const fn is_err(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The success payload, if this result is the ok variant.
    #[must_use]
    pub const fn ok_data(&self) -> Option<&Value> {
        match self {
            Self::Ok { data } => Some(data),
            Self::Error { .. } => None,
        }
    }
}

impl From<ActionFailure> for ActionResult {
    fn from(failure: ActionFailure) -> Self {
        Self::Error {
            status: failure.status,
            kind: failure.kind,
            message: failure.message,
        }
    }
}

/// A failure returned by an action handler.
///
/// Handlers return `Err(ActionFailure)` instead of panicking or bubbling
/// opaque errors; the safe invoker converts the failure into
/// [`ActionResult::Error`] so the dispatcher always has an encodable
/// result. A failure built without an explicit status defaults to
/// 500 / `"InternalServerError"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ActionFailure {
    /// HTTP status for the final response.
    pub status: u16,
    /// Stable error kind name.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl ActionFailure {
    /// Create a failure with an explicit status and kind.
    ///
    /// # Example
    ///
    /// ```rust
    /// use trellis_actions::result::ActionFailure;
    /// use axum::http::StatusCode;
    ///
    /// let failure = ActionFailure::new(StatusCode::BAD_REQUEST, "BadRequest", "missing field");
    /// assert_eq!(failure.status, 400);
    /// ```
    #[must_use]
    pub fn new(
        status: StatusCode,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: status.as_u16(),
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a 400 / `"BadRequest"` failure.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadRequest", message)
    }

    /// Shorthand for a 500 / `"InternalServerError"` failure.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError", message)
    }
}

impl From<anyhow::Error> for ActionFailure {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_round_trips_through_json() {
        let result = ActionResult::Ok {
            data: json!({"count": 41, "names": ["a", "b"]}),
        };

        let encoded = serde_json::to_string(&result).unwrap();
        let decoded: ActionResult = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, result);
    }

    #[test]
    fn test_error_round_trips_through_json() {
        let result = ActionResult::from(ActionFailure::bad_request("missing field"));

        let encoded = serde_json::to_string(&result).unwrap();
        let decoded: ActionResult = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, result);
        assert!(decoded.is_err());
    }

    #[test]
    fn test_tag_distinguishes_variants() {
        let ok = serde_json::to_value(ActionResult::Ok { data: json!(null) }).unwrap();
        assert_eq!(ok["outcome"], "ok");

        let err = serde_json::to_value(ActionResult::from(ActionFailure::internal("boom"))).unwrap();
        assert_eq!(err["outcome"], "error");
        assert_eq!(err["status"], 500);
    }

    #[test]
    fn test_failure_defaults() {
        let failure = ActionFailure::internal("boom");
        assert_eq!(failure.status, 500);
        assert_eq!(failure.kind, "InternalServerError");

        let failure: ActionFailure = anyhow::anyhow!("wrapped").into();
        assert_eq!(failure.status, 500);
        assert_eq!(failure.message, "wrapped");
    }

    #[test]
    fn test_ok_data_accessor() {
        let result = ActionResult::Ok { data: json!(7) };
        assert_eq!(result.ok_data(), Some(&json!(7)));

        let result = ActionResult::from(ActionFailure::internal("x"));
        assert!(result.ok_data().is_none());
    }
}
