//! Action identity and registry
//!
//! Actions are located by a stable string identity, never by function
//! value. The same identity string is carried in the `__action` query
//! parameter, compared at result-delivery time by the
//! [`ActionContext`](crate::context::ActionContext), and used for registry
//! lookup here.
//!
//! The [`ActionRegistry`] trait is the seam an application plugs its own
//! action sources into; [`InMemoryRegistry`] is the default map-backed
//! implementation.

use crate::invoke::{ActionHandler, ActionInput};
use crate::result::ActionFailure;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Stable string identity of an action.
///
/// Derived from the action's registered name. Two identities are the same
/// action exactly when their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionIdentity(String);

impl ActionIdentity {
    /// Create an identity from an action name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionIdentity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Source of action handlers, looked up by name.
#[async_trait]
pub trait ActionRegistry: Send + Sync + 'static {
    /// Resolve an action by its identity string.
    ///
    /// Returns `None` when no action is registered under `name`.
    async fn get(&self, name: &str) -> Option<Arc<dyn ActionHandler>>;
}

/// Map-backed registry populated at startup.
///
/// # Example
///
/// ```rust
/// use trellis_actions::registry::InMemoryRegistry;
/// use trellis_actions::invoke::ActionInput;
/// use serde_json::json;
///
/// let registry = InMemoryRegistry::new()
///     .register_fn("ping", |_input: ActionInput| async move { Ok(json!("pong")) });
/// ```
#[derive(Default)]
pub struct InMemoryRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`, replacing any previous one.
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Register an async closure as a handler under `name`.
    #[must_use]
    pub fn register_fn<F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ActionInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ActionFailure>> + Send + 'static,
    {
        self.register(name, Arc::new(FnHandler(handler)))
    }

    /// Number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry holds no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl ActionRegistry for InMemoryRegistry {
    async fn get(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(name).cloned()
    }
}

/// Adapter that lets plain async closures act as handlers.
struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ActionHandler for FnHandler<F>
where
    F: Fn(ActionInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ActionFailure>> + Send + 'static,
{
    async fn call(&self, input: ActionInput) -> Result<Value, ActionFailure> {
        (self.0)(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_lookup_hit_and_miss() {
        let registry = InMemoryRegistry::new()
            .register_fn("ping", |_input| async move { Ok(json!("pong")) });

        assert!(registry.get("ping").await.is_some());
        assert!(registry.get("missing").await.is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_registered_closure_executes() {
        let registry = InMemoryRegistry::new().register_fn("echo", |input: ActionInput| async move {
            Ok(input.json().cloned().unwrap_or(Value::Null))
        });

        let handler = registry.get("echo").await.unwrap();
        let value = handler.call(ActionInput::Json(json!({"k": 1}))).await.unwrap();
        assert_eq!(value, json!({"k": 1}));
    }

    #[test]
    fn test_identity_equality_is_string_equality() {
        assert_eq!(ActionIdentity::new("a"), ActionIdentity::from("a"));
        assert_ne!(ActionIdentity::new("a"), ActionIdentity::new("b"));
        assert_eq!(ActionIdentity::new("a").as_str(), "a");
        assert_eq!(ActionIdentity::new("a").to_string(), "a");
    }

    #[tokio::test]
    async fn test_reregistering_replaces_handler() {
        let registry = InMemoryRegistry::new()
            .register_fn("n", |_input| async move { Ok(json!(1)) })
            .register_fn("n", |_input| async move { Ok(json!(2)) });

        let handler = registry.get("n").await.unwrap();
        assert_eq!(handler.call(ActionInput::Empty).await.unwrap(), json!(2));
        assert_eq!(registry.len(), 1);
    }
}
