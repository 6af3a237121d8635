//! Request-scoped action result cache
//!
//! After the dispatcher resolves (or declines to resolve) an action for a
//! request, it installs an [`ActionContext`] into the request extensions
//! exactly once. Downstream handlers and middleware query it through
//! [`ActionContext::result_for`], keyed by action identity; asking about a
//! different action than the one that produced the result yields `None`
//! rather than an error.
//!
//! The context is a genuinely immutable value: it is constructed once,
//! shared behind an [`Arc`], and carries no interior mutability. Re-entrant
//! dispatch (the middleware may run twice around an internal rewrite)
//! detects an existing context and short-circuits instead of reinstalling.

use crate::registry::ActionIdentity;
use crate::result::ActionResult;
use std::sync::Arc;

/// Per-request, write-once action state.
///
/// Cloning is cheap and shares the same underlying state.
///
/// # Example
///
/// ```rust
/// use trellis_actions::context::ActionContext;
/// use trellis_actions::registry::ActionIdentity;
/// use trellis_actions::result::ActionResult;
/// use serde_json::json;
///
/// let identity = ActionIdentity::new("increment");
/// let context = ActionContext::resolved(
///     identity.clone(),
///     ActionResult::Ok { data: json!(1) },
/// );
///
/// assert!(context.result_for(&identity).is_some());
/// assert!(context.result_for(&ActionIdentity::new("other")).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ActionContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
enum ContextInner {
    /// An action ran (or its delivered result was decoded) for this request.
    Resolved {
        identity: ActionIdentity,
        result: ActionResult,
    },
    /// No action applies to this request.
    Stub {
        /// Set when the request looked like an invocation but the body was
        /// already consumed; querying such a context logs a warning.
        warn_on_query: bool,
    },
}

impl ActionContext {
    /// Context holding a decoded or freshly produced result.
    #[must_use]
    pub fn resolved(identity: ActionIdentity, result: ActionResult) -> Self {
        Self {
            inner: Arc::new(ContextInner::Resolved { identity, result }),
        }
    }

    /// Silent no-result context for ordinary page requests.
    #[must_use]
    pub fn stub() -> Self {
        Self {
            inner: Arc::new(ContextInner::Stub {
                warn_on_query: false,
            }),
        }
    }

    /// No-result context for an invocation whose body was already consumed.
    ///
    /// Queries against this context return `None` and log a warning, since
    /// the caller likely expected the action to have run.
    #[must_use]
    pub fn consumed_body_stub() -> Self {
        Self {
            inner: Arc::new(ContextInner::Stub {
                warn_on_query: true,
            }),
        }
    }

    /// Look up the result produced for `identity`.
    ///
    /// Returns `None` when no action ran for this request or when the
    /// stored result belongs to a different action: a page asking about
    /// action "B" after action "A" ran is not an error, just not
    /// applicable.
    #[must_use]
    pub fn result_for(&self, identity: &ActionIdentity) -> Option<&ActionResult> {
        match self.inner.as_ref() {
            ContextInner::Resolved {
                identity: stored,
                result,
            } if stored == identity => Some(result),
            ContextInner::Resolved { .. } => None,
            ContextInner::Stub { warn_on_query } => {
                if *warn_on_query {
                    tracing::warn!(
                        action = %identity,
                        "action result queried, but the request body was already \
                         consumed before the middleware could invoke the action"
                    );
                }
                None
            }
        }
    }

    /// The stored result regardless of identity, if any.
    ///
    /// Used by the response post-processor, which rewrites the outgoing
    /// status when the result is an error no matter which action produced
    /// it.
    #[must_use]
    pub fn result(&self) -> Option<&ActionResult> {
        match self.inner.as_ref() {
            ContextInner::Resolved { result, .. } => Some(result),
            ContextInner::Stub { .. } => None,
        }
    }

    /// The identity of the action that produced the stored result, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&ActionIdentity> {
        match self.inner.as_ref() {
            ContextInner::Resolved { identity, .. } => Some(identity),
            ContextInner::Stub { .. } => None,
        }
    }
}
