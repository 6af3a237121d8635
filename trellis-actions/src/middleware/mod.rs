//! Middleware layers for trellis-actions
//!
//! Provides the invocation dispatcher: the middleware that detects
//! action invocations, executes them, and carries their encrypted
//! results across the POST → redirect → GET boundary.

pub mod dispatch;

// Re-exports are intentionally public even if not used within the crate itself
#[allow(unused_imports)]
pub use dispatch::{
    ActionsMiddleware, ACTION_ERROR_HEADER, ACTION_FORM_FIELD, ACTION_QUERY_PARAM,
    RESULT_QUERY_PARAM,
};
