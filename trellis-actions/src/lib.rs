//! trellis-actions: encrypted server-action transport for axum applications
//!
//! This crate intercepts incoming requests, detects whether they invoke a
//! server-side *action* (a one-shot function triggered from a form
//! submission), executes it safely, and carries the result across the
//! POST → redirect → GET boundary inside an AES-256-GCM sealed envelope.
//! Downstream page handlers read the result from a request-scoped context
//! without ever trusting the client with its contents.
//!
//! # Design Principles
//!
//! 1. **Results are data**: action failures carry HTTP semantics but never
//!    abort the pipeline: they ride the same encrypted channel as
//!    successes.
//! 2. **Redirect-after-post**: a fresh invocation always answers 303, so a
//!    refresh can never re-execute a non-idempotent action.
//! 3. **Nothing for the client to tamper with**: the envelope is
//!    authenticated encryption; a flipped bit is a rejected request, never
//!    wrong data.
//! 4. **Write-once request state**: the per-request context is an immutable
//!    value installed exactly once, and re-entrant dispatch reuses it.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::{middleware, response::Html, routing::get, Extension, Router};
//! use serde_json::json;
//! use trellis_actions::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = InMemoryRegistry::new().register_fn("greet", |input: ActionInput| async move {
//!         let name = input.form_field("name").unwrap_or("world").to_string();
//!         Ok(json!({ "greeting": format!("Hello, {name}!") }))
//!     });
//!
//!     let state = ActionsState::new(registry)?;
//!     let app = Router::new()
//!         .route("/", get(index))
//!         .layer(middleware::from_fn_with_state(
//!             state.clone(),
//!             ActionsMiddleware::handle,
//!         ))
//!         .with_state(state);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//!
//! async fn index(Extension(actions): Extension<ActionContext>) -> Html<String> {
//!     let greeting = actions
//!         .result_for(&ActionIdentity::new("greet"))
//!         .and_then(|result| result.ok_data())
//!         .map_or_else(String::new, ToString::to_string);
//!     Html(format!("<h1>{greeting}</h1>"))
//! }
//! ```

// Lint configuration is handled at the workspace level in Cargo.toml

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod form;
pub mod invoke;
pub mod observability;
pub mod registry;
pub mod result;
pub mod state;

// Public middleware module (the dispatcher layer)
pub mod middleware;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! # Examples
    //!
    //! ```rust
    //! use trellis_actions::prelude::*;
    //! ```

    // Dispatcher
    pub use crate::middleware::{
        ActionsMiddleware, ACTION_ERROR_HEADER, ACTION_FORM_FIELD, ACTION_QUERY_PARAM,
        RESULT_QUERY_PARAM,
    };

    // Request-scoped context
    pub use crate::context::ActionContext;

    // Actions
    pub use crate::invoke::{call_safely, ActionHandler, ActionInput};
    pub use crate::registry::{ActionIdentity, ActionRegistry, InMemoryRegistry};
    pub use crate::result::{ActionFailure, ActionResult};

    // Envelope codec
    pub use crate::codec::{ActionKey, CodecError, ResultCodec};

    // Error types
    pub use crate::error::ActionsError;

    // Configuration and state
    pub use crate::config::ActionsConfig;
    pub use crate::state::ActionsState;

    // Re-export key dependencies
    pub use axum;

    // Convenience for JSON payloads
    pub use serde_json::json;
}
