//! Counter example server
//!
//! Demonstrates:
//! - Configuration loading and observability initialization
//! - Registering actions
//! - The POST → redirect → GET result transport
//! - Reading the action result from the request-scoped context
//!
//! Run with: `cargo run --example counter`, then open
//! http://127.0.0.1:3000 and submit the form. Watch the URL gain a
//! `__result` envelope after the redirect.

use axum::{middleware, response::Html, routing::get, Extension, Router};
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use trellis_actions::{observability, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize observability (logging)
    observability::init()?;

    tracing::info!("Starting trellis-actions counter server");

    let counter = Arc::new(AtomicI64::new(0));
    let registry = InMemoryRegistry::new().register_fn("increment", move |input: ActionInput| {
        let counter = Arc::clone(&counter);
        async move {
            let amount: i64 = input
                .form_field("amount")
                .unwrap_or("1")
                .parse()
                .map_err(|_| ActionFailure::bad_request("amount must be a whole number"))?;
            let count = counter.fetch_add(amount, Ordering::SeqCst) + amount;
            Ok(json!({ "count": count, "added": amount }))
        }
    });

    // Key comes from TRELLIS_ACTIONS_KEY_HEX / trellis.toml when set;
    // otherwise a per-process key is generated.
    let state = ActionsState::new(registry)?;

    tracing::info!(
        max_body_bytes = state.config().max_body_bytes,
        "Configuration loaded"
    );

    let app = Router::new()
        .route("/", get(index))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ActionsMiddleware::handle,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("Server listening on http://127.0.0.1:3000");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Index handler: renders the counter form plus the last action result.
async fn index(Extension(actions): Extension<ActionContext>) -> Html<String> {
    let status = match actions.result_for(&ActionIdentity::new("increment")) {
        Some(ActionResult::Ok { data }) => {
            format!("<p>Count is now <strong>{}</strong>.</p>", data["count"])
        }
        Some(ActionResult::Error { message, .. }) => {
            format!("<p>Increment failed: {message}</p>")
        }
        None => "<p>No increment yet.</p>".to_string(),
    };

    Html(format!(
        "<!DOCTYPE html>
<html>
<head><title>trellis-actions counter</title></head>
<body>
    <h1>Counter</h1>
    {status}
    <form method=\"post\" action=\"/?__action=increment\">
        <input type=\"number\" name=\"amount\" value=\"1\">
        <button type=\"submit\">Increment</button>
    </form>
</body>
</html>"
    ))
}
