//! Invocation dispatcher
//!
//! Per-request state machine over the HTTP method and the `__action` /
//! `__result` query parameters (plus, for legacy form posts, the
//! `__action` form field):
//!
//! - A fresh `POST ?__action=name` executes the action, seals the result
//!   into an encrypted envelope, and answers 303 to the same URL with
//!   `__result` appended (redirect-after-post), so a refresh never
//!   re-executes the action.
//! - The follow-up `GET ?__action=name&__result=envelope` decrypts the
//!   envelope, installs the result into the request extensions, and lets
//!   the page render; if the result is an error, the response status is
//!   rewritten after rendering.
//! - A legacy `POST` carrying `__action` as a form field (no-script HTML
//!   forms) executes and renders in the same request, without the
//!   redirect round-trip.
//! - Everything else passes through with a silent no-result context.
//!
//! The middleware may run twice around an internal rewrite; a request
//! that already carries an [`ActionContext`] short-circuits straight to
//! the downstream handler.
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use serde_json::json;
//! use trellis_actions::middleware::ActionsMiddleware;
//! use trellis_actions::registry::InMemoryRegistry;
//! use trellis_actions::state::ActionsState;
//!
//! # fn example() -> anyhow::Result<()> {
//! let registry = InMemoryRegistry::new()
//!     .register_fn("ping", |_input| async move { Ok(json!("pong")) });
//! let state = ActionsState::new(registry)?;
//!
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "Hello" }))
//!     .layer(middleware::from_fn_with_state(
//!         state.clone(),
//!         ActionsMiddleware::handle,
//!     ));
//! # Ok(())
//! # }
//! ```

use crate::context::ActionContext;
use crate::error::ActionsError;
use crate::form::{self, FormData};
use crate::invoke::{call_safely, ActionInput};
use crate::registry::ActionIdentity;
use crate::result::ActionResult;
use crate::state::ActionsState;
use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    http::{header::HeaderValue, HeaderMap, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};

/// Query parameter naming the invoked action.
pub const ACTION_QUERY_PARAM: &str = "__action";

/// Query parameter carrying the encrypted result envelope.
pub const RESULT_QUERY_PARAM: &str = "__result";

/// Form field naming the action on legacy (no-script) submissions.
pub const ACTION_FORM_FIELD: &str = "__action";

/// Response header exposing the error kind after a status rewrite.
pub const ACTION_ERROR_HEADER: &str = "x-action-error";

/// The actions invocation dispatcher.
///
/// Attach with
/// `axum::middleware::from_fn_with_state(state, ActionsMiddleware::handle)`.
pub struct ActionsMiddleware;

impl ActionsMiddleware {
    /// Middleware entry point.
    ///
    /// # Errors
    ///
    /// Returns [`ActionsError`] for pipeline-level failures: unknown
    /// action, GET invocation, undecodable envelope, unreadable or
    /// oversized body. Action-execution failures are not errors here;
    /// they travel as result data.
    pub async fn handle(
        State(state): State<ActionsState>,
        request: Request,
        next: Next,
    ) -> Result<Response, ActionsError> {
        // Re-entry after an internal rewrite: the context is write-once,
        // so reuse it and skip straight to the downstream handler.
        if let Some(context) = request.extensions().get::<ActionContext>() {
            tracing::trace!("action context already installed; skipping dispatch");
            let context = context.clone();
            return Ok(finish(&context, request, next).await);
        }

        let params = QueryParams::from_uri(request.uri());
        let method = request.method().clone();

        if method == Method::GET {
            if let Some(action) = params.action {
                return match params.result {
                    Some(envelope) => {
                        deliver_result(&state, &action, &envelope, request, next).await
                    }
                    None => Err(ActionsError::InvalidInvocationMethod(action)),
                };
            }
        } else if method == Method::POST {
            return match params.action {
                Some(action) => invoke_fresh(&state, &action, request, next).await,
                None => legacy_post(&state, request, next).await,
            };
        }

        let request = install(request, ActionContext::stub());
        Ok(next.run(request).await)
    }
}

/// GET delivery: decrypt the envelope and expose the result downstream.
async fn deliver_result(
    state: &ActionsState,
    action: &str,
    envelope: &str,
    request: Request,
    next: Next,
) -> Result<Response, ActionsError> {
    let result = state.codec().decode(envelope)?;
    tracing::debug!(action, error = result.is_err(), "delivering action result");

    let context = ActionContext::resolved(ActionIdentity::new(action), result);
    let request = install(request, context.clone());
    Ok(finish(&context, request, next).await)
}

/// Fresh POST invocation: execute, seal, redirect-after-post.
async fn invoke_fresh(
    state: &ActionsState,
    action: &str,
    request: Request,
    next: Next,
) -> Result<Response, ActionsError> {
    let handler = state
        .registry()
        .get(action)
        .await
        .ok_or_else(|| ActionsError::ActionNotFound(action.to_string()))?;

    // An absent body means some earlier layer already drained the
    // invocation payload; the action cannot run. The render proceeds with
    // a context that warns when queried.
    if body_is_empty(&request) {
        tracing::warn!(action, "action invocation has no body; skipping execution");
        let request = install(request, ActionContext::consumed_body_stub());
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = buffer_body(body, state.config().max_body_bytes).await?;
    let input = parse_input(&parts.headers, bytes).await?;

    let result = call_safely(handler.as_ref(), input).await;
    let envelope = state.codec().encode(&result)?;
    let location = redirect_location(&parts.uri, &envelope);

    tracing::debug!(
        action,
        error = result.is_err(),
        "action executed; redirecting with sealed result"
    );
    Ok(Redirect::to(&location).into_response())
}

/// Legacy POST: a no-script form submission carrying `__action` as a form
/// field. Executes and renders in the same request, without a redirect, at the
/// cost of re-submission on refresh.
async fn legacy_post(
    state: &ActionsState,
    request: Request,
    next: Next,
) -> Result<Response, ActionsError> {
    if !form::is_form_content_type(request.headers()) {
        let request = install(request, ActionContext::stub());
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = buffer_body(body, state.config().max_body_bytes).await?;
    let mut form = form::parse_form(&parts.headers, bytes.clone())
        .await
        .map_err(|err| ActionsError::Payload(err.to_string()))?;

    let Some(action) = form.take(ACTION_FORM_FIELD) else {
        // An ordinary form post. Put the buffered body back so downstream
        // extractors still see it.
        let request = Request::from_parts(parts, Body::from(bytes));
        let request = install(request, ActionContext::stub());
        return Ok(next.run(request).await);
    };

    let handler = state
        .registry()
        .get(&action)
        .await
        .ok_or_else(|| ActionsError::ActionNotFound(action.clone()))?;

    let result = call_safely(handler.as_ref(), ActionInput::Form(form)).await;
    tracing::debug!(
        action = %action,
        error = result.is_err(),
        "legacy form action executed; rendering in the same request"
    );

    let context = ActionContext::resolved(ActionIdentity::new(action), result);
    let request = Request::from_parts(parts, Body::empty());
    let request = install(request, context.clone());
    Ok(finish(&context, request, next).await)
}

/// Run the downstream handler, then rewrite the status when the stored
/// result is an error. Only status metadata changes; the body streams
/// through untouched.
async fn finish(context: &ActionContext, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    if let Some(ActionResult::Error { status, kind, .. }) = context.result() {
        let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::debug!(status = %code, kind = %kind, "rewriting response status from action error");
        *response.status_mut() = code;
        if let Ok(value) = HeaderValue::from_str(kind) {
            response.headers_mut().insert(ACTION_ERROR_HEADER, value);
        }
    }

    response
}

/// Install the write-once context into the request extensions.
fn install(mut request: Request, context: ActionContext) -> Request {
    request.extensions_mut().insert(context);
    request
}

/// `__action` / `__result` query parameters, first occurrence wins.
#[derive(Debug, Default)]
struct QueryParams {
    action: Option<String>,
    result: Option<String>,
}

impl QueryParams {
    fn from_uri(uri: &Uri) -> Self {
        let Some(query) = uri.query() else {
            return Self::default();
        };
        let Ok(pairs) = serde_urlencoded::from_str::<Vec<(String, String)>>(query) else {
            return Self::default();
        };

        let mut params = Self::default();
        for (name, value) in pairs {
            match name.as_str() {
                ACTION_QUERY_PARAM if params.action.is_none() => params.action = Some(value),
                RESULT_QUERY_PARAM if params.result.is_none() => params.result = Some(value),
                _ => {}
            }
        }
        params
    }
}

/// Redirect target: the same path and query with `__result` replaced by
/// the sealed envelope.
fn redirect_location(uri: &Uri, envelope: &str) -> String {
    let mut pairs: Vec<(String, String)> = uri
        .query()
        .and_then(|query| serde_urlencoded::from_str(query).ok())
        .unwrap_or_default();
    pairs.retain(|(name, _)| name != RESULT_QUERY_PARAM);
    pairs.push((RESULT_QUERY_PARAM.to_string(), envelope.to_string()));

    // Vec<(String, String)> always serializes.
    let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
    format!("{}?{query}", uri.path())
}

fn body_is_empty(request: &Request) -> bool {
    HttpBody::size_hint(request.body()).exact() == Some(0)
}

async fn buffer_body(body: Body, limit: usize) -> Result<Bytes, ActionsError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.is::<LengthLimitError>() => Err(ActionsError::BodyTooLarge(limit)),
        Err(err) => Err(ActionsError::Body(err.to_string())),
    }
}

/// Classify and parse the invocation payload from the buffered body.
async fn parse_input(headers: &HeaderMap, bytes: Bytes) -> Result<ActionInput, ActionsError> {
    if form::is_form_content_type(headers) {
        let form: FormData = form::parse_form(headers, bytes)
            .await
            .map_err(|err| ActionsError::Payload(err.to_string()))?;
        return Ok(ActionInput::Form(form));
    }
    if form::is_json_content_type(headers) {
        let value = serde_json::from_slice(&bytes)
            .map_err(|err| ActionsError::Payload(err.to_string()))?;
        return Ok(ActionInput::Json(value));
    }
    Ok(ActionInput::Empty)
}
