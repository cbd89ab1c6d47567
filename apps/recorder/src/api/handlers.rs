//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    auth::secrets_match,
    types::{BlueprintQuery, ErrorResponse, HealthResponse, HookRequest, HookResponse, StatusResponse},
};
use crate::present::{self, BUILDER_OPEN, Rendered};
use async_stream::stream;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use recorder_core::{Decision, RecorderError, clean, primitives::NETWORKING_FEATURE};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

/// SSE event name carrying a [`present::HandoffMessage`].
pub const HANDOFF_EVENT: &str = "blueprint";

fn storage_failure(e: &RecorderError) -> Response {
    tracing::error!("Blueprint unavailable: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(e.to_string())),
    )
        .into_response()
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get blueprint status.
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let recorder = state.recorder.read().await;
    let blueprint = match recorder.blueprint() {
        Ok(b) => b,
        Err(e) => return storage_failure(&e),
    };

    let response = StatusResponse {
        step_count: blueprint.steps.len(),
        recorded_steps: present::recorded_step_count(&blueprint),
        revision: blueprint.revision(),
        networking: blueprint.feature(NETWORKING_FEATURE),
        has_seed: recorder.seed().is_some(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

// =============================================================================
// BLUEPRINT HANDLER
// =============================================================================

/// The cleaned working blueprint as JSON.
pub async fn blueprint_handler(State(state): State<AppState>) -> Response {
    let recorder = state.recorder.read().await;
    match recorder.blueprint() {
        Ok(blueprint) => (StatusCode::OK, Json(clean(&blueprint))).into_response(),
        Err(e) => storage_failure(&e),
    }
}

// =============================================================================
// HOOK HANDLER
// =============================================================================

/// Receive one hook invocation from the host.
pub async fn hook_handler(
    State(state): State<AppState>,
    Path(hook): Path<String>,
    Json(request): Json<HookRequest>,
) -> impl IntoResponse {
    let event = match state.dispatcher.decode(&hook, request.args) {
        Ok(event) => event,
        Err(e @ RecorderError::UnknownHook(_)) => {
            tracing::debug!(hook = %hook, "Unknown hook");
            return (StatusCode::NOT_FOUND, Json(HookResponse::error(&hook, e.to_string())));
        }
        Err(e) => {
            tracing::debug!(hook = %hook, error = %e, "Rejected hook arguments");
            return (StatusCode::BAD_REQUEST, Json(HookResponse::error(&hook, e.to_string())));
        }
    };

    // One event at a time from fetch to store.
    let mut recorder = state.recorder.write().await;
    match recorder.handle(&event, &request.context) {
        Ok(None) => {
            tracing::debug!(hook = %hook, "Stored post snapshot");
            (StatusCode::OK, Json(HookResponse::snapshot(&hook)))
        }
        Ok(Some(decision)) => {
            log_decision(&hook, decision);
            (StatusCode::OK, Json(HookResponse::decided(&hook, decision)))
        }
        Err(e) => {
            tracing::warn!(hook = %hook, error = %e, "Dropping event after storage failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HookResponse::error(&hook, e.to_string())),
            )
        }
    }
}

fn log_decision(hook: &str, decision: Decision) {
    match decision {
        Decision::Suppressed(reason) => {
            tracing::debug!(hook, reason = %reason, "Suppressed mutation");
        }
        Decision::Dropped(_) | Decision::Unchanged => {
            tracing::debug!(hook, decision = decision.as_str(), "No blueprint change");
        }
        Decision::Appended | Decision::Merged | Decision::Removed(_) => {
            tracing::info!(hook, decision = decision.as_str(), "Blueprint updated");
        }
    }
}

// =============================================================================
// QUERY HANDLER
// =============================================================================

/// Answer a blueprint query from the admin page.
///
/// The answer travels over the message stream; the response itself is empty.
pub async fn query_handler(
    State(state): State<AppState>,
    Query(query): Query<BlueprintQuery>,
) -> Response {
    let nonce_ok = query
        .nonce
        .as_deref()
        .is_some_and(|provided| secrets_match(provided, &state.nonce));
    if !nonce_ok {
        tracing::warn!(event = "nonce_failure", "Blueprint query with invalid nonce");
        return (StatusCode::FORBIDDEN, Json(ErrorResponse::new("Invalid nonce"))).into_response();
    }

    let blueprint = {
        let recorder = state.recorder.read().await;
        match recorder.blueprint() {
            Ok(b) => b,
            Err(e) => return storage_failure(&e),
        }
    };

    let message = present::respond_to_query(&blueprint, &query.kind);
    // No listener just means no admin page is open.
    if state.messages.send(message).is_err() {
        tracing::debug!(kind = %query.kind, "No message listeners");
    }

    StatusCode::NO_CONTENT.into_response()
}

// =============================================================================
// MESSAGE STREAM
// =============================================================================

/// Server-sent events delivering query answers to the admin page.
pub async fn messages_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut rx = state.subscribe();

    let stream = stream! {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    let data = serde_json::to_string(&message).unwrap_or_default();
                    yield Ok::<_, Infallible>(Event::default().event(HANDOFF_EVENT).data(data));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Message stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

// =============================================================================
// ADMIN PAGE
// =============================================================================

/// The review page: current blueprint, seed and handoff buttons.
pub async fn admin_handler(State(state): State<AppState>) -> Response {
    let recorder = state.recorder.read().await;
    let blueprint = match recorder.blueprint() {
        Ok(b) => b,
        Err(e) => return storage_failure(&e),
    };

    let rendered = present::render(&blueprint, recorder.seed());
    let count = present::recorded_step_count(&blueprint);
    Html(admin_page(&rendered, count, &state.nonce)).into_response()
}

fn admin_page(rendered: &Rendered, recorded: usize, nonce: &str) -> String {
    let seed_section = rendered
        .seed
        .as_deref()
        .map(|seed| {
            format!(
                "<h2>Seed blueprint</h2>\n<pre class=\"blueprint\">{}</pre>\n",
                html_escape(seed)
            )
        })
        .unwrap_or_default();

    let buttons: String = [
        ("open", "Open in Playground"),
        (BUILDER_OPEN, "Open in Builder"),
        ("copy", "Copy"),
        ("download", "Download"),
    ]
    .iter()
    .map(|(kind, label)| format!("<button data-type=\"{kind}\">{label}</button>\n"))
    .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Blueprint Recorder ({recorded})</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
pre.blueprint {{ background: #f6f7f7; padding: 1rem; overflow: auto; }}
button {{ margin-right: .5rem; }}
</style>
</head>
<body>
<h1>Blueprint Recorder <span class="count">{recorded}</span></h1>
<div class="actions" data-nonce="{nonce}">
{buttons}</div>
<h2>Blueprint</h2>
<pre class="blueprint">{blueprint}</pre>
{seed_section}<script>
if (new URLSearchParams(location.search).has('key')) {{
  history.replaceState(null, '', location.pathname);
}}
const nonce = document.querySelector('.actions').dataset.nonce;
const events = new EventSource('/admin/messages');
events.addEventListener('{event}', (e) => {{
  const message = JSON.parse(e.data);
  if (message.type === 'open' || message.type === '{builder}') {{
    window.open(message.url, '_blank');
  }} else if (message.type === 'copy') {{
    navigator.clipboard.writeText(message.blueprint);
  }} else if (message.type === 'download') {{
    const link = document.createElement('a');
    link.href = URL.createObjectURL(new Blob([message.blueprint], {{ type: 'application/json' }}));
    link.download = 'blueprint.json';
    link.click();
  }}
}});
document.querySelectorAll('.actions button').forEach((button) => {{
  button.addEventListener('click', () => {{
    const params = new URLSearchParams({{ type: button.dataset.type, _wpnonce: nonce }});
    fetch('/admin/blueprint?' + params.toString());
  }});
}});
</script>
</body>
</html>
"#,
        blueprint = html_escape(&rendered.blueprint),
        event = HANDOFF_EVENT,
        builder = BUILDER_OPEN,
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// =============================================================================
// TESTS
// =============================================================================
