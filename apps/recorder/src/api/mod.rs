//! # Recorder HTTP API Module
//!
//! This module implements the HTTP boundary using axum.
//!
//! ## Endpoints
//!
//! - `POST /hooks/{hook}` - Deliver one host hook invocation
//! - `GET /admin` - Review page with the handoff buttons
//! - `GET /admin/blueprint` - Query interface (answers over `/admin/messages`)
//! - `GET /admin/messages` - Server-sent events carrying query answers
//! - `GET /blueprint` - Cleaned blueprint JSON
//! - `GET /status` - Blueprint status
//! - `GET /health` - Health check
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `RECORDER_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `RECORDER_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `RECORDER_API_KEY`: If set, requires Bearer token authentication
//!   (the review page also accepts the key from `/admin?key=...`, kept in a cookie)

mod auth;
mod handlers;
mod middleware;
mod types;

// Re-exports for external use
pub use auth::{KEY_COOKIE, get_api_key_from_env, secrets_match};
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
// Re-export handlers and types for integration tests (via `recorder::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    HANDOFF_EVENT, admin_handler, blueprint_handler, health_handler, hook_handler,
    messages_handler, query_handler, status_handler,
};
#[allow(unused_imports)]
pub use types::{
    BlueprintQuery, ErrorResponse, HealthResponse, HookRequest, HookResponse, StatusResponse,
};

use crate::dispatch::HookDispatcher;
use crate::present::HandoffMessage;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use recorder_core::{Recorder, RecorderError, StorageBackend};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Messages buffered per admin page before a slow reader starts lagging.
const MESSAGE_CAPACITY: usize = 16;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the recorder.
#[derive(Clone)]
pub struct AppState {
    /// The recorder. Hook handling holds the write lock for a whole event.
    pub recorder: Arc<RwLock<Recorder<StorageBackend>>>,
    /// Hook name to event decoder.
    pub dispatcher: Arc<HookDispatcher>,
    /// Side channel to open admin pages.
    pub messages: broadcast::Sender<HandoffMessage>,
    /// Per-process nonce the query interface requires.
    pub nonce: Arc<str>,
}

impl AppState {
    /// Create new app state with a fresh nonce.
    #[must_use]
    pub fn new(recorder: Recorder<StorageBackend>) -> Self {
        Self::with_nonce(recorder, &uuid::Uuid::new_v4().to_string())
    }

    /// Create new app state with a known nonce.
    #[must_use]
    pub fn with_nonce(recorder: Recorder<StorageBackend>, nonce: &str) -> Self {
        let (messages, _) = broadcast::channel(MESSAGE_CAPACITY);
        Self {
            recorder: Arc::new(RwLock::new(recorder)),
            dispatcher: Arc::new(HookDispatcher::default()),
            messages,
            nonce: Arc::from(nonce),
        }
    }

    /// Listen for query answers.
    pub fn subscribe(&self) -> broadcast::Receiver<HandoffMessage> {
        self.messages.subscribe()
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `RECORDER_CORS_ORIGINS` environment variable:
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("RECORDER_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (RECORDER_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in RECORDER_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No RECORDER_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:8080",
        "http://127.0.0.1:8080",
        "http://localhost:8881",
        "http://127.0.0.1:8881",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting - protects against floods (if enabled)
/// 5. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set RECORDER_API_KEY environment variable to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/blueprint", get(handlers::blueprint_handler))
        .route("/hooks/{hook}", post(handlers::hook_handler))
        .route("/admin", get(handlers::admin_handler))
        .route("/admin/blueprint", get(handlers::query_handler))
        .route("/admin/messages", get(handlers::messages_handler));

    // Authentication is innermost so rejected requests still count against the limit.
    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, recorder: Recorder<StorageBackend>) -> Result<(), RecorderError> {
    let state = AppState::new(recorder);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RecorderError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Recorder HTTP server listening on {}", addr);
    tracing::info!("Review page: http://{}/admin", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| RecorderError::IoError(format!("Server error: {}", e)))
}
