//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use recorder_core::{Decision, RequestContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Blueprint status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub step_count: usize,
    pub recorded_steps: usize,
    pub revision: u64,
    pub networking: bool,
    pub has_seed: bool,
}

// =============================================================================
// HOOK REQUEST/RESPONSE
// =============================================================================

/// One hook invocation from the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookRequest {
    /// The hook's arguments, shaped per hook.
    #[serde(default)]
    pub args: Value,
    /// What the host was doing when the hook fired.
    #[serde(default)]
    pub context: RequestContext,
}

/// Outcome of a hook invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookResponse {
    pub success: bool,
    pub hook: String,
    /// What happened to the blueprint. `None` for snapshots and errors.
    pub result: Option<Decision>,
    /// Whether the event only stored a pre-update snapshot.
    #[serde(default)]
    pub snapshot: bool,
    pub error: Option<String>,
}

impl HookResponse {
    #[must_use]
    pub fn decided(hook: &str, decision: Decision) -> Self {
        Self {
            success: true,
            hook: hook.to_string(),
            result: Some(decision),
            snapshot: false,
            error: None,
        }
    }

    #[must_use]
    pub fn snapshot(hook: &str) -> Self {
        Self {
            success: true,
            hook: hook.to_string(),
            result: None,
            snapshot: true,
            error: None,
        }
    }

    #[must_use]
    pub fn error(hook: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            hook: hook.to_string(),
            result: None,
            snapshot: false,
            error: Some(message.into()),
        }
    }
}

// =============================================================================
// QUERY INTERFACE
// =============================================================================

/// Parameters of `GET /admin/blueprint`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlueprintQuery {
    /// What the browser wants to do with the answer (`open`, `copy`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "_wpnonce", default)]
    pub nonce: Option<String>,
}

/// Generic error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
