//! # Core Type Definitions
//!
//! This module contains the small shared types of the recorder:
//! - Host identifiers (`PostId`, `UserId`, `TermId`)
//! - The host request context the filter inspects (`RequestContext`)
//! - Error types (`RecorderError`)

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// HOST IDENTIFIERS
// =============================================================================

/// Identifier of a post-like document in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

/// Identifier of a user in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Identifier of a taxonomy term in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// REQUEST CONTEXT
// =============================================================================

/// What the host was doing when a hook fired.
///
/// Only two facts matter to the filter: which admin screen served the
/// request and the request's `action` parameter. Both are absent for
/// front-end and CLI requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Admin screen file name, e.g. `plugins.php`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    /// The `action` query parameter of the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl RequestContext {
    /// Context for a request on the given admin screen.
    #[must_use]
    pub fn screen(screen: impl Into<String>) -> Self {
        Self {
            screen: Some(screen.into()),
            action: None,
        }
    }

    /// Set the request action.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Whether the request was served by `screen`.
    #[must_use]
    pub fn is_screen(&self, screen: &str) -> bool {
        self.screen.as_deref() == Some(screen)
    }

    /// Whether the request carries `action`.
    #[must_use]
    pub fn is_action(&self, action: &str) -> bool {
        self.action.as_deref() == Some(action)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the recorder.
///
/// Filtering and synthesis never fail; every variant here comes from the
/// storage port, the seed file, or a malformed host event.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The settings store failed to read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The host event did not carry the arguments its hook requires.
    #[error("Invalid event for hook '{hook}': {reason}")]
    InvalidEvent { hook: String, reason: String },

    /// No handler is registered for the hook.
    #[error("Unknown hook: {0}")]
    UnknownHook(String),
}

// =============================================================================
// TESTS
// =============================================================================
