//! # recorder-core
//!
//! The blueprint synthesis engine - THE LOGIC.
//!
//! This crate watches host mutations (plugin and theme activation, option
//! writes, taxonomy terms, posts, user meta) and maintains a blueprint: an
//! ordered list of idempotent provisioning steps that rebuilds the same site
//! when replayed.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is synchronous: one event is fetched, filtered, synthesized and stored
//!   under `&mut self`
//! - Reports what it did as values ([`Decision`]); logging is the app's job
//! - Reaches storage only through the [`SettingsStore`] port
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod blueprint;
pub mod command;
pub mod event;
pub mod filter;
pub mod primitives;
pub mod recorder;
pub mod step;
pub mod storage;
pub mod store;
pub mod synthesizer;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{PostId, RecorderError, RequestContext, TermId, UserId};

// =============================================================================
// RE-EXPORTS: Document Model
// =============================================================================

pub use blueprint::Blueprint;
pub use event::{
    HostEvent, Mutation, OptionWrite, PluginActivation, PostDelete, PostFields, PostSave,
    PostSnapshot, TermArgs, TermSave, ThemeSwitch, UserMetaUpdate,
};
pub use step::{Provenance, Step, StepKind};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use filter::{MutationFilter, Suppression, Verdict};
pub use recorder::Recorder;
pub use synthesizer::{Decision, DropReason, Synthesizer};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use storage::{MemoryStore, RedbStore, SettingsStore, StorageBackend};
pub use store::{BlueprintStore, clean, load_seed, try_load_seed};
