//! # Host Events
//!
//! Typed payloads of the host hooks the recorder listens to.
//!
//! Every hook invocation becomes a [`HostEvent`]: either a [`Mutation`]
//! (something changed) or a [`PostSnapshot`] (the copy of a post taken just
//! before an update lands, needed to diff the update).

use crate::types::{PostId, TermId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field map of a post as the host stores it (`post_title`, `post_status`, ...).
pub type PostFields = Map<String, Value>;

// =============================================================================
// PAYLOADS
// =============================================================================

/// `activate_plugin`: a plugin is being activated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginActivation {
    /// Plugin path relative to the plugins directory, e.g. `akismet/akismet.php`.
    pub plugin: String,
    #[serde(default)]
    pub network_wide: bool,
}

/// `switch_theme`: the active theme changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSwitch {
    /// Stylesheet (directory) name of the new theme.
    pub stylesheet: String,
    /// Display name of the new theme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `added_option` / `updated_option` and their network-wide variants.
///
/// A missing value and `null` are the same thing: "absent".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionWrite {
    pub option: String,
    #[serde(default)]
    pub old_value: Option<Value>,
    #[serde(default)]
    pub value: Option<Value>,
    /// Set for network-scoped options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<u64>,
}

/// Arguments a term was saved with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermArgs {
    pub name: String,
    #[serde(default)]
    pub slug: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub parent: Option<Value>,
}

/// `saved_term`: a taxonomy term was created or updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermSave {
    pub term_id: TermId,
    pub taxonomy: String,
    #[serde(default)]
    pub update: bool,
    pub args: TermArgs,
}

/// `save_post`: a post was created or updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSave {
    pub post_id: PostId,
    pub post: PostFields,
    #[serde(default)]
    pub update: bool,
}

impl PostSave {
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.post.get("post_status").and_then(Value::as_str)
    }

    #[must_use]
    pub fn post_type(&self) -> Option<&str> {
        self.post.get("post_type").and_then(Value::as_str)
    }
}

/// `delete_post`: a post is being deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDelete {
    pub post_id: PostId,
}

/// `added_user_meta` / `updated_user_meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMetaUpdate {
    pub user_id: UserId,
    pub meta_key: String,
    #[serde(default)]
    pub meta_value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_id: Option<u64>,
}

/// `pre_post_update`: the stored copy of a post right before an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSnapshot {
    pub post_id: PostId,
    pub fields: PostFields,
}

// =============================================================================
// EVENTS
// =============================================================================

/// A mutation the recorder may turn into a step.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    PluginActivated(PluginActivation),
    ThemeSwitched(ThemeSwitch),
    OptionWritten(OptionWrite),
    TermSaved(TermSave),
    PostSaved(PostSave),
    PostDeleted(PostDelete),
    UserMetaUpdated(UserMetaUpdate),
}

impl Mutation {
    /// Short category name, used in logs and API responses.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::PluginActivated(_) => "plugin",
            Self::ThemeSwitched(_) => "theme",
            Self::OptionWritten(_) => "option",
            Self::TermSaved(_) => "term",
            Self::PostSaved(_) => "post_save",
            Self::PostDeleted(_) => "post_delete",
            Self::UserMetaUpdated(_) => "user_meta",
        }
    }
}

/// One hook invocation from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A post is about to be updated; remember its current fields.
    PostUpdating(PostSnapshot),
    Mutation(Mutation),
}

impl From<Mutation> for HostEvent {
    fn from(mutation: Mutation) -> Self {
        Self::Mutation(mutation)
    }
}

// =============================================================================
// TESTS
// =============================================================================
