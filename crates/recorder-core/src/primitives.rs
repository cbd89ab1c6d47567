//! # Recorder Primitives
//!
//! Hardcoded constants for the blueprint recorder.
//!
//! The recorder starts with a one-step blueprint but fixed rules.
//! Everything the filter and the synthesizer key on lives here, so the
//! rule tables can be read in one place.
//!
//! ## Groups
//!
//! 1. **Storage keys**: the settings slots the recorder owns.
//! 2. **Step resources**: the fixed directory names written into install steps.
//! 3. **Noise tables**: prefixes and denylists the filter rejects.

// =============================================================================
// STORAGE KEYS
// =============================================================================

/// Settings slot holding the working blueprint.
///
/// Writes to this key are never recorded as option changes, otherwise every
/// save of the blueprint would record itself.
pub const BLUEPRINT_KEY: &str = "recorder_blueprint";

/// Transient settings slot holding the pre-update copy of a post.
///
/// Filled by the `pre_post_update` hook, consumed and cleared by `save_post`.
pub const SNAPSHOT_KEY: &str = "_recorder_post_snapshot";

/// Key under which provenance is serialized, both on the document (revision
/// counter) and on each step. Stripped before externalization.
pub const PROVENANCE_KEY: &str = "_recorder";

/// Name of the optional seed file, looked up next to the database.
pub const SEED_FILE_NAME: &str = "blueprint.json";

// =============================================================================
// STEP RESOURCES
// =============================================================================

/// Resource directory for plugins installed by an `installPlugin` step.
pub const PLUGIN_RESOURCE: &str = "wordpress.org/plugins";

/// Resource directory for themes installed by an `installTheme` step.
pub const THEME_RESOURCE: &str = "wordpress.org/themes";

/// The bundled sample plugin. It ships with every install, so activating it
/// needs an `activatePlugin` step and no install.
pub const HELLO_DOLLY_PATH: &str = "hello.php";

/// Feature flag set whenever a step needs to download from the network.
pub const NETWORKING_FEATURE: &str = "networking";

/// Command prefix shared by every document-mutation command.
pub const POST_COMMAND_PREFIX: &str = "wp post";

// =============================================================================
// NOISE TABLES
// =============================================================================

/// Option name prefixes that are always internal (transients, theme mods).
pub const IGNORED_OPTION_PREFIXES: &[&str] = &["_", "theme_mods_"];

/// Options the host rewrites as side effects of other actions.
pub const IGNORED_OPTIONS: &[&str] = &[
    "active_plugins",
    "adminhash",
    "bp-emails-unsubscribe-salt",
    "can_compress_scripts",
    "cron",
    "finished_updating_comment_type",
    "fresh_site",
    "recently_activated",
    "recovery_keys",
    "rewrite_rules",
    "sidebars_widgets",
    "theme_switched",
];

/// The option the host writes while an admin email change awaits confirmation.
pub const PENDING_ADMIN_EMAIL_OPTION: &str = "new_admin_email";

/// The option [`PENDING_ADMIN_EMAIL_OPTION`] is recorded as.
pub const ADMIN_EMAIL_OPTION: &str = "admin_email";

/// Admin screens whose `action=activate` requests fire incidental option writes.
pub const ACTIVATION_SCREENS: &[&str] = &["plugins.php", "themes.php"];

/// The plugins list screen.
pub const PLUGINS_SCREEN: &str = "plugins.php";

/// Request action marking an activation.
pub const ACTIVATE_ACTION: &str = "activate";

/// Taxonomy prefix registered by a companion plugin while it activates.
pub const PLUGIN_TAXONOMY_PREFIX: &str = "bp-";

/// Post status of the placeholder the editor creates before the first save.
pub const AUTO_DRAFT_STATUS: &str = "auto-draft";

/// Post type of the generated global styles singleton.
pub const GLOBAL_STYLES_POST_TYPE: &str = "wp_global_styles";

/// Post fields that never become command flags.
pub const IGNORED_POST_FIELDS: &[&str] = &["ID", "guid", "post_modified", "post_modified_gmt"];

/// Values the host fills in when a post is inserted without them.
///
/// A created post only records fields that differ from these. Fields whose
/// default is the empty string are covered by the non-empty rule instead.
pub const POST_INSERT_DEFAULTS: &[(&str, &str)] = &[
    ("post_status", "draft"),
    ("post_type", "post"),
    ("post_parent", "0"),
    ("menu_order", "0"),
    ("import_id", "0"),
    ("comment_count", "0"),
];

/// User meta keys holding host UI state and sessions.
pub const IGNORED_USER_META: &[&str] = &[
    "community-events-location",
    "session_tokens",
    "wp_dashboard_quick_press_last_post_id",
    "wp_persisted_preferences",
    "wp_user-settings",
    "wp_user-settings-time",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blueprint_key_is_not_an_internal_option() {
        // The blueprint slot is excluded by name, not by prefix.
        assert!(!IGNORED_OPTION_PREFIXES
            .iter()
            .any(|p| BLUEPRINT_KEY.starts_with(p)));
    }

    #[test]
    fn snapshot_key_is_transient() {
        assert!(SNAPSHOT_KEY.starts_with('_'));
    }
}
