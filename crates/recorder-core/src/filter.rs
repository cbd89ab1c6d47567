//! # Mutation Filter
//!
//! Decides whether a host mutation is signal or noise.
//!
//! The host fires far more hooks than a blueprint needs: transients, cron
//! bookkeeping, UI preferences, and the dozens of option writes an
//! activation screen performs. The filter runs before any document access,
//! so rejected events cost nothing.
//!
//! All rules are fixed; see [`crate::primitives`] for the tables.

use crate::event::{Mutation, OptionWrite, PostSave, TermSave, UserMetaUpdate};
use crate::primitives::{
    ACTIVATE_ACTION, ACTIVATION_SCREENS, ADMIN_EMAIL_OPTION, AUTO_DRAFT_STATUS, BLUEPRINT_KEY,
    GLOBAL_STYLES_POST_TYPE, IGNORED_OPTIONS, IGNORED_OPTION_PREFIXES, IGNORED_USER_META,
    PENDING_ADMIN_EMAIL_OPTION, PLUGINS_SCREEN, PLUGIN_TAXONOMY_PREFIX, SNAPSHOT_KEY,
};
use crate::types::RequestContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// =============================================================================
// VERDICT
// =============================================================================

/// Why a mutation was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suppression {
    /// The option is the recorder's own storage.
    SelfWrite,
    /// Incidental write from a plugin/theme activation request.
    ActivationScreen,
    /// Transient or theme-mod option.
    InternalOption,
    /// Option on the denylist.
    DeniedOption,
    /// Old and new value are identical.
    Unchanged,
    /// Empty value appearing or disappearing.
    EmptyTransition,
    /// Same number, once as text and once as a number.
    NumericEquivalent,
    /// Taxonomy name starts with `_`.
    InternalTaxonomy,
    /// Companion-plugin taxonomy written on the plugins screen.
    PluginTaxonomy,
    /// The editor's placeholder draft.
    AutoDraft,
    /// The global styles singleton.
    GlobalStyles,
    /// User meta key on the denylist.
    DeniedUserMeta,
}

impl Suppression {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfWrite => "self_write",
            Self::ActivationScreen => "activation_screen",
            Self::InternalOption => "internal_option",
            Self::DeniedOption => "denied_option",
            Self::Unchanged => "unchanged",
            Self::EmptyTransition => "empty_transition",
            Self::NumericEquivalent => "numeric_equivalent",
            Self::InternalTaxonomy => "internal_taxonomy",
            Self::PluginTaxonomy => "plugin_taxonomy",
            Self::AutoDraft => "auto_draft",
            Self::GlobalStyles => "global_styles",
            Self::DeniedUserMeta => "denied_user_meta",
        }
    }
}

impl fmt::Display for Suppression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of filtering one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Record,
    Suppress(Suppression),
}

impl Verdict {
    #[must_use]
    pub fn is_record(self) -> bool {
        matches!(self, Self::Record)
    }
}

// =============================================================================
// FILTER
// =============================================================================

/// The MutationFilter holds the per-category noise rules.
pub struct MutationFilter;

impl MutationFilter {
    /// Whether `mutation` should reach the synthesizer.
    #[must_use]
    pub fn should_record(mutation: &Mutation, ctx: &RequestContext) -> bool {
        Self::evaluate(mutation, ctx).is_record()
    }

    /// Filter a mutation, reporting the rule that rejected it.
    #[must_use]
    pub fn evaluate(mutation: &Mutation, ctx: &RequestContext) -> Verdict {
        match mutation {
            Mutation::OptionWritten(write) => Self::option_write(write, ctx),
            Mutation::TermSaved(save) => Self::term_save(save, ctx),
            Mutation::PostSaved(save) => Self::post_save(save),
            Mutation::UserMetaUpdated(update) => Self::user_meta(update),
            // Activation and switches always matter; deletes cancel out in
            // the synthesizer instead of here.
            Mutation::PluginActivated(_) | Mutation::ThemeSwitched(_) | Mutation::PostDeleted(_) => {
                Verdict::Record
            }
        }
    }

    fn option_write(write: &OptionWrite, ctx: &RequestContext) -> Verdict {
        let name = write.option.as_str();

        if name == BLUEPRINT_KEY || name == SNAPSHOT_KEY {
            return Verdict::Suppress(Suppression::SelfWrite);
        }

        if ctx.is_action(ACTIVATE_ACTION) && ACTIVATION_SCREENS.iter().any(|s| ctx.is_screen(s)) {
            return Verdict::Suppress(Suppression::ActivationScreen);
        }

        if IGNORED_OPTION_PREFIXES.iter().any(|p| name.starts_with(p)) {
            return Verdict::Suppress(Suppression::InternalOption);
        }

        if IGNORED_OPTIONS.contains(&name) {
            return Verdict::Suppress(Suppression::DeniedOption);
        }

        let old = write.old_value.as_ref().and_then(flatten_value);
        let new = write.value.as_ref().and_then(flatten_value);

        if old == new {
            return Verdict::Suppress(Suppression::Unchanged);
        }

        if is_empty_transition(old.as_ref(), new.as_ref()) {
            return Verdict::Suppress(Suppression::EmptyTransition);
        }

        if let (Some(old), Some(new)) = (&old, &new) {
            if is_numeric_equivalent(old, new) {
                return Verdict::Suppress(Suppression::NumericEquivalent);
            }
        }

        Verdict::Record
    }

    fn term_save(save: &TermSave, ctx: &RequestContext) -> Verdict {
        if save.taxonomy.starts_with('_') {
            return Verdict::Suppress(Suppression::InternalTaxonomy);
        }
        if ctx.is_screen(PLUGINS_SCREEN) && save.taxonomy.starts_with(PLUGIN_TAXONOMY_PREFIX) {
            return Verdict::Suppress(Suppression::PluginTaxonomy);
        }
        Verdict::Record
    }

    fn post_save(save: &PostSave) -> Verdict {
        if save.status() == Some(AUTO_DRAFT_STATUS) {
            return Verdict::Suppress(Suppression::AutoDraft);
        }
        if save.post_type() == Some(GLOBAL_STYLES_POST_TYPE) {
            return Verdict::Suppress(Suppression::GlobalStyles);
        }
        Verdict::Record
    }

    fn user_meta(update: &UserMetaUpdate) -> Verdict {
        if IGNORED_USER_META.contains(&update.meta_key.as_str()) {
            return Verdict::Suppress(Suppression::DeniedUserMeta);
        }
        Verdict::Record
    }
}

// =============================================================================
// VALUE RULES
// =============================================================================

/// The option name a write is recorded under.
///
/// The host stores a pending admin email under its own key and renames it
/// once confirmed; the blueprint wants the final key.
#[must_use]
pub fn canonical_option_name(name: &str) -> &str {
    if name == PENDING_ADMIN_EMAIL_OPTION {
        ADMIN_EMAIL_OPTION
    } else {
        name
    }
}

/// Flatten an option value into its storable form.
///
/// Objects and arrays become their compact JSON text; scalars are kept.
/// `null` is absent.
#[must_use]
pub fn flatten_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(_) | Value::Object(_) => Some(Value::String(value.to_string())),
        scalar => Some(scalar.clone()),
    }
}

/// `"0"`, `0` or `""` becoming absent, or absent becoming `""`.
fn is_empty_transition(old: Option<&Value>, new: Option<&Value>) -> bool {
    match (old, new) {
        (Some(Value::String(s)), None) => s.is_empty() || s == "0",
        (Some(Value::Number(n)), None) => n.as_u64() == Some(0),
        (None, Some(Value::String(s))) => s.is_empty(),
        _ => false,
    }
}

/// A string and a number whose rendering is that exact string.
///
/// Deliberately literal: `"05"` and `"5.0"` are not equivalent to `5`.
fn is_numeric_equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            *s == n.to_string()
        }
        _ => false,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{PluginActivation, PostDelete, TermArgs};
    use crate::types::{PostId, TermId, UserId};
    use serde_json::json;

    fn option(name: &str, old: Option<Value>, new: Option<Value>) -> Mutation {
        Mutation::OptionWritten(OptionWrite {
            option: name.to_string(),
            old_value: old,
            value: new,
            network_id: None,
        })
    }

    fn verdict(mutation: &Mutation) -> Verdict {
        MutationFilter::evaluate(mutation, &RequestContext::default())
    }

    fn term(taxonomy: &str) -> Mutation {
        Mutation::TermSaved(TermSave {
            term_id: TermId(3),
            taxonomy: taxonomy.to_string(),
            update: false,
            args: TermArgs {
                name: "News".to_string(),
                slug: None,
                description: None,
                parent: None,
            },
        })
    }

    #[test]
    fn plain_option_change_is_recorded() {
        let m = option("blogname", Some(json!("Old")), Some(json!("New")));
        assert_eq!(verdict(&m), Verdict::Record);
        assert!(MutationFilter::should_record(&m, &RequestContext::default()));
    }

    #[test]
    fn own_storage_is_never_recorded() {
        let m = option(BLUEPRINT_KEY, None, Some(json!({"steps": []})));
        assert_eq!(verdict(&m), Verdict::Suppress(Suppression::SelfWrite));
        let m = option(SNAPSHOT_KEY, None, Some(json!({"postId": 1})));
        assert_eq!(verdict(&m), Verdict::Suppress(Suppression::SelfWrite));
    }

    #[test]
    fn internal_prefixes_are_suppressed() {
        for name in ["_transient_doing_cron", "theme_mods_twentytwenty"] {
            let m = option(name, None, Some(json!("x")));
            assert_eq!(verdict(&m), Verdict::Suppress(Suppression::InternalOption), "{name}");
        }
    }

    #[test]
    fn denylisted_options_are_suppressed() {
        for name in ["active_plugins", "cron", "rewrite_rules", "theme_switched"] {
            let m = option(name, None, Some(json!("x")));
            assert_eq!(verdict(&m), Verdict::Suppress(Suppression::DeniedOption), "{name}");
        }
    }

    #[test]
    fn identical_values_are_suppressed() {
        let m = option("blogname", Some(json!("Site")), Some(json!("Site")));
        assert_eq!(verdict(&m), Verdict::Suppress(Suppression::Unchanged));

        let m = option("blogname", None, None);
        assert_eq!(verdict(&m), Verdict::Suppress(Suppression::Unchanged));
    }

    #[test]
    fn empty_transitions_are_suppressed() {
        let cases = [
            (Some(json!("0")), None),
            (Some(json!(0)), None),
            (Some(json!("")), None),
            (None, Some(json!(""))),
        ];
        for (old, new) in cases {
            let m = option("blogdescription", old.clone(), new.clone());
            assert_eq!(
                verdict(&m),
                Verdict::Suppress(Suppression::EmptyTransition),
                "{old:?} -> {new:?}"
            );
        }
    }

    #[test]
    fn zero_becoming_empty_string_is_recorded() {
        let m = option("posts_per_rss", Some(json!("0")), Some(json!("")));
        assert_eq!(verdict(&m), Verdict::Record);
    }

    #[test]
    fn numeric_string_and_number_are_equivalent_both_ways() {
        let m = option("posts_per_page", Some(json!("5")), Some(json!(5)));
        assert_eq!(verdict(&m), Verdict::Suppress(Suppression::NumericEquivalent));

        let m = option("posts_per_page", Some(json!(5)), Some(json!("5")));
        assert_eq!(verdict(&m), Verdict::Suppress(Suppression::NumericEquivalent));
    }

    #[test]
    fn numeric_equivalence_is_literal() {
        let m = option("posts_per_page", Some(json!("05")), Some(json!(5)));
        assert_eq!(verdict(&m), Verdict::Record);

        let m = option("posts_per_page", Some(json!("6")), Some(json!(5)));
        assert_eq!(verdict(&m), Verdict::Record);
    }

    #[test]
    fn structured_values_compare_after_flattening() {
        let m = option("widget", Some(json!({"a": 1})), Some(json!({"a": 1})));
        assert_eq!(verdict(&m), Verdict::Suppress(Suppression::Unchanged));

        let m = option("widget", Some(json!({"a": 1})), Some(json!({"a": 2})));
        assert_eq!(verdict(&m), Verdict::Record);
    }

    #[test]
    fn activation_requests_suppress_option_writes() {
        let m = option("blogname", None, Some(json!("x")));
        for screen in ["plugins.php", "themes.php"] {
            let ctx = RequestContext::screen(screen).with_action("activate");
            assert_eq!(
                MutationFilter::evaluate(&m, &ctx),
                Verdict::Suppress(Suppression::ActivationScreen)
            );
        }

        let ctx = RequestContext::screen("plugins.php").with_action("deactivate");
        assert_eq!(MutationFilter::evaluate(&m, &ctx), Verdict::Record);

        let ctx = RequestContext::screen("options-general.php").with_action("activate");
        assert_eq!(MutationFilter::evaluate(&m, &ctx), Verdict::Record);
    }

    #[test]
    fn pending_admin_email_is_renamed() {
        assert_eq!(canonical_option_name("new_admin_email"), "admin_email");
        assert_eq!(canonical_option_name("blogname"), "blogname");
    }

    #[test]
    fn internal_taxonomy_is_suppressed() {
        assert_eq!(
            verdict(&term("_internal")),
            Verdict::Suppress(Suppression::InternalTaxonomy)
        );
        assert_eq!(verdict(&term("category")), Verdict::Record);
    }

    #[test]
    fn plugin_taxonomy_suppressed_only_on_plugins_screen() {
        let ctx = RequestContext::screen("plugins.php").with_action("activate");
        assert_eq!(
            MutationFilter::evaluate(&term("bp-email-type"), &ctx),
            Verdict::Suppress(Suppression::PluginTaxonomy)
        );
        assert_eq!(verdict(&term("bp-email-type")), Verdict::Record);
    }

    #[test]
    fn auto_draft_and_global_styles_are_suppressed() {
        let draft = Mutation::PostSaved(PostSave {
            post_id: PostId(1),
            post: json!({"post_status": "auto-draft"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
            update: false,
        });
        assert_eq!(verdict(&draft), Verdict::Suppress(Suppression::AutoDraft));

        let styles = Mutation::PostSaved(PostSave {
            post_id: PostId(2),
            post: json!({"post_status": "publish", "post_type": "wp_global_styles"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
            update: true,
        });
        assert_eq!(verdict(&styles), Verdict::Suppress(Suppression::GlobalStyles));
    }

    #[test]
    fn deletes_and_activations_always_pass() {
        let delete = Mutation::PostDeleted(PostDelete { post_id: PostId(4) });
        assert_eq!(verdict(&delete), Verdict::Record);

        let plugin = Mutation::PluginActivated(PluginActivation {
            plugin: "hello.php".to_string(),
            network_wide: false,
        });
        let ctx = RequestContext::screen("plugins.php").with_action("activate");
        assert_eq!(MutationFilter::evaluate(&plugin, &ctx), Verdict::Record);
    }

    #[test]
    fn denylisted_user_meta_is_suppressed() {
        let meta = |key: &str| {
            Mutation::UserMetaUpdated(UserMetaUpdate {
                user_id: UserId(1),
                meta_key: key.to_string(),
                meta_value: json!("x"),
                meta_id: None,
            })
        };
        assert_eq!(
            verdict(&meta("session_tokens")),
            Verdict::Suppress(Suppression::DeniedUserMeta)
        );
        assert_eq!(verdict(&meta("admin_color")), Verdict::Record);
    }
}
