//! # Step Synthesizer
//!
//! Turns one recorded mutation into an edit of the blueprint.
//!
//! Every rule is "scan for the first match, else append". Steps are never
//! reordered, so replay order stays the order in which things happened.
//!
//! The synthesizer is pure over the document: it does not read or write
//! storage and it never fails. Missing data is reported as
//! [`Decision::Dropped`].

use crate::blueprint::Blueprint;
use crate::command::WpCommand;
use crate::event::{
    Mutation, OptionWrite, PluginActivation, PostDelete, PostSave, PostSnapshot, TermSave,
    ThemeSwitch, UserMetaUpdate,
};
use crate::filter::{Suppression, canonical_option_name, flatten_value};
use crate::primitives::{
    HELLO_DOLLY_PATH, IGNORED_POST_FIELDS, NETWORKING_FEATURE, PLUGIN_RESOURCE,
    POST_COMMAND_PREFIX, POST_INSERT_DEFAULTS, THEME_RESOURCE,
};
use crate::step::{InstallOptions, Provenance, SetSiteOptions, Step, StepKind, UpdateUserMeta};
use crate::types::PostId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// DECISION
// =============================================================================

/// Why a mutation that passed the filter still produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// A post update arrived with no pre-update snapshot.
    MissingSnapshot,
    /// The snapshot slot held a different post.
    SnapshotMismatch,
}

/// What happened to the blueprint for one host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "detail", rename_all = "snake_case")]
pub enum Decision {
    /// A new step was added at the end.
    Appended,
    /// An existing step or the feature map was edited in place.
    Merged,
    /// The event was signal but the document already reflects it.
    Unchanged,
    /// This many steps were removed.
    Removed(usize),
    /// The filter rejected the event.
    Suppressed(Suppression),
    /// The event lacked data the rule needs.
    Dropped(DropReason),
}

impl Decision {
    /// Whether the document changed and must be persisted.
    #[must_use]
    pub fn changed(self) -> bool {
        matches!(self, Self::Appended | Self::Merged | Self::Removed(_))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Appended => "appended",
            Self::Merged => "merged",
            Self::Unchanged => "unchanged",
            Self::Removed(_) => "removed",
            Self::Suppressed(_) => "suppressed",
            Self::Dropped(_) => "dropped",
        }
    }
}

// =============================================================================
// SYNTHESIZER
// =============================================================================

/// The Synthesizer applies the per-category step rules.
pub struct Synthesizer;

impl Synthesizer {
    /// Apply a mutation that already passed the filter.
    ///
    /// `snapshot` is only consulted for post updates.
    pub fn apply_mutation(
        blueprint: &mut Blueprint,
        mutation: &Mutation,
        snapshot: Option<&PostSnapshot>,
    ) -> Decision {
        match mutation {
            Mutation::PluginActivated(activation) => Self::activate_plugin(blueprint, activation),
            Mutation::ThemeSwitched(switch) => Self::switch_theme(blueprint, switch),
            Mutation::OptionWritten(write) => Self::set_option(blueprint, write),
            Mutation::TermSaved(save) => Self::save_term(blueprint, save),
            Mutation::PostSaved(save) => Self::save_post(blueprint, save, snapshot),
            Mutation::PostDeleted(delete) => Self::delete_post(blueprint, delete),
            Mutation::UserMetaUpdated(update) => Self::update_user_meta(blueprint, update),
        }
    }

    fn activate_plugin(blueprint: &mut Blueprint, activation: &PluginActivation) -> Decision {
        if activation.plugin == HELLO_DOLLY_PATH {
            blueprint.push(Step::recorded(StepKind::activate_plugin(HELLO_DOLLY_PATH)));
            return Decision::Appended;
        }

        let slug = plugin_slug(&activation.plugin);
        let decision = match blueprint.install_plugin_mut(slug) {
            Some(install) => set_activate(&mut install.options),
            None => {
                blueprint.push(Step::recorded(StepKind::install_plugin(PLUGIN_RESOURCE, slug)));
                Decision::Appended
            }
        };
        with_networking(blueprint, decision)
    }

    fn switch_theme(blueprint: &mut Blueprint, switch: &ThemeSwitch) -> Decision {
        let slug = switch.stylesheet.as_str();
        let decision = match blueprint.install_theme_mut(slug) {
            Some(install) => set_activate(&mut install.options),
            None => {
                blueprint.push(Step::recorded(StepKind::install_theme(THEME_RESOURCE, slug)));
                Decision::Appended
            }
        };
        with_networking(blueprint, decision)
    }

    fn set_option(blueprint: &mut Blueprint, write: &OptionWrite) -> Decision {
        let name = canonical_option_name(&write.option).to_string();
        let value = write
            .value
            .as_ref()
            .and_then(flatten_value)
            .unwrap_or(Value::Null);

        if let Some(step) = blueprint.site_options_mut() {
            if step.options.get(&name) == Some(&value) {
                return Decision::Unchanged;
            }
            step.options.insert(name, value);
            return Decision::Merged;
        }

        let mut options = Map::new();
        options.insert(name, value);
        blueprint.push(Step::recorded(StepKind::SetSiteOptions(SetSiteOptions {
            options,
            extra: Map::new(),
        })));
        Decision::Appended
    }

    fn save_term(blueprint: &mut Blueprint, save: &TermSave) -> Decision {
        let args = &save.args;
        let mut command = if save.update {
            WpCommand::new("term", "update")
                .arg(&save.taxonomy)
                .arg(save.term_id)
                .flag("name", &args.name)
        } else {
            WpCommand::new("term", "create")
                .arg(&save.taxonomy)
                .quoted(&args.name)
        };

        if let Some(slug) = non_empty_str(args.slug.as_ref()) {
            command = command.flag("slug", slug);
        }
        if let Some(description) = non_empty_str(args.description.as_ref()) {
            command = command.flag("description", description);
        }
        if let Some(parent) = non_empty_str(args.parent.as_ref()) {
            command = command.bare_flag("parent", parent);
        }

        blueprint.push(Step::recorded(StepKind::wp_cli(command.build())));
        Decision::Appended
    }

    fn save_post(
        blueprint: &mut Blueprint,
        save: &PostSave,
        snapshot: Option<&PostSnapshot>,
    ) -> Decision {
        let command = if save.update {
            let snapshot = match snapshot {
                None => return Decision::Dropped(DropReason::MissingSnapshot),
                Some(s) if s.post_id != save.post_id => {
                    return Decision::Dropped(DropReason::SnapshotMismatch);
                }
                Some(s) => s,
            };
            match post_update_command(save, snapshot) {
                Some(command) => command,
                None => return Decision::Unchanged,
            }
        } else {
            post_create_command(save)
        };

        blueprint.push(Step::for_post(save.post_id, StepKind::wp_cli(command)));
        Decision::Appended
    }

    fn delete_post(blueprint: &mut Blueprint, delete: &PostDelete) -> Decision {
        let before = blueprint.steps.len();
        blueprint
            .steps
            .retain(|step| !provisions_post(step, delete.post_id));
        let removed = before.saturating_sub(blueprint.steps.len());

        if removed > 0 {
            return Decision::Removed(removed);
        }

        let command = WpCommand::new("post", "delete").arg(delete.post_id).build();
        blueprint.push(Step::recorded(StepKind::wp_cli(command)));
        Decision::Appended
    }

    fn update_user_meta(blueprint: &mut Blueprint, update: &UserMetaUpdate) -> Decision {
        let mut meta = Map::new();
        meta.insert(update.meta_key.clone(), update.meta_value.clone());
        blueprint.push(Step::recorded(StepKind::UpdateUserMeta(UpdateUserMeta {
            meta,
            user_id: update.user_id,
            extra: Map::new(),
        })));
        Decision::Appended
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Directory-style slug of a plugin path.
///
/// `akismet/akismet.php` → `akismet`; a single-file plugin `foo.php` → `foo`.
#[must_use]
pub fn plugin_slug(path: &str) -> &str {
    match path.split_once('/') {
        Some((dir, _)) => dir,
        None => path.strip_suffix(".php").unwrap_or(path),
    }
}

/// Turn activation on for an install step that has no options yet.
/// Existing options are left alone.
fn set_activate(options: &mut Option<InstallOptions>) -> Decision {
    if options.is_some() {
        return Decision::Unchanged;
    }
    *options = Some(InstallOptions::activate());
    Decision::Merged
}

/// Switch networking on; an otherwise unchanged document becomes merged.
fn with_networking(blueprint: &mut Blueprint, decision: Decision) -> Decision {
    let enabled = blueprint.enable_feature(NETWORKING_FEATURE);
    match decision {
        Decision::Unchanged if enabled => Decision::Merged,
        other => other,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

/// Text a post field is written as on the command line.
fn field_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(field_text)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn is_insert_default(field: &str, text: &str) -> bool {
    POST_INSERT_DEFAULTS
        .iter()
        .any(|(name, default)| *name == field && *default == text)
}

fn post_create_command(save: &PostSave) -> String {
    let mut command = WpCommand::new("post", "create");
    for (field, value) in &save.post {
        if IGNORED_POST_FIELDS.contains(&field.as_str()) {
            continue;
        }
        let text = field_text(value);
        if text.is_empty() || is_insert_default(field, &text) {
            continue;
        }
        command = command.flag(field, &text);
    }
    command.build()
}

/// `None` when no field changed.
fn post_update_command(save: &PostSave, snapshot: &PostSnapshot) -> Option<String> {
    let mut command = WpCommand::new("post", "update").arg(save.post_id);
    let mut changed = false;
    for (field, value) in &save.post {
        if IGNORED_POST_FIELDS.contains(&field.as_str()) {
            continue;
        }
        let new = field_text(value);
        let old = snapshot.fields.get(field).map(field_text).unwrap_or_default();
        if new != old {
            command = command.flag(field, &new);
            changed = true;
        }
    }
    changed.then(|| command.build())
}

/// A command step created for `post` by a save.
fn provisions_post(step: &Step, post: PostId) -> bool {
    match (&step.provenance, &step.kind) {
        (Some(Provenance::Post(id)), StepKind::WpCli(cli)) => {
            *id == post && cli.command.starts_with(POST_COMMAND_PREFIX)
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
    use crate::event::TermArgs;
    use crate::types::{TermId, UserId};
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn apply(bp: &mut Blueprint, mutation: Mutation) -> Decision {
        Synthesizer::apply_mutation(bp, &mutation, None)
    }

    fn activate(path: &str) -> Mutation {
        Mutation::PluginActivated(PluginActivation {
            plugin: path.to_string(),
            network_wide: false,
        })
    }

    fn set(name: &str, value: Value) -> Mutation {
        Mutation::OptionWritten(OptionWrite {
            option: name.to_string(),
            old_value: None,
            value: Some(value),
            network_id: None,
        })
    }

    fn term(update: bool, args: Value) -> Mutation {
        let args: TermArgs = serde_json::from_value(args).expect("term args");
        Mutation::TermSaved(TermSave {
            term_id: TermId(12),
            taxonomy: "category".to_string(),
            update,
            args,
        })
    }

    fn save(id: u64, update: bool, post: Value) -> PostSave {
        PostSave {
            post_id: PostId(id),
            post: fields(post),
            update,
        }
    }

    fn commands(bp: &Blueprint) -> Vec<String> {
        bp.commands().map(|c| c.command.clone()).collect()
    }

    #[test]
    fn plugin_slug_from_directory_or_file() {
        assert_eq!(plugin_slug("akismet/akismet.php"), "akismet");
        assert_eq!(plugin_slug("classic-editor/classic-editor.php"), "classic-editor");
        assert_eq!(plugin_slug("single.php"), "single");
    }

    #[test]
    fn activation_appends_install_and_enables_networking() {
        let mut bp = Blueprint::new();
        assert_eq!(apply(&mut bp, activate("akismet/akismet.php")), Decision::Appended);

        assert_eq!(bp.steps.len(), 2);
        assert!(bp.feature(NETWORKING_FEATURE));
        let install = bp.install_plugin_mut("akismet").expect("install step");
        assert_eq!(install.plugin_data.resource, PLUGIN_RESOURCE);
        assert_eq!(install.options.as_ref().and_then(|o| o.activate), Some(true));
    }

    #[test]
    fn repeated_activation_changes_nothing() {
        let mut bp = Blueprint::new();
        apply(&mut bp, activate("akismet/akismet.php"));
        let before = bp.clone();

        assert_eq!(apply(&mut bp, activate("akismet/akismet.php")), Decision::Unchanged);
        assert_eq!(bp, before);
    }

    #[test]
    fn activation_merges_into_seeded_install_without_options() {
        let mut bp = Blueprint::new();
        let mut kind = StepKind::install_plugin(PLUGIN_RESOURCE, "gutenberg");
        if let StepKind::InstallPlugin(install) = &mut kind {
            install.options = None;
        }
        bp.push(Step::seeded(kind));

        assert_eq!(apply(&mut bp, activate("gutenberg/gutenberg.php")), Decision::Merged);
        assert_eq!(bp.steps.len(), 2);
        let install = bp.install_plugin_mut("gutenberg").expect("install step");
        assert_eq!(install.options.as_ref().and_then(|o| o.activate), Some(true));
    }

    #[test]
    fn existing_options_are_never_overwritten() {
        let mut bp = Blueprint::new();
        let mut kind = StepKind::install_plugin(PLUGIN_RESOURCE, "gutenberg");
        if let StepKind::InstallPlugin(install) = &mut kind {
            install.options = Some(InstallOptions {
                activate: Some(false),
                extra: Map::new(),
            });
        }
        bp.push(Step::seeded(kind));

        // Only the networking flag changes.
        assert_eq!(apply(&mut bp, activate("gutenberg/gutenberg.php")), Decision::Merged);
        let install = bp.install_plugin_mut("gutenberg").expect("install step");
        assert_eq!(install.options.as_ref().and_then(|o| o.activate), Some(false));
    }

    #[test]
    fn hello_dolly_is_activated_not_installed() {
        let mut bp = Blueprint::new();
        assert_eq!(apply(&mut bp, activate("hello.php")), Decision::Appended);

        assert!(matches!(
            &bp.steps[1].kind,
            StepKind::ActivatePlugin(a) if a.plugin_path == "hello.php"
        ));
        assert!(bp.features.is_none());
    }

    #[test]
    fn theme_switch_appends_install_theme() {
        let mut bp = Blueprint::new();
        let switch = Mutation::ThemeSwitched(ThemeSwitch {
            stylesheet: "twentytwentyfour".to_string(),
            name: Some("Twenty Twenty-Four".to_string()),
        });

        assert_eq!(apply(&mut bp, switch.clone()), Decision::Appended);
        assert_eq!(apply(&mut bp, switch), Decision::Unchanged);

        let theme = bp.install_theme_mut("twentytwentyfour").expect("theme step");
        assert_eq!(theme.theme_data.resource, THEME_RESOURCE);
        assert!(bp.feature(NETWORKING_FEATURE));
    }

    #[test]
    fn options_accumulate_in_one_step() {
        let mut bp = Blueprint::new();
        assert_eq!(apply(&mut bp, set("a", json!(1))), Decision::Appended);
        assert_eq!(apply(&mut bp, set("b", json!(2))), Decision::Merged);
        assert_eq!(apply(&mut bp, set("b", json!(2))), Decision::Unchanged);

        assert_eq!(bp.steps.len(), 2);
        let options = bp.site_options_mut().expect("options step");
        assert_eq!(Value::Object(options.options.clone()), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn structured_option_values_are_stored_as_json_text() {
        let mut bp = Blueprint::new();
        apply(&mut bp, set("widget", json!({"title": "Hi", "count": 3})));
        let options = bp.site_options_mut().expect("options step");
        assert_eq!(options.options["widget"], json!("{\"title\":\"Hi\",\"count\":3}"));
    }

    #[test]
    fn pending_admin_email_is_stored_as_admin_email() {
        let mut bp = Blueprint::new();
        apply(&mut bp, set("new_admin_email", json!("me@example.com")));
        let options = bp.site_options_mut().expect("options step");
        assert_eq!(options.options.get("admin_email"), Some(&json!("me@example.com")));
        assert!(options.options.get("new_admin_email").is_none());
    }

    #[test]
    fn term_create_adds_only_non_empty_string_flags() {
        let mut bp = Blueprint::new();
        apply(
            &mut bp,
            term(false, json!({"name": "News", "slug": "news", "description": "", "parent": 0})),
        );
        assert_eq!(commands(&bp), vec!["wp term create category \"News\" --slug=\"news\""]);
    }

    #[test]
    fn term_update_names_the_term_id() {
        let mut bp = Blueprint::new();
        apply(
            &mut bp,
            term(true, json!({"name": "Say \"hi\"", "description": "d", "parent": "4"})),
        );
        assert_eq!(
            commands(&bp),
            vec!["wp term update category 12 --name=\"Say \\\"hi\\\"\" --description=\"d\" --parent=4"]
        );
    }

    #[test]
    fn post_create_skips_defaults_and_empty_fields() {
        let mut bp = Blueprint::new();
        let post = save(
            42,
            false,
            json!({
                "ID": 42,
                "post_title": "Hello",
                "post_content": "",
                "post_status": "publish",
                "post_type": "post",
                "post_parent": 0,
                "post_category": [1, 3],
                "tags_input": [],
                "guid": "http://x/?p=42"
            }),
        );
        let decision = Synthesizer::apply_mutation(&mut bp, &Mutation::PostSaved(post), None);

        assert_eq!(decision, Decision::Appended);
        assert_eq!(
            commands(&bp),
            vec!["wp post create --post_title=\"Hello\" --post_status=\"publish\" --post_category=\"1,3\""]
        );
        assert_eq!(bp.steps[1].provenance, Some(Provenance::Post(PostId(42))));
    }

    #[test]
    fn post_update_writes_changed_fields_only() {
        let mut bp = Blueprint::new();
        let snapshot = PostSnapshot {
            post_id: PostId(7),
            fields: fields(json!({"ID": 7, "post_title": "Old", "post_content": "Body", "post_modified": "a"})),
        };
        let post = save(
            7,
            true,
            json!({"ID": 7, "post_title": "New", "post_content": "Body", "post_modified": "b"}),
        );

        let decision =
            Synthesizer::apply_mutation(&mut bp, &Mutation::PostSaved(post), Some(&snapshot));
        assert_eq!(decision, Decision::Appended);
        assert_eq!(commands(&bp), vec!["wp post update 7 --post_title=\"New\""]);
    }

    #[test]
    fn post_update_without_changes_records_nothing() {
        let mut bp = Blueprint::new();
        let snapshot = PostSnapshot {
            post_id: PostId(7),
            fields: fields(json!({"post_title": "Same", "post_modified": "a"})),
        };
        let post = save(7, true, json!({"post_title": "Same", "post_modified": "b"}));

        let decision =
            Synthesizer::apply_mutation(&mut bp, &Mutation::PostSaved(post), Some(&snapshot));
        assert_eq!(decision, Decision::Unchanged);
        assert_eq!(bp.steps.len(), 1);
    }

    #[test]
    fn post_update_needs_matching_snapshot() {
        let mut bp = Blueprint::new();
        let post = Mutation::PostSaved(save(7, true, json!({"post_title": "New"})));

        assert_eq!(
            Synthesizer::apply_mutation(&mut bp, &post, None),
            Decision::Dropped(DropReason::MissingSnapshot)
        );

        let other = PostSnapshot {
            post_id: PostId(8),
            fields: fields(json!({"post_title": "Old"})),
        };
        assert_eq!(
            Synthesizer::apply_mutation(&mut bp, &post, Some(&other)),
            Decision::Dropped(DropReason::SnapshotMismatch)
        );
        assert_eq!(bp.steps.len(), 1);
    }

    #[test]
    fn delete_cancels_create_and_update() {
        let mut bp = Blueprint::new();
        bp.push(Step::for_post(PostId(5), StepKind::wp_cli("wp post create --post_title=\"A\"")));
        bp.push(Step::for_post(PostId(5), StepKind::wp_cli("wp post update 5 --post_title=\"B\"")));
        bp.push(Step::for_post(PostId(6), StepKind::wp_cli("wp post create --post_title=\"C\"")));

        let delete = Mutation::PostDeleted(PostDelete { post_id: PostId(5) });
        assert_eq!(apply(&mut bp, delete), Decision::Removed(2));
        assert_eq!(bp.steps.len(), 2);
    }

    #[test]
    fn delete_of_unknown_post_appends_delete_command() {
        let mut bp = Blueprint::new();
        // A seeded command for the same id is not the recorder's to remove.
        bp.push(Step::seeded(StepKind::wp_cli("wp post create --post_title=\"Seed\"")));

        let delete = Mutation::PostDeleted(PostDelete { post_id: PostId(9) });
        assert_eq!(apply(&mut bp, delete), Decision::Appended);
        assert_eq!(
            bp.steps.last().map(|s| (s.provenance, s.kind.clone())),
            Some((Some(Provenance::Recorded), StepKind::wp_cli("wp post delete 9")))
        );
    }

    #[test]
    fn user_meta_is_never_merged() {
        let mut bp = Blueprint::new();
        let meta = || {
            Mutation::UserMetaUpdated(UserMetaUpdate {
                user_id: UserId(1),
                meta_key: "admin_color".to_string(),
                meta_value: json!("midnight"),
                meta_id: Some(3),
            })
        };
        apply(&mut bp, meta());
        apply(&mut bp, meta());

        assert_eq!(bp.steps.len(), 3);
        let json = serde_json::to_value(&bp.steps[1]).expect("serialize");
        assert_eq!(
            json,
            json!({"step": "updateUserMeta", "meta": {"admin_color": "midnight"}, "userId": 1, "_recorder": true})
        );
    }

    #[test]
    fn decision_reports_change() {
        assert!(Decision::Appended.changed());
        assert!(Decision::Removed(1).changed());
        assert!(!Decision::Unchanged.changed());
        assert!(!Decision::Suppressed(Suppression::Unchanged).changed());
        assert!(!Decision::Dropped(DropReason::MissingSnapshot).changed());
    }

    #[test]
    fn decision_serializes_with_detail() {
        let json = serde_json::to_value(Decision::Removed(2)).expect("serialize");
        assert_eq!(json, json!({"decision": "removed", "detail": 2}));

        let json = serde_json::to_value(Decision::Suppressed(Suppression::AutoDraft))
            .expect("serialize");
        assert_eq!(json, json!({"decision": "suppressed", "detail": "auto_draft"}));

        let json = serde_json::to_value(Decision::Appended).expect("serialize");
        assert_eq!(json, json!({"decision": "appended"}));
    }
}
