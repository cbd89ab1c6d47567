//! # Blueprint Document
//!
//! The ordered step document the recorder maintains.
//!
//! Replay order is `steps` order. Nothing in the recorder reorders steps:
//! rules either append, edit a step in place, or remove steps.

use crate::primitives::PROVENANCE_KEY;
use crate::step::{InstallPlugin, InstallTheme, SetSiteOptions, Step, StepKind, WpCli};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A blueprint: feature flags plus an ordered list of steps.
///
/// Top-level keys the recorder does not model (`landingPage`,
/// `preferredVersions`, ...) are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Counter bumped on every persisted change. Internal only.
    #[serde(
        rename = "_recorder",
        default,
        deserialize_with = "lenient_revision",
        skip_serializing_if = "Option::is_none"
    )]
    pub revision: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, bool>>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A counter that is not an integer (or integer string) reads as absent
/// rather than failing the whole document.
fn lenient_revision<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

impl Default for Blueprint {
    /// The one-step document: `login` only.
    fn default() -> Self {
        Self {
            revision: Some(0),
            extra: Map::new(),
            features: None,
            steps: vec![Step::login()],
        }
    }
}

impl Blueprint {
    /// Create the default one-step blueprint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a blueprint from steps, without a revision counter.
    #[must_use]
    pub fn with_steps(steps: Vec<Step>) -> Self {
        Self {
            revision: None,
            extra: Map::new(),
            features: None,
            steps,
        }
    }

    /// Current revision, `0` when never counted.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.unwrap_or(0)
    }

    /// Increment the revision counter.
    pub fn bump_revision(&mut self) {
        self.revision = Some(self.revision().saturating_add(1));
    }

    /// Whether a feature flag is on.
    #[must_use]
    pub fn feature(&self, name: &str) -> bool {
        self.features
            .as_ref()
            .and_then(|f| f.get(name).copied())
            .unwrap_or(false)
    }

    /// Turn a feature flag on, creating the map on first use.
    ///
    /// Returns `true` if the flag was not already on.
    pub fn enable_feature(&mut self, name: &str) -> bool {
        let features = self.features.get_or_insert_with(BTreeMap::new);
        features.insert(name.to_string(), true) != Some(true)
    }

    /// Number of steps generated by the recorder.
    #[must_use]
    pub fn recorded_step_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_recorded()).count()
    }

    /// First `installPlugin` step for `slug`.
    pub fn install_plugin_mut(&mut self, slug: &str) -> Option<&mut InstallPlugin> {
        self.steps.iter_mut().find_map(|step| match &mut step.kind {
            StepKind::InstallPlugin(install) if install.plugin_data.slug == slug => Some(install),
            _ => None,
        })
    }

    /// First `installTheme` step for `slug`.
    pub fn install_theme_mut(&mut self, slug: &str) -> Option<&mut InstallTheme> {
        self.steps.iter_mut().find_map(|step| match &mut step.kind {
            StepKind::InstallTheme(install) if install.theme_data.slug == slug => Some(install),
            _ => None,
        })
    }

    /// The `setSiteOptions` step, if the blueprint has one.
    pub fn site_options_mut(&mut self) -> Option<&mut SetSiteOptions> {
        self.steps.iter_mut().find_map(|step| match &mut step.kind {
            StepKind::SetSiteOptions(options) => Some(options),
            _ => None,
        })
    }

    /// All `wp-cli` commands, in step order.
    pub fn commands(&self) -> impl Iterator<Item = &WpCli> {
        self.steps.iter().filter_map(|step| match &step.kind {
            StepKind::WpCli(cli) => Some(cli),
            _ => None,
        })
    }

    /// Append a step.
    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Copy of the blueprint with the revision counter and every step's
    /// provenance removed. This is the only form that leaves the recorder.
    #[must_use]
    pub fn cleaned(&self) -> Self {
        Self {
            revision: None,
            extra: self
                .extra
                .iter()
                .filter(|(key, _)| key.as_str() != PROVENANCE_KEY)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            features: self.features.clone(),
            steps: self.steps.iter().map(Step::cleaned).collect(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PostId;
    use serde_json::json;

    #[test]
    fn default_is_single_login_step() {
        let bp = Blueprint::new();
        assert_eq!(bp.steps.len(), 1);
        assert!(matches!(bp.steps[0].kind, StepKind::Login(_)));
        assert_eq!(bp.revision(), 0);
        assert!(bp.features.is_none());
    }

    #[test]
    fn non_integer_revision_reads_as_absent() {
        let bp: Blueprint = serde_json::from_value(json!({
            "_recorder": true,
            "steps": [{"step": "login"}]
        }))
        .expect("parse");
        assert_eq!(bp.revision, None);
        assert_eq!(bp.steps.len(), 1);

        let bp: Blueprint =
            serde_json::from_value(json!({"_recorder": "12", "steps": []})).expect("parse");
        assert_eq!(bp.revision, Some(12));
    }

    #[test]
    fn revision_serializes_under_marker_key() {
        let mut bp = Blueprint::new();
        bp.bump_revision();
        let json = serde_json::to_value(&bp).expect("serialize");
        assert_eq!(json[PROVENANCE_KEY], json!(1));
    }

    #[test]
    fn enable_feature_reports_change_once() {
        let mut bp = Blueprint::new();
        assert!(bp.enable_feature("networking"));
        assert!(!bp.enable_feature("networking"));
        assert!(bp.feature("networking"));
        assert!(!bp.feature("other"));
    }

    #[test]
    fn unknown_top_level_keys_survive() {
        let raw = json!({
            "landingPage": "/wp-admin/",
            "preferredVersions": {"php": "8.2", "wp": "latest"},
            "steps": [{"step": "login"}]
        });
        let bp: Blueprint = serde_json::from_value(raw.clone()).expect("parse");
        assert_eq!(bp.revision, None);
        assert_eq!(serde_json::to_value(&bp).expect("serialize"), raw);
    }

    #[test]
    fn cleaned_strips_every_marker() {
        let mut bp = Blueprint::new();
        bp.bump_revision();
        bp.push(Step::for_post(PostId(1), StepKind::wp_cli("wp post create")));
        bp.push(Step::recorded(StepKind::wp_cli("wp term create category \"A\"")));

        let cleaned = bp.cleaned();
        assert_eq!(cleaned.recorded_step_count(), 0);

        let text = serde_json::to_string(&cleaned).expect("serialize");
        assert!(!text.contains(PROVENANCE_KEY));
        assert_eq!(cleaned.steps.len(), 3);
    }

    #[test]
    fn finds_first_matching_install_step() {
        let mut bp = Blueprint::new();
        bp.push(Step::seeded(StepKind::install_plugin("wordpress.org/plugins", "gutenberg")));
        bp.push(Step::seeded(StepKind::install_plugin("wordpress.org/plugins", "akismet")));

        assert!(bp.install_plugin_mut("akismet").is_some());
        assert!(bp.install_plugin_mut("jetpack").is_none());
        assert!(bp.install_theme_mut("akismet").is_none());
    }
}
