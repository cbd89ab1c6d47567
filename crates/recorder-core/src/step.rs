//! # Step Model
//!
//! One provisioning step of a blueprint.
//!
//! On the wire a step is a JSON object discriminated by its `step` key,
//! e.g. `{"step": "installPlugin", "pluginData": {...}}`. In memory it is a
//! [`Step`]: an optional [`Provenance`] plus a [`StepKind`] with one typed
//! variant per step the recorder understands.
//!
//! Steps the recorder never generates (filesystem, SQL, ...) are kept as
//! [`StepKind::Unsupported`] and written back exactly as they were read.
//! The same fallback applies to a known tag whose body does not have the
//! typed shape, so a seed document is never rejected for its step contents.

use crate::primitives::PROVENANCE_KEY;
use crate::types::{PostId, UserId};
use serde::de::{Deserializer, Error as _};
use serde::ser::{Error as _, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key carrying the step discriminator.
pub const STEP_TAG: &str = "step";

// =============================================================================
// PROVENANCE
// =============================================================================

/// Where a step came from.
///
/// A step without provenance was pre-seeded. `Recorded` serializes as
/// `true`; `Post` serializes as the post id and marks the command step that
/// created or updated that post, so a later delete can find it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Generated by the synthesizer.
    Recorded,
    /// Generated by the synthesizer for a create or update of this post.
    Post(PostId),
}

impl Provenance {
    /// The post this step provisions, if any.
    #[must_use]
    pub fn post_id(self) -> Option<PostId> {
        match self {
            Self::Recorded => None,
            Self::Post(id) => Some(id),
        }
    }

    fn to_value(self) -> Value {
        match self {
            Self::Recorded => Value::Bool(true),
            Self::Post(id) => Value::from(id.0),
        }
    }

    /// Any marker value counts as provenance; integers (or integer strings)
    /// carry a post id.
    fn from_value(value: &Value) -> Self {
        let id = match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        };
        id.map_or(Self::Recorded, |id| Self::Post(PostId(id)))
    }
}

impl Serialize for Provenance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Provenance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

// =============================================================================
// STEP PAYLOADS
// =============================================================================

/// `{"step": "login"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Login {
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where a plugin or theme is downloaded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageData {
    pub resource: String,
    pub slug: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackageData {
    #[must_use]
    pub fn new(resource: &str, slug: impl Into<String>) -> Self {
        Self {
            resource: resource.to_string(),
            slug: slug.into(),
            extra: Map::new(),
        }
    }
}

/// Options of an install step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activate: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InstallOptions {
    /// `{"activate": true}`.
    #[must_use]
    pub fn activate() -> Self {
        Self {
            activate: Some(true),
            extra: Map::new(),
        }
    }
}

/// `{"step": "installPlugin", "pluginData": {...}, "options": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallPlugin {
    pub plugin_data: PackageData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<InstallOptions>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{"step": "activatePlugin", "pluginPath": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivatePlugin {
    pub plugin_path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{"step": "installTheme", "themeData": {...}, "options": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallTheme {
    pub theme_data: PackageData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<InstallOptions>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{"step": "setSiteOptions", "options": {...}}`. At most one per blueprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetSiteOptions {
    pub options: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{"step": "wp-cli", "command": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WpCli {
    pub command: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{"step": "updateUserMeta", "meta": {...}, "userId": 1}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserMeta {
    pub meta: Map<String, Value>,
    pub user_id: UserId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// STEP KIND
// =============================================================================

/// The action a step performs.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    Login(Login),
    InstallPlugin(InstallPlugin),
    ActivatePlugin(ActivatePlugin),
    InstallTheme(InstallTheme),
    SetSiteOptions(SetSiteOptions),
    WpCli(WpCli),
    UpdateUserMeta(UpdateUserMeta),
    /// A step kept verbatim, `step` key included.
    Unsupported(Map<String, Value>),
}

impl StepKind {
    /// `installPlugin` from the plugin directory, activated.
    #[must_use]
    pub fn install_plugin(resource: &str, slug: impl Into<String>) -> Self {
        Self::InstallPlugin(InstallPlugin {
            plugin_data: PackageData::new(resource, slug),
            options: Some(InstallOptions::activate()),
            extra: Map::new(),
        })
    }

    /// `installTheme` from the theme directory, activated.
    #[must_use]
    pub fn install_theme(resource: &str, slug: impl Into<String>) -> Self {
        Self::InstallTheme(InstallTheme {
            theme_data: PackageData::new(resource, slug),
            options: Some(InstallOptions::activate()),
            extra: Map::new(),
        })
    }

    #[must_use]
    pub fn activate_plugin(path: impl Into<String>) -> Self {
        Self::ActivatePlugin(ActivatePlugin {
            plugin_path: path.into(),
            extra: Map::new(),
        })
    }

    #[must_use]
    pub fn wp_cli(command: impl Into<String>) -> Self {
        Self::WpCli(WpCli {
            command: command.into(),
            extra: Map::new(),
        })
    }

    /// The value of the `step` key.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Login(_) => "login",
            Self::InstallPlugin(_) => "installPlugin",
            Self::ActivatePlugin(_) => "activatePlugin",
            Self::InstallTheme(_) => "installTheme",
            Self::SetSiteOptions(_) => "setSiteOptions",
            Self::WpCli(_) => "wp-cli",
            Self::UpdateUserMeta(_) => "updateUserMeta",
            Self::Unsupported(raw) => raw.get(STEP_TAG).and_then(Value::as_str).unwrap_or(""),
        }
    }

    /// Fields of the step other than the tag. Unsupported steps return their
    /// whole raw object.
    fn body(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let value = match self {
            Self::Login(s) => serde_json::to_value(s)?,
            Self::InstallPlugin(s) => serde_json::to_value(s)?,
            Self::ActivatePlugin(s) => serde_json::to_value(s)?,
            Self::InstallTheme(s) => serde_json::to_value(s)?,
            Self::SetSiteOptions(s) => serde_json::to_value(s)?,
            Self::WpCli(s) => serde_json::to_value(s)?,
            Self::UpdateUserMeta(s) => serde_json::to_value(s)?,
            Self::Unsupported(raw) => return Ok(raw.clone()),
        };
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    /// Parse a step object (provenance already removed).
    fn from_map(raw: Map<String, Value>) -> Self {
        let Some(tag) = raw.get(STEP_TAG).and_then(Value::as_str) else {
            return Self::Unsupported(raw);
        };

        let mut body = raw.clone();
        body.shift_remove(STEP_TAG);
        let body = Value::Object(body);

        let parsed = match tag {
            "login" => serde_json::from_value(body).map(Self::Login),
            "installPlugin" => serde_json::from_value(body).map(Self::InstallPlugin),
            "activatePlugin" => serde_json::from_value(body).map(Self::ActivatePlugin),
            "installTheme" => serde_json::from_value(body).map(Self::InstallTheme),
            "setSiteOptions" => serde_json::from_value(body).map(Self::SetSiteOptions),
            "wp-cli" => serde_json::from_value(body).map(Self::WpCli),
            "updateUserMeta" => serde_json::from_value(body).map(Self::UpdateUserMeta),
            _ => return Self::Unsupported(raw),
        };

        parsed.unwrap_or(Self::Unsupported(raw))
    }
}

// =============================================================================
// STEP
// =============================================================================

/// A step of the blueprint together with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub provenance: Option<Provenance>,
    pub kind: StepKind,
}

impl Step {
    /// A pre-seeded step (no provenance).
    #[must_use]
    pub fn seeded(kind: StepKind) -> Self {
        Self {
            provenance: None,
            kind,
        }
    }

    /// A step generated by the synthesizer.
    #[must_use]
    pub fn recorded(kind: StepKind) -> Self {
        Self {
            provenance: Some(Provenance::Recorded),
            kind,
        }
    }

    /// A command step provisioning `post`.
    #[must_use]
    pub fn for_post(post: PostId, kind: StepKind) -> Self {
        Self {
            provenance: Some(Provenance::Post(post)),
            kind,
        }
    }

    /// The `login` step every fresh blueprint starts with.
    #[must_use]
    pub fn login() -> Self {
        Self::seeded(StepKind::Login(Login::default()))
    }

    #[must_use]
    pub fn is_recorded(&self) -> bool {
        self.provenance.is_some()
    }

    /// Copy of the step without provenance.
    #[must_use]
    pub fn cleaned(&self) -> Self {
        Self::seeded(self.kind.clone())
    }

    /// The step as a JSON object: tag first, then fields, then provenance.
    pub fn to_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut map = Map::new();
        if !matches!(self.kind, StepKind::Unsupported(_)) {
            map.insert(STEP_TAG.to_string(), Value::from(self.kind.tag()));
        }
        map.extend(self.kind.body()?);
        if let Some(provenance) = self.provenance {
            map.insert(PROVENANCE_KEY.to_string(), provenance.to_value());
        }
        Ok(map)
    }

    /// Build a step from a JSON object. Never fails: shapes the recorder does
    /// not understand become [`StepKind::Unsupported`].
    #[must_use]
    pub fn from_map(mut raw: Map<String, Value>) -> Self {
        let provenance = raw
            .shift_remove(PROVENANCE_KEY)
            .map(|value| Provenance::from_value(&value));
        Self {
            provenance,
            kind: StepKind::from_map(raw),
        }
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().map_err(S::Error::custom)?.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(D::Error::custom(format!(
                "step must be an object, found {}",
                other
            ))),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
