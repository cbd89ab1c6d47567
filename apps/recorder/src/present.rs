//! # Presentation Adapter
//!
//! Formats the working blueprint for the outside world: the review page,
//! the playground handoff URL and the side-channel message answering a
//! query. Everything leaving through here is cleaned first.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use recorder_core::{Blueprint, clean};
use serde::{Deserialize, Serialize};

/// Where blueprints are handed off to.
pub const PLAYGROUND_URL: &str = "https://playground.wordpress.net";

/// Path of the blueprint builder on the playground.
pub const BUILDER_PATH: &str = "/builder/builder.html";

/// Query kind that opens the builder instead of the playground.
pub const BUILDER_OPEN: &str = "builder-open";

/// Placeholder used when a document cannot be serialized.
const EMPTY_DOCUMENT: &str = "{}";

/// Pretty JSON of the working document and of the seed it started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub blueprint: String,
    /// `None` when there is no seed or it renders identically.
    pub seed: Option<String>,
}

/// Message delivered to the browser after a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffMessage {
    /// Pretty JSON of the cleaned blueprint.
    pub blueprint: String,
    /// The query kind, passed through untouched.
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// Pretty JSON of the cleaned document, `{}` on failure.
pub fn pretty(doc: &Blueprint) -> String {
    serde_json::to_string_pretty(&clean(doc)).unwrap_or_else(|_| EMPTY_DOCUMENT.to_string())
}

/// Render the working document and, if it differs, the seed.
pub fn render(working: &Blueprint, seed: Option<&Blueprint>) -> Rendered {
    let blueprint = pretty(working);
    let seed = seed.map(pretty).filter(|text| *text != blueprint);
    Rendered { blueprint, seed }
}

/// Playground URL carrying the cleaned document as base64 JSON.
pub fn handoff_url(doc: &Blueprint, builder: bool) -> String {
    let mut url = String::from(PLAYGROUND_URL);
    if builder {
        url.push_str(BUILDER_PATH);
    }
    let json = serde_json::to_string(&clean(doc)).unwrap_or_else(|_| EMPTY_DOCUMENT.to_string());
    url.push('#');
    url.push_str(&STANDARD.encode(json));
    url
}

/// Build the side-channel answer to a query of `kind`.
pub fn respond_to_query(doc: &Blueprint, kind: &str) -> HandoffMessage {
    HandoffMessage {
        blueprint: pretty(doc),
        kind: kind.to_string(),
        url: handoff_url(doc, kind == BUILDER_OPEN),
    }
}

/// Number of steps the recorder generated.
pub fn recorded_step_count(doc: &Blueprint) -> usize {
    doc.recorded_step_count()
}
