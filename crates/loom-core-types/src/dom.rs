use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attribute subset captured for every visited element.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "aria-label", default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(rename = "data-test", default, skip_serializing_if = "Option::is_none")]
    pub data_test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// A node in the abbreviated DOM tree, keyed by a stable id written back onto
/// the live page as `data-dom-id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomNode {
    pub dom_id: String,
    pub tag: String,
    pub depth: u32,
    #[serde(default)]
    pub attrs: NodeAttrs,
    /// Ancestor-chain path, e.g. `body > div#app > ul.list > li`.
    pub path: String,
    /// Visible text, truncated to 120 chars.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub children: Vec<DomNode>,
}

/// A flat descriptor for any `input/textarea/select/button`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Control {
    pub dom_id: String,
    pub tag: String,
    #[serde(default)]
    pub attrs: NodeAttrs,
    pub path: String,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub node_count: u32,
    pub max_depth: u32,
}

/// An offline bundle of one page at one moment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub snapshot_id: String,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub dom_tree: DomNode,
    pub controls: Vec<Control>,
    pub a11y_tree: serde_json::Value,
    pub html: String,
    pub stats: SnapshotStats,
}

/// Options governing a single `Snapshot` capture.
#[derive(Clone, Debug)]
pub struct SnapshotOpts {
    pub wait_for: Option<String>,
    pub timeout_ms: u64,
    pub max_depth: u32,
    pub max_nodes: u32,
    pub include_screenshot: bool,
    pub headless: bool,
}

impl Default for SnapshotOpts {
    fn default() -> Self {
        Self {
            wait_for: None,
            timeout_ms: 30_000,
            max_depth: 8,
            max_nodes: 1000,
            include_screenshot: false,
            headless: true,
        }
    }
}

/// Skip-list of tags the snapshot walker never descends into.
pub fn skipped_tags() -> &'static [&'static str] {
    &[
        "script", "style", "noscript", "iframe", "embed", "object", "svg", "meta", "link", "head",
    ]
}

/// Tags eligible to become a `Control`.
pub fn control_tags() -> &'static [&'static str] {
    &["input", "textarea", "select", "button"]
}
