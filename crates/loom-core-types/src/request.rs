use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single numbered step of a `TestRequest`, as authored in prose.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestStep {
    pub index: u32,
    pub text: String,
}

/// A natural-language test scenario parsed from Markdown.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub steps: Vec<TestStep>,
    pub source_path: PathBuf,
}
