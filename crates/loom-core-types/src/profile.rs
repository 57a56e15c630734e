use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A human-meaningful name for a DOM region, mapped to a selector plus metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteAlias {
    pub name: String,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Human-language capability tag, e.g. "输入框", "按钮", "文本", "图片", "链接", "标题".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Advisory only; the compiler's scorer never reads this field (see DESIGN.md).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Owning page id, populated by the profile store on load so the compiler
    /// can reason about "same page" relationships without a back-pointer cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
}

/// A single page's alias table plus its prior revisions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageEntry {
    pub id: String,
    pub name: String,
    pub url_pattern: String,
    pub version: String,
    pub generated_at: String,
    pub generated_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, SiteAlias>,
    #[serde(default)]
    pub history: Vec<Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SiteInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// A collection of per-page alias tables for one site.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteProfile {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteInfo>,
    #[serde(default)]
    pub pages: Vec<PageEntry>,
}

/// The annotator's output: a page entry plus any warnings raised while
/// reconciling the LLM's reply. Fed into `SiteProfileStore::merge_page`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnnotatedPage {
    pub page_id: String,
    pub page_name: String,
    pub url_pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub aliases: Vec<SiteAlias>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Outcome of a `merge_page` call.
#[derive(Clone, Debug)]
pub struct MergeResult {
    pub output_path: std::path::PathBuf,
    pub created_new_file: bool,
    pub page_id: String,
    pub warnings: Vec<String>,
}

impl SiteProfile {
    pub fn empty(version: String) -> Self {
        Self {
            version,
            site: None,
            pages: Vec::new(),
        }
    }

    pub fn page(&self, page_id: &str) -> Option<&PageEntry> {
        self.pages.iter().find(|p| p.id == page_id)
    }

    /// All aliases across all pages, flattened, each carrying its `page_id`.
    pub fn all_aliases(&self) -> Vec<SiteAlias> {
        let mut out = Vec::new();
        for page in &self.pages {
            for alias in page.aliases.values() {
                let mut alias = alias.clone();
                alias.page_id = Some(page.id.clone());
                out.push(alias);
            }
        }
        out
    }
}
