use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use loom_core_types::request::{TestRequest, TestStep};
use once_cell::sync::Lazy;
use regex::Regex;

static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap());
static STEP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^(\d+)[.、]\s*(.+)$").unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());

/// Parses a natural-language test scenario per the external `TestRequest`
/// Markdown contract (spec §6): first `#` heading is the title, numbered
/// lines at column 0 become steps, the first URL anywhere seeds `base_url`.
pub fn parse_test_request(path: &Path, contents: &str) -> Result<TestRequest> {
    let title = HEADING_RE
        .captures(contents)
        .map(|c| c[1].trim().to_string())
        .with_context(|| format!("{}: no top-level heading found", path.display()))?;

    let steps: Vec<TestStep> = STEP_RE
        .captures_iter(contents)
        .enumerate()
        .map(|(i, c)| TestStep {
            index: i as u32 + 1,
            text: c[2].trim().to_string(),
        })
        .collect();

    if steps.is_empty() {
        anyhow::bail!("{}: no numbered steps found", path.display());
    }

    let base_url = URL_RE.find(contents).map(|m| m.as_str().trim_end_matches(['.', ')']).to_string());

    Ok(TestRequest {
        title,
        base_url,
        steps,
        source_path: path.to_path_buf(),
    })
}

pub async fn load_test_request(path: &PathBuf) -> Result<TestRequest> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_test_request(path, &contents)
}
