use loom_core_types::request::TestRequest;
use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::CompileError;

static JSON_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());
static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

/// Pulls the JSON object out of an LLM reply: a fenced ` ```json ` block if
/// present, else the first `{` through the last `}` (spec §4.5).
pub fn extract_json_block(text: &str) -> Result<String, String> {
    if let Some(caps) = JSON_BLOCK_RE.captures(text) {
        return Ok(caps[1].to_string());
    }
    let first = text.find('{');
    let last = text.rfind('}');
    match (first, last) {
        (Some(start), Some(end)) if end > start => Ok(text[start..=end].to_string()),
        _ => Err("LLM output did not contain a JSON object".to_string()),
    }
}

/// `REQ-<UPPER-SLUG>`, falling back to an md5-derived id when the title
/// slugs to nothing (spec §4.5).
pub fn derive_test_id(title: &str) -> String {
    let slug = SLUG_RE.replace_all(title, "-");
    let slug = slug.trim_matches('-');
    if !slug.is_empty() {
        format!("REQ-{}", slug.to_uppercase())
    } else {
        let digest = Md5::digest(title.as_bytes());
        let hex = format!("{digest:x}");
        format!("REQ-{}", hex[..8].to_uppercase())
    }
}

pub fn derive_base_url(request: &TestRequest) -> Result<String, CompileError> {
    request
        .base_url
        .as_deref()
        .map(|url| url.trim_end_matches('/').to_string())
        .ok_or(CompileError::MissingBaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_json_block() {
        let text = "here's your plan:\n```json\n{\"a\": 1}\n```\nthanks";
        assert_eq!(extract_json_block(text).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn falls_back_to_brace_span() {
        let text = "sure, {\"a\": 1} there you go";
        assert_eq!(extract_json_block(text).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn derives_test_id_from_title_slug() {
        assert_eq!(derive_test_id("Login: Happy Path!"), "REQ-LOGIN-HAPPY-PATH");
    }

    #[test]
    fn falls_back_to_md5_when_slug_is_empty() {
        let id = derive_test_id("购物车流程");
        assert!(id.starts_with("REQ-"));
        assert_eq!(id.len(), "REQ-".len() + 8);
    }
}
