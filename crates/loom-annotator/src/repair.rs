use regex::Regex;
use serde_json::Value;

use crate::errors::AnnotatorError;

fn strip_json_comments(snippet: &str) -> String {
    let block = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    let cleaned = block.replace_all(snippet, "");
    let line = Regex::new(r"^\s*//.*$").unwrap();
    cleaned
        .lines()
        .map(|l| line.replace(l, "").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

fn insert_missing_commas(snippet: &str) -> String {
    let lines: Vec<&str> = snippet.lines().collect();
    let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    for idx in 0..out.len().saturating_sub(1) {
        let following = lines[idx + 1].trim_start();
        if !following.starts_with('"') {
            continue;
        }
        let stripped = out[idx].trim_end().to_string();
        if stripped.is_empty() {
            continue;
        }
        if stripped.ends_with(',') || stripped.ends_with(':') {
            continue;
        }
        if let Some(last) = stripped.chars().last() {
            if "[{(".contains(last) {
                continue;
            }
        }
        out[idx] = format!("{stripped},");
    }
    out.join("\n")
}

fn remove_trailing_commas(snippet: &str) -> String {
    let re = Regex::new(r",(\s*[}\]])").unwrap();
    re.replace_all(snippet, "$1").into_owned()
}

fn append_missing_closing(snippet: &str) -> String {
    let brace_gap = snippet.matches('{').count() as i64 - snippet.matches('}').count() as i64;
    let bracket_gap = snippet.matches('[').count() as i64 - snippet.matches(']').count() as i64;
    let mut out = snippet.to_string();
    if brace_gap > 0 {
        out.push_str(&"}".repeat(brace_gap as usize));
    }
    if bracket_gap > 0 {
        out.push_str(&"]".repeat(bracket_gap as usize));
    }
    out
}

/// Extracts a JSON object from an LLM reply that is not reliably
/// well-formed JSON, applying the repair ladder in order and stopping at the
/// first successful parse (spec §4.3). The object must contain the
/// outermost `{ ... }` span; anything before/after is discarded.
pub fn extract_json(payload: &str) -> Result<Value, AnnotatorError> {
    if let Ok(value) = serde_json::from_str::<Value>(payload) {
        return Ok(value);
    }

    let start = payload.find('{');
    let end = payload.rfind('}');
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if e > s => (s, e),
        _ => {
            return Err(AnnotatorError::Unparseable(format!(
                "LLM reply is not JSON: {}",
                truncate(payload, 2000)
            )))
        }
    };

    let snippet = payload[start..=end].trim().to_string();
    if let Ok(value) = serde_json::from_str::<Value>(&snippet) {
        return Ok(value);
    }

    let repairs: [(&str, fn(&str) -> String); 4] = [
        ("strip comments", strip_json_comments),
        ("insert missing commas", insert_missing_commas),
        ("remove trailing commas", remove_trailing_commas),
        ("append missing closing brackets", append_missing_closing),
    ];

    let mut current = snippet;
    for (_label, repair) in repairs {
        let repaired = repair(&current);
        if repaired != current {
            if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
                return Ok(value);
            }
            current = repaired;
        }
    }

    Err(AnnotatorError::Unparseable(format!(
        "LLM JSON could not be repaired, last attempt: {}",
        truncate(&current, 2000)
    )))
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json_directly() {
        let value = extract_json(r#"{"page": {"id": "p1"}}"#).unwrap();
        assert_eq!(value["page"]["id"], "p1");
    }

    #[test]
    fn trims_surrounding_prose() {
        let value = extract_json("here you go: {\"page\": {\"id\": \"p1\"}} thanks").unwrap();
        assert_eq!(value["page"]["id"], "p1");
    }

    #[test]
    fn strips_line_and_block_comments() {
        let raw = "{\n  // a comment\n  \"page\": {\"id\": \"p1\"} /* trailing */\n}";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["page"]["id"], "p1");
    }

    #[test]
    fn removes_trailing_commas() {
        let value = extract_json("{\"page\": {\"id\": \"p1\",},}").unwrap();
        assert_eq!(value["page"]["id"], "p1");
    }

    #[test]
    fn appends_missing_closing_brackets() {
        let value = extract_json("{\"page\": {\"id\": \"p1\"}").unwrap();
        assert_eq!(value["page"]["id"], "p1");
    }

    #[test]
    fn inserts_missing_commas_between_fields() {
        let raw = "{\n  \"a\": 1\n  \"b\": 2\n}";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"], 2);
    }
}
