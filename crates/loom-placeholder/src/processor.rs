use loom_core_types::dataset::Row;
use loom_core_types::placeholder::{PlaceholderMatch, ReplacementError, ReplacementStats};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"s_([a-zA-Z_][a-zA-Z0-9_]*)(?:\*(\d+))?").unwrap());

fn gender_translation(value: &str) -> Option<&'static str> {
    match value {
        "m" => Some("男"),
        "f" => Some("女"),
        "m,f" => Some("通用"),
        _ => None,
    }
}

/// Pure functions over `PlaceholderMatch`/`ReplacementStats` (spec §4.6).
/// Namespaced as a unit struct to mirror the teacher's static-method style.
pub struct PlaceholderProcessor;

impl PlaceholderProcessor {
    pub fn find_all_placeholders(text: &str) -> Vec<PlaceholderMatch> {
        PLACEHOLDER_PATTERN
            .captures_iter(text)
            .map(|caps| {
                let field_name = caps[1].to_string();
                let multiplier = caps.get(2).and_then(|m| m.as_str().parse::<i64>().ok());
                let is_gender_translation = field_name == "gender";
                PlaceholderMatch {
                    placeholder: caps[0].to_string(),
                    field_name,
                    multiplier,
                    is_gender_translation,
                }
            })
            .collect()
    }

    fn apply_expression(base_value: &str, multiplier: i64) -> Result<String, String> {
        let num: f64 = base_value
            .parse()
            .map_err(|_| format!("无法计算表达式: {base_value} * {multiplier}"))?;
        let result = num * multiplier as f64;
        if result == result.trunc() {
            Ok((result as i64).to_string())
        } else {
            Ok(result.to_string())
        }
    }

    fn get_replacement_value(
        placeholder: &PlaceholderMatch,
        row: &Row,
        stats: &mut ReplacementStats,
        data_index: usize,
    ) -> Option<String> {
        let candidates = [
            placeholder.field_name.clone(),
            format!("s_{}", placeholder.field_name),
        ];

        let field_value = candidates.iter().find_map(|field| row.get(field));

        let Some(field_value) = field_value else {
            stats.errors.push(ReplacementError {
                error_type: "missing_field".to_string(),
                placeholder: placeholder.placeholder.clone(),
                field_name: placeholder.field_name.clone(),
                data_index,
                message: format!(
                    "数据项中缺失字段: {} (尝试过: {})",
                    placeholder.field_name,
                    candidates.join(", ")
                ),
            });
            return None;
        };

        let base_value = value_to_string(field_value);

        if placeholder.is_gender_translation {
            return match gender_translation(&base_value) {
                Some(translated) => Some(translated.to_string()),
                None => {
                    stats.errors.push(ReplacementError {
                        error_type: "translation_error".to_string(),
                        placeholder: placeholder.placeholder.clone(),
                        field_name: placeholder.field_name.clone(),
                        data_index,
                        message: format!("未知的性别值: {base_value}"),
                    });
                    None
                }
            };
        }

        if let Some(multiplier) = placeholder.multiplier {
            return match Self::apply_expression(&base_value, multiplier) {
                Ok(result) => Some(result),
                Err(message) => {
                    stats.errors.push(ReplacementError {
                        error_type: "expression_error".to_string(),
                        placeholder: placeholder.placeholder.clone(),
                        field_name: placeholder.field_name.clone(),
                        data_index,
                        message,
                    });
                    None
                }
            };
        }

        Some(base_value)
    }

    /// Replaces every placeholder in `text`, returning the resulting string
    /// and whether every substitution (including the final rescan)
    /// succeeded.
    pub fn replace_placeholders_in_text(
        text: &str,
        row: &Row,
        stats: &mut ReplacementStats,
        data_index: usize,
    ) -> (String, bool) {
        let placeholders = Self::find_all_placeholders(text);
        if placeholders.is_empty() {
            return (text.to_string(), true);
        }

        let mut result = text.to_string();
        let mut all_success = true;

        for placeholder in &placeholders {
            match Self::get_replacement_value(placeholder, row, stats, data_index) {
                Some(replacement) => {
                    result = result.replace(&placeholder.placeholder, &replacement);
                }
                None => all_success = false,
            }
        }

        let remaining = Self::find_all_placeholders(&result);
        if !remaining.is_empty() {
            for p in &remaining {
                stats.errors.push(ReplacementError {
                    error_type: "unreplaced_placeholder".to_string(),
                    placeholder: p.placeholder.clone(),
                    field_name: p.field_name.clone(),
                    data_index,
                    message: format!("替换后仍存在无法处理的占位符: {}", p.placeholder),
                });
            }
            all_success = false;
        }

        (result, all_success)
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Recursively replaces placeholders through a `serde_json::Value` tree
/// (maps, lists, strings recurse; other scalars pass through unchanged).
pub fn replace_placeholders_in_value(
    obj: &Value,
    row: &Row,
    stats: &mut ReplacementStats,
    data_index: usize,
) -> (Value, bool) {
    match obj {
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            let mut all_success = true;
            for (key, value) in map {
                let (processed, success) =
                    replace_placeholders_in_value(value, row, stats, data_index);
                result.insert(key.clone(), processed);
                all_success &= success;
            }
            (Value::Object(result), all_success)
        }
        Value::Array(items) => {
            let mut result = Vec::with_capacity(items.len());
            let mut all_success = true;
            for item in items {
                let (processed, success) =
                    replace_placeholders_in_value(item, row, stats, data_index);
                result.push(processed);
                all_success &= success;
            }
            (Value::Array(result), all_success)
        }
        Value::String(text) => {
            let (replaced, success) =
                PlaceholderProcessor::replace_placeholders_in_text(text, row, stats, data_index);
            (Value::String(replaced), success)
        }
        other => (other.clone(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row_from(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn substitutes_plain_field_value() {
        let row = row_from(&[("name", json!("张三"))]);
        let mut stats = ReplacementStats::default();
        let (out, ok) =
            PlaceholderProcessor::replace_placeholders_in_text("你好 s_name", &row, &mut stats, 0);
        assert!(ok);
        assert_eq!(out, "你好 张三");
    }

    #[test]
    fn falls_back_to_s_prefixed_field_name() {
        let row = row_from(&[("s_price", json!(10))]);
        let mut stats = ReplacementStats::default();
        let (out, ok) =
            PlaceholderProcessor::replace_placeholders_in_text("价格: s_price", &row, &mut stats, 0);
        assert!(ok);
        assert_eq!(out, "价格: 10");
    }

    #[test]
    fn translates_gender() {
        let row = row_from(&[("gender", json!("f"))]);
        let mut stats = ReplacementStats::default();
        let (out, ok) =
            PlaceholderProcessor::replace_placeholders_in_text("性别: s_gender", &row, &mut stats, 0);
        assert!(ok);
        assert_eq!(out, "性别: 女");
    }

    #[test]
    fn applies_integer_multiplier() {
        let row = row_from(&[("qty", json!("3"))]);
        let mut stats = ReplacementStats::default();
        let (out, ok) =
            PlaceholderProcessor::replace_placeholders_in_text("共 s_qty*2 件", &row, &mut stats, 0);
        assert!(ok);
        assert_eq!(out, "共 6 件");
    }

    #[test]
    fn applies_float_multiplier() {
        let row = row_from(&[("price", json!("2.5"))]);
        let mut stats = ReplacementStats::default();
        let (out, ok) =
            PlaceholderProcessor::replace_placeholders_in_text("s_price*3", &row, &mut stats, 0);
        assert!(ok);
        assert_eq!(out, "7.5");
    }

    #[test]
    fn records_missing_field_error() {
        let row = row_from(&[]);
        let mut stats = ReplacementStats::default();
        let (_, ok) =
            PlaceholderProcessor::replace_placeholders_in_text("s_missing", &row, &mut stats, 2);
        assert!(!ok);
        assert_eq!(stats.errors.len(), 1);
        assert_eq!(stats.errors[0].error_type, "missing_field");
        assert_eq!(stats.errors[0].data_index, 2);
    }

    #[test]
    fn unknown_gender_value_is_a_translation_error() {
        let row = row_from(&[("gender", json!("x"))]);
        let mut stats = ReplacementStats::default();
        let (_, ok) =
            PlaceholderProcessor::replace_placeholders_in_text("s_gender", &row, &mut stats, 0);
        assert!(!ok);
        assert_eq!(stats.errors[0].error_type, "translation_error");
    }

    #[test]
    fn recurses_through_nested_value_tree() {
        let row = row_from(&[("name", json!("李四"))]);
        let mut stats = ReplacementStats::default();
        let tree = json!({"steps": [{"value": "s_name"}]});
        let (out, ok) = replace_placeholders_in_value(&tree, &row, &mut stats, 0);
        assert!(ok);
        assert_eq!(out["steps"][0]["value"], "李四");
    }
}
