use std::path::{Path, PathBuf};

use loom_core_types::dataset::DatasetCategory;
use loom_core_types::placeholder::{ReplacementError, ReplacementStats};
use loom_placeholder::replace_placeholders_in_value;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::errors::ExpanderError;

/// Per-call totals for a single `Expand` invocation (spec §4.7).
#[derive(Clone, Debug, Default, Serialize)]
pub struct ExpansionStats {
    pub total_rows: usize,
    pub accepted: usize,
    pub failed: usize,
    pub errors_by_type: std::collections::BTreeMap<String, usize>,
}

#[derive(Clone, Debug)]
pub struct ExpansionOutcome {
    pub cases: Vec<Value>,
    pub stats: ExpansionStats,
    pub errors: Vec<ReplacementError>,
}

/// Substitutes `template_plan`'s placeholders against every row of
/// `category`, accepting a case only if every substitution in it succeeded.
pub fn expand(
    template_plan: &Value,
    category: &DatasetCategory,
    test_id_base: &str,
) -> ExpansionOutcome {
    let mut cases = Vec::new();
    let mut all_errors = Vec::new();
    let mut stats = ExpansionStats {
        total_rows: category.items.len(),
        ..Default::default()
    };

    for (index, row) in category.items.iter().enumerate() {
        let mut row_stats = ReplacementStats::default();
        let (mut case, ok) =
            replace_placeholders_in_value(template_plan, row, &mut row_stats, index);

        if ok {
            if let Some(meta) = case.get_mut("meta") {
                meta["testId"] = Value::String(format!(
                    "{test_id_base}_{:03}",
                    index + 1
                ));
                meta["dataSource"] = Value::String(format!("dataset#{index}"));
            }
            cases.push(case);
            stats.accepted += 1;
        } else {
            stats.failed += 1;
        }

        for (error_type, count) in row_stats.counts_by_type() {
            *stats.errors_by_type.entry(error_type).or_insert(0) += count;
        }
        all_errors.extend(row_stats.errors);
    }

    ExpansionOutcome {
        cases,
        stats,
        errors: all_errors,
    }
}

/// Writes the template, `stats.json`, `errors.json` (if non-empty), and one
/// `case_NNN_<ts>.json` per accepted case under `case_dir`.
pub async fn write_expansion(
    case_dir: &Path,
    template_plan: &Value,
    outcome: &ExpansionOutcome,
    timestamp: &str,
) -> Result<Vec<PathBuf>, ExpanderError> {
    tokio::fs::create_dir_all(case_dir)
        .await
        .map_err(|e| ExpanderError::Io(e.to_string()))?;

    write_json(&case_dir.join("template.json"), template_plan).await?;
    write_json(
        &case_dir.join("stats.json"),
        &serde_json::to_value(&outcome.stats).map_err(|e| ExpanderError::Io(e.to_string()))?,
    )
    .await?;

    if !outcome.errors.is_empty() {
        let errors_value =
            serde_json::to_value(&outcome.errors).map_err(|e| ExpanderError::Io(e.to_string()))?;
        write_json(&case_dir.join("errors.json"), &errors_value).await?;
    } else {
        warn!("no errors.json written: every row expanded cleanly");
    }

    let mut written = Vec::with_capacity(outcome.cases.len());
    for (index, case) in outcome.cases.iter().enumerate() {
        let path = case_dir.join(format!("case_{:03}_{timestamp}.json", index + 1));
        write_json(&path, case).await?;
        written.push(path);
    }

    Ok(written)
}

async fn write_json(path: &Path, value: &Value) -> Result<(), ExpanderError> {
    let body = serde_json::to_vec_pretty(value).map_err(|e| ExpanderError::Io(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &body)
        .await
        .map_err(|e| ExpanderError::Io(e.to_string()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| ExpanderError::Io(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core_types::dataset::Row;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn accepts_rows_that_fully_substitute() {
        let template = json!({
            "meta": {"testId": "REQ-BASE", "baseUrl": "https://example.com"},
            "steps": [{"t": "fill", "selector": "#name", "value": "s_name"}]
        });
        let category = DatasetCategory {
            category_key: "users".to_string(),
            items: vec![row(&[("name", json!("张三"))]), row(&[("name", json!("李四"))])],
        };

        let outcome = expand(&template, &category, "REQ-BASE");
        assert_eq!(outcome.stats.accepted, 2);
        assert_eq!(outcome.stats.failed, 0);
        assert_eq!(outcome.cases[0]["meta"]["testId"], "REQ-BASE_001");
        assert_eq!(outcome.cases[1]["meta"]["dataSource"], "dataset#1");
    }

    #[test]
    fn discards_rows_with_unresolved_placeholders() {
        let template = json!({
            "meta": {"testId": "REQ-BASE"},
            "steps": [{"t": "fill", "selector": "#name", "value": "s_missing"}]
        });
        let category = DatasetCategory {
            category_key: "users".to_string(),
            items: vec![row(&[])],
        };

        let outcome = expand(&template, &category, "REQ-BASE");
        assert_eq!(outcome.stats.accepted, 0);
        assert_eq!(outcome.stats.failed, 1);
        assert_eq!(outcome.errors[0].error_type, "missing_field");
    }
}
