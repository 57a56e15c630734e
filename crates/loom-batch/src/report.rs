use loom_core_types::run::{RunResult, RunStatus, StepStatus};

/// Renders the Markdown report: overall stats, failed-cases table,
/// passed-cases table (grounded on `simple_report_generator.py`).
pub fn render_report(
    batch_id: &str,
    started_at: chrono::DateTime<chrono::Utc>,
    finished_at: chrono::DateTime<chrono::Utc>,
    results: &[RunResult],
) -> String {
    let total = results.len();
    let passed = results.iter().filter(|r| r.status == RunStatus::Passed).count();
    let failed = total - passed;
    let duration = (finished_at - started_at).num_milliseconds() as f64 / 1000.0;

    let mut out = String::new();
    out.push_str("# Test Execution Report\n\n");
    out.push_str(&format!("**Batch ID**: `{batch_id}`  \n"));
    out.push_str(&format!(
        "**Window**: {} - {}  \n",
        started_at.format("%Y-%m-%d %H:%M:%S"),
        finished_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("**Total duration**: {duration:.2}s\n\n"));

    out.push_str("## Summary\n\n");
    out.push_str("| Metric | Value |\n|---|---|\n");
    out.push_str(&format!("| Total cases | {total} |\n"));
    out.push_str(&format!("| Passed | {passed} |\n"));
    out.push_str(&format!("| Failed | {failed} |\n"));
    let success_rate = if total > 0 { passed as f64 / total as f64 * 100.0 } else { 0.0 };
    out.push_str(&format!("| Success rate | {success_rate:.1}% |\n"));
    out.push_str(&format!("| Total duration | {duration:.2}s |\n\n"));

    let failed_results: Vec<&RunResult> = results.iter().filter(|r| r.status != RunStatus::Passed).collect();
    if !failed_results.is_empty() {
        out.push_str("## Failed cases\n\n");
        out.push_str("| Test ID | Artifacts | Passed steps | First failure | Message |\n");
        out.push_str("|---|---|---|---|---|\n");
        for result in &failed_results {
            let passed_steps = result.steps.iter().filter(|s| s.status == StepStatus::Passed).count();
            let first_failure = result.steps.iter().find(|s| s.status == StepStatus::Failed);
            let (step_index, message) = match first_failure {
                Some(step) => (
                    step.index.to_string(),
                    step.error.clone().unwrap_or_else(|| "unknown error".to_string()),
                ),
                None => ("N/A".to_string(), result.error.clone().unwrap_or_default()),
            };
            out.push_str(&format!(
                "| `{}` | `{}` | {}/{} | step {} | {} |\n",
                result.test_id,
                result.artifacts_dir,
                passed_steps,
                result.steps.len(),
                step_index,
                message
            ));
        }
        out.push('\n');
    }

    let passed_results: Vec<&RunResult> = results.iter().filter(|r| r.status == RunStatus::Passed).collect();
    if !passed_results.is_empty() {
        out.push_str("## Passed cases\n\n");
        out.push_str("| Test ID | Steps |\n|---|---|\n");
        for result in &passed_results {
            out.push_str(&format!("| `{}` | {}/{} |\n", result.test_id, result.steps.len(), result.steps.len()));
        }
        out.push('\n');
    }

    out.push_str("---\n");
    out
}
