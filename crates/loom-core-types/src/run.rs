use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::ActionStep;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepResult {
    pub index: u32,
    pub action: ActionStep,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_size_bytes: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    pub test_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(default)]
    pub steps: Vec<StepResult>,
    pub artifacts_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResult {
    /// `run.status == "passed"` ⇔ every `StepResult.status == "passed"` (§3 invariant).
    pub fn recompute_status(&mut self) {
        let all_passed = self
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Passed);
        self.status = if all_passed && self.error.is_none() {
            RunStatus::Passed
        } else {
            RunStatus::Failed
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ActionStep, StepType};

    fn step(status: StepStatus) -> StepResult {
        StepResult {
            index: 1,
            action: ActionStep {
                t: StepType::Click,
                selector: Some("button".into()),
                url: None,
                value: None,
                kind: None,
            },
            status,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            error: None,
            screenshot_path: None,
            current_url: None,
            page_title: None,
            dom_size_bytes: None,
        }
    }

    #[test]
    fn passes_only_when_every_step_passes() {
        let mut run = RunResult {
            run_id: "r1".into(),
            test_id: "REQ-X".into(),
            status: RunStatus::Passed,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            steps: vec![step(StepStatus::Passed), step(StepStatus::Passed)],
            artifacts_dir: "out".into(),
            error: None,
        };
        run.recompute_status();
        assert_eq!(run.status, RunStatus::Passed);

        run.steps.push(step(StepStatus::Failed));
        run.recompute_status();
        assert_eq!(run.status, RunStatus::Failed);
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub error: usize,
    pub case_results: Vec<RunResult>,
    pub artifacts_dir: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
