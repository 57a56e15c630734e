use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use loom_core_types::plan::ActionPlan;
use loom_core_types::run::{BatchResult, RunResult, RunStatus};
use loom_executor::{Executor, ExecutorSettings};
use tracing::{error, info};

use crate::discovery::discover_cases;
use crate::errors::BatchError;
use crate::factory::DriverFactory;
use crate::report::render_report;
use crate::sampling::select_cases;

pub struct BatchRunner {
    settings: ExecutorSettings,
    factory: Arc<dyn DriverFactory>,
}

impl BatchRunner {
    pub fn new(settings: ExecutorSettings, factory: Arc<dyn DriverFactory>) -> Self {
        Self { settings, factory }
    }

    /// Discovers cases under `plan_dir/cases`, optionally samples `count` of
    /// them with `seed`, runs each through a freshly launched browser context,
    /// and writes `batch_summary.json` + `test_report.md` (spec §4.9).
    pub async fn run_batch(
        &self,
        plan_dir: &Path,
        count: usize,
        seed: Option<u64>,
    ) -> Result<BatchResult, BatchError> {
        let batch_id = format!("{}_batch_run", Utc::now().format("%Y%m%dT%H%M%SZ"));
        let batch_dir = self.settings.output_root.join(&batch_id);
        tokio::fs::create_dir_all(&batch_dir)
            .await
            .map_err(|e| BatchError::Io(e.to_string()))?;

        let cases = discover_cases(plan_dir).await?;
        let cases = select_cases(cases, count, seed);
        let total = cases.len();
        info!(total, "running batch");

        let started_at = Utc::now();
        let mut case_results = Vec::with_capacity(total);
        let mut passed = 0;
        let mut failed = 0;
        let mut errored = 0;

        for (i, case) in cases.iter().enumerate() {
            info!(index = i + 1, total, case = %case.name, "running case");

            let outcome = self.run_case(case, &batch_dir).await;
            match outcome {
                Ok(result) => {
                    match result.status {
                        RunStatus::Passed => passed += 1,
                        RunStatus::Failed => failed += 1,
                    }
                    case_results.push(result);
                }
                Err(e) => {
                    error!(case = %case.name, error = %e, "case execution threw");
                    errored += 1;
                }
            }
        }

        let finished_at = Utc::now();

        let result = BatchResult {
            batch_id: batch_id.clone(),
            total,
            passed,
            failed,
            error: errored,
            case_results,
            artifacts_dir: batch_dir.display().to_string(),
            started_at,
            finished_at,
        };

        self.write_summary(&batch_dir, &result).await?;
        self.write_report(&batch_dir, &result).await?;

        Ok(result)
    }

    async fn run_case(
        &self,
        case: &crate::discovery::CaseEntry,
        batch_dir: &Path,
    ) -> Result<RunResult, BatchError> {
        let body = tokio::fs::read(&case.plan_path)
            .await
            .map_err(|e| BatchError::Io(e.to_string()))?;
        let plan: ActionPlan =
            serde_json::from_slice(&body).map_err(|e| BatchError::Io(e.to_string()))?;

        let driver = self
            .factory
            .launch()
            .await
            .map_err(|e| BatchError::Io(e.to_string()))?;

        let case_dir: PathBuf = batch_dir.join(&case.name);
        let executor = Executor::new(self.settings.clone());
        executor
            .run(&plan, driver, case_dir)
            .await
            .map_err(|e| BatchError::Io(e.to_string()))
    }

    async fn write_summary(&self, batch_dir: &Path, result: &BatchResult) -> Result<(), BatchError> {
        let summary = serde_json::to_vec_pretty(result).map_err(|e| BatchError::Io(e.to_string()))?;
        write_atomic(&batch_dir.join("batch_summary.json"), &summary).await
    }

    async fn write_report(&self, batch_dir: &Path, result: &BatchResult) -> Result<(), BatchError> {
        if !self.settings.generate_report {
            return Ok(());
        }
        let markdown = render_report(
            &result.batch_id,
            result.started_at,
            result.finished_at,
            &result.case_results,
        );
        tokio::fs::write(batch_dir.join("test_report.md"), markdown)
            .await
            .map_err(|e| BatchError::Io(e.to_string()))
    }
}

async fn write_atomic(path: &Path, body: &[u8]) -> Result<(), BatchError> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body)
        .await
        .map_err(|e| BatchError::Io(e.to_string()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| BatchError::Io(e.to_string()))?;
    Ok(())
}
