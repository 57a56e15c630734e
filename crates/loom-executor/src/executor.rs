use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use loom_browser::{BrowserDriver, BrowserError};
use loom_core_types::plan::{ActionPlan, ActionStep, AssertKind, StepType};
use loom_core_types::run::{RunResult, RunStatus, StepResult, StepStatus};
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

use crate::errors::ExecutorError;
use crate::settings::ExecutorSettings;

const TIMEOUT_MESSAGE: &str = "验证失败：未能找到指定的DOM元素";

fn sanitize_test_id(test_id: &str) -> String {
    test_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn resolve_url(base_url: &str, target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        return target.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), target.trim_start_matches('/'))
}

fn translate_error(err: &BrowserError) -> String {
    match err {
        BrowserError::ElementNotFound(_) => TIMEOUT_MESSAGE.to_string(),
        BrowserError::Navigate { .. } => TIMEOUT_MESSAGE.to_string(),
        other => other.to_string(),
    }
}

/// Drives one `ActionPlan` through a `BrowserDriver`, writing per-step
/// artifacts and a final `run.json` (spec §4.8). The caller owns the
/// driver's lifecycle: launch it, hand it here, and let `run` close it.
pub struct Executor {
    settings: ExecutorSettings,
}

impl Executor {
    pub fn new(settings: ExecutorSettings) -> Self {
        Self { settings }
    }

    /// `<output_root>/<UTCts>_<sanitized_test_id>/`.
    pub fn default_artifacts_dir(&self, test_id: &str) -> PathBuf {
        let ts = Utc::now().format("%Y%m%dT%H%M%SZ");
        self.settings
            .output_root
            .join(format!("{ts}_{}", sanitize_test_id(test_id)))
    }

    pub async fn run(
        &self,
        plan: &ActionPlan,
        driver: Arc<dyn BrowserDriver>,
        artifacts_dir: PathBuf,
    ) -> Result<RunResult, ExecutorError> {
        let steps_dir = artifacts_dir.join("steps");
        tokio::fs::create_dir_all(&steps_dir)
            .await
            .map_err(|e| ExecutorError::Io(e.to_string()))?;

        let mut log = RunnerLog::open(&artifacts_dir.join("runner.log")).await?;
        let started_at = Utc::now();
        let timeout = Duration::from_millis(self.settings.default_timeout_ms);

        let mut step_results = Vec::with_capacity(plan.steps.len());
        let mut run_error: Option<String> = None;

        for (index, step) in plan.steps.iter().enumerate() {
            log.line(&format!("step {index} start: {:?}", step.t)).await;
            let step_started = Utc::now();
            let outcome = self.run_step(&driver, &plan.meta.base_url, step, timeout).await;
            let step_finished = Utc::now();

            let status = if outcome.is_ok() { StepStatus::Passed } else { StepStatus::Failed };
            let error_message = outcome.as_ref().err().cloned();

            let current_url = driver.current_url().await.ok();
            let page_title = driver.title().await.ok();
            let dom_size_bytes = driver
                .evaluate("document.documentElement.outerHTML")
                .await
                .ok()
                .and_then(|v| v.as_str().map(|s| s.len() as u64));

            let should_shoot = self.settings.screenshots.should_capture(status == StepStatus::Failed);
            let screenshot_path = if should_shoot {
                match driver.screenshot().await {
                    Ok(bytes) => {
                        let name = format!("{index:02}.png");
                        let path = steps_dir.join(&name);
                        if let Err(e) = tokio::fs::write(&path, &bytes).await {
                            warn!(error = %e, "failed to write step screenshot");
                            None
                        } else {
                            Some(format!("steps/{name}"))
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "screenshot capture failed");
                        None
                    }
                }
            } else {
                None
            };

            log.line(&format!(
                "step {index} finished status={:?} error={:?}",
                status, error_message
            ))
            .await;

            step_results.push(StepResult {
                index: index as u32,
                action: step.clone(),
                status,
                started_at: step_started,
                finished_at: step_finished,
                error: error_message.clone(),
                screenshot_path,
                current_url,
                page_title,
                dom_size_bytes,
            });

            if status == StepStatus::Failed {
                run_error = error_message;
                break;
            }
        }

        let _ = driver.close().await;

        let finished_at = Utc::now();
        let mut result = RunResult {
            run_id: Uuid::new_v4().to_string(),
            test_id: plan.meta.test_id.clone(),
            status: RunStatus::Passed,
            started_at,
            finished_at,
            steps: step_results,
            artifacts_dir: artifacts_dir.display().to_string(),
            error: run_error,
        };
        result.recompute_status();

        let run_json = serde_json::to_vec_pretty(&result).map_err(|e| ExecutorError::Io(e.to_string()))?;
        write_atomic(&artifacts_dir.join("run.json"), &run_json).await?;

        Ok(result)
    }

    async fn run_step(
        &self,
        driver: &Arc<dyn BrowserDriver>,
        base_url: &str,
        step: &ActionStep,
        timeout: Duration,
    ) -> Result<(), String> {
        match step.t {
            StepType::Goto => {
                let url = step
                    .url
                    .as_deref()
                    .ok_or_else(|| "goto step missing url".to_string())?;
                let resolved = resolve_url(base_url, url);
                driver
                    .navigate(&resolved, timeout)
                    .await
                    .map_err(|e| translate_error(&e))
            }
            StepType::Fill => {
                let selector = step
                    .selector
                    .as_deref()
                    .ok_or_else(|| "fill step missing selector".to_string())?;
                let value = step
                    .value_as_str()
                    .ok_or_else(|| "fill step missing value".to_string())?;
                driver
                    .fill(selector, &value, timeout)
                    .await
                    .map_err(|e| translate_error(&e))
            }
            StepType::Click => {
                let selector = step
                    .selector
                    .as_deref()
                    .ok_or_else(|| "click step missing selector".to_string())?;
                match driver.click(selector, timeout).await {
                    Ok(()) => {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok(())
                    }
                    Err(_first_err) => {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        match driver.click(selector, timeout).await {
                            Ok(()) => {
                                tokio::time::sleep(Duration::from_millis(200)).await;
                                Ok(())
                            }
                            Err(second_err) => Err(translate_error(&second_err)),
                        }
                    }
                }
            }
            StepType::Assert => self.run_assert(driver, step, timeout).await,
        }
    }

    async fn run_assert(
        &self,
        driver: &Arc<dyn BrowserDriver>,
        step: &ActionStep,
        timeout: Duration,
    ) -> Result<(), String> {
        let selector = step
            .selector
            .as_deref()
            .ok_or_else(|| "assert step missing selector".to_string())?;
        let kind = step.kind.ok_or_else(|| "assert step missing kind".to_string())?;

        match kind {
            AssertKind::Visible => driver
                .is_visible(selector, timeout)
                .await
                .map_err(|e| translate_error(&e))
                .and_then(|visible| {
                    if visible {
                        Ok(())
                    } else {
                        Err(TIMEOUT_MESSAGE.to_string())
                    }
                }),
            AssertKind::Invisible => driver
                .is_visible(selector, timeout)
                .await
                .map_err(|e| translate_error(&e))
                .and_then(|visible| {
                    if visible {
                        Err("element is visible, expected invisible".to_string())
                    } else {
                        Ok(())
                    }
                }),
            AssertKind::TextContains => {
                let expected = step
                    .value_as_str()
                    .ok_or_else(|| "assert step missing value".to_string())?;
                let text = driver
                    .text_content(selector, timeout)
                    .await
                    .map_err(|e| translate_error(&e))?;
                if text.contains(&expected) {
                    Ok(())
                } else {
                    Err(format!("expected text to contain {expected:?}, got {text:?}"))
                }
            }
            AssertKind::TextEquals => {
                let expected = step
                    .value_as_str()
                    .ok_or_else(|| "assert step missing value".to_string())?;
                let text = driver
                    .text_content(selector, timeout)
                    .await
                    .map_err(|e| translate_error(&e))?;
                if text.trim() == expected.trim() {
                    Ok(())
                } else {
                    Err(format!("expected text to equal {expected:?}, got {text:?}"))
                }
            }
            AssertKind::TextRegex => {
                let pattern = step
                    .value_as_str()
                    .ok_or_else(|| "assert step missing value".to_string())?;
                let text = driver
                    .text_content(selector, timeout)
                    .await
                    .map_err(|e| translate_error(&e))?;
                let re = regex::Regex::new(&pattern).map_err(|e| e.to_string())?;
                if re.is_match(&text) {
                    Ok(())
                } else {
                    Err(format!("text {text:?} did not match pattern {pattern:?}"))
                }
            }
            AssertKind::CountEquals | AssertKind::CountAtLeast => {
                let expected: i64 = step
                    .value_as_str()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| "count assert missing non-negative integer value".to_string())?;
                if expected > 0 {
                    let _ = driver.is_visible(selector, timeout).await;
                }
                let actual = driver.count(selector).await.map_err(|e| translate_error(&e))? as i64;
                let ok = if kind == AssertKind::CountEquals {
                    actual == expected
                } else {
                    actual >= expected
                };
                if ok {
                    Ok(())
                } else {
                    Err(format!("expected count {expected}, got {actual}"))
                }
            }
        }
    }
}

struct RunnerLog {
    file: tokio::fs::File,
}

impl RunnerLog {
    async fn open(path: &Path) -> Result<Self, ExecutorError> {
        let file = tokio::fs::File::create(path)
            .await
            .map_err(|e| ExecutorError::Io(e.to_string()))?;
        Ok(Self { file })
    }

    async fn line(&mut self, text: &str) {
        let stamped = format!("{} {text}\n", Utc::now().to_rfc3339());
        if let Err(e) = self.file.write_all(stamped.as_bytes()).await {
            warn!(error = %e, "failed to write runner.log line");
        }
    }
}

async fn write_atomic(path: &Path, body: &[u8]) -> Result<(), ExecutorError> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body)
        .await
        .map_err(|e| ExecutorError::Io(e.to_string()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| ExecutorError::Io(e.to_string()))?;
    Ok(())
}
