use std::path::PathBuf;

use chrono::{Duration, Utc};
use loom_core_types::plan::ActionPlan;
use loom_core_types::profile::SiteProfile;
use loom_core_types::request::TestRequest;
use loom_dsl::{format_errors, validate_action_plan};
use loom_llm::LlmClient;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::CompileError;
use crate::extraction::{derive_base_url, derive_test_id, extract_json_block};
use crate::postprocess::post_process_steps;
use crate::prompt::{initial_messages, repair_message};
use crate::snapping::{fallback_selector_to_profile, sanitize_selector};

/// Options governing one `compile` call (spec §4.5).
#[derive(Clone, Debug)]
pub struct CompileOptions {
    pub max_attempts: usize,
    pub temperature: f32,
    pub plan_name: Option<String>,
    pub case_name: Option<String>,
    pub plan_root: PathBuf,
    pub model: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            temperature: 0.2,
            plan_name: None,
            case_name: None,
            plan_root: PathBuf::from("plans"),
            model: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CompilationResult {
    pub test_id: String,
    pub base_url: String,
    pub plan: ActionPlan,
    pub plan_dir: PathBuf,
    pub case_dir: PathBuf,
}

pub struct PlanCompiler {
    client: Arc<dyn LlmClient>,
}

impl PlanCompiler {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub async fn compile(
        &self,
        request: &TestRequest,
        profile: &SiteProfile,
        opts: &CompileOptions,
    ) -> Result<CompilationResult, CompileError> {
        let mut messages = initial_messages(request, profile);
        let mut payload: Option<Value> = None;
        let mut last_error = String::new();

        for attempt in 1..=opts.max_attempts {
            let completion = self
                .client
                .chat_completion(&messages, opts.model.as_deref(), opts.temperature)
                .await?;

            let parsed = extract_json_block(&completion)
                .map_err(|e| e)
                .and_then(|raw| serde_json::from_str::<Value>(&raw).map_err(|e| e.to_string()));

            match parsed {
                Err(e) => {
                    last_error = e;
                }
                Ok(value) => {
                    let errors = validate_action_plan(&value);
                    if errors.is_empty() {
                        payload = Some(value);
                        break;
                    }
                    last_error = format_errors(&errors);
                }
            }

            info!(attempt, error = %last_error, "compile attempt failed validation");
            messages.push(repair_message(&last_error));
        }

        let mut payload = payload.ok_or(CompileError::Exhausted {
            attempts: opts.max_attempts,
            last_error,
        })?;

        self.ensure_metadata(&mut payload, request);

        let alias_list = profile.all_aliases();
        let mut matched_aliases = Vec::new();
        if let Some(steps) = payload.get_mut("steps").and_then(Value::as_array_mut) {
            let step_types: Vec<String> = steps
                .iter()
                .map(|s| {
                    s.get("t")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_lowercase()
                })
                .collect();

            for (step, step_type) in steps.iter_mut().zip(step_types.iter()) {
                let matched = if let Some(selector) = step.get("selector").and_then(Value::as_str)
                {
                    let sanitized = sanitize_selector(selector);
                    let value = step.get("value").and_then(Value::as_str);
                    let (snapped, alias) = fallback_selector_to_profile(
                        &sanitized,
                        step_type,
                        value,
                        &alias_list,
                    );
                    step["selector"] = Value::String(snapped);
                    alias.cloned()
                } else {
                    None
                };
                matched_aliases.push(matched);
            }

            post_process_steps(steps, &mut matched_aliases, &alias_list);
        }

        self.final_policy_check(&payload)?;

        let test_id = payload["meta"]["testId"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let base_url = payload["meta"]["baseUrl"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let plan: ActionPlan =
            serde_json::from_value(payload.clone()).map_err(|e| CompileError::Io(e.to_string()))?;

        let (plan_dir, case_dir) = self
            .write_plan(&payload, opts, &test_id)
            .await?;

        Ok(CompilationResult {
            test_id,
            base_url,
            plan,
            plan_dir,
            case_dir,
        })
    }

    fn ensure_metadata(&self, payload: &mut Value, request: &TestRequest) {
        if payload.get("meta").is_none() {
            payload["meta"] = serde_json::json!({});
        }
        let meta = payload.get_mut("meta").unwrap();

        if meta.get("testId").and_then(Value::as_str).unwrap_or("").is_empty() {
            meta["testId"] = Value::String(derive_test_id(&request.title));
        }

        match derive_base_url(request) {
            Ok(base_url) => meta["baseUrl"] = Value::String(base_url),
            Err(_) => {
                if let Some(existing) = meta.get("baseUrl").and_then(Value::as_str) {
                    meta["baseUrl"] = Value::String(existing.trim_end_matches('/').to_string());
                } else {
                    warn!("compiled plan has no base URL from the request or the LLM");
                }
            }
        }
    }

    fn final_policy_check(&self, payload: &Value) -> Result<(), CompileError> {
        let errors = validate_action_plan(payload);
        if !errors.is_empty() {
            return Err(CompileError::Exhausted {
                attempts: 0,
                last_error: format_errors(&errors),
            });
        }
        Ok(())
    }

    async fn write_plan(
        &self,
        payload: &Value,
        opts: &CompileOptions,
        test_id: &str,
    ) -> Result<(PathBuf, PathBuf), CompileError> {
        let timestamp = (Utc::now() + Duration::hours(8)).format("%Y%m%dT%H%M%S").to_string();
        let plan_name = opts
            .plan_name
            .clone()
            .unwrap_or_else(|| format!("{timestamp}_llm_plan"));
        let plan_dir = opts.plan_root.join(plan_name);

        let case_name = opts
            .case_name
            .clone()
            .unwrap_or_else(|| format!("case_{}", test_id.to_lowercase()));
        let case_dir = plan_dir.join("cases").join(case_name);

        tokio::fs::create_dir_all(&case_dir)
            .await
            .map_err(|e| CompileError::Io(e.to_string()))?;

        let body = serde_json::to_vec_pretty(payload).map_err(|e| CompileError::Io(e.to_string()))?;
        tokio::fs::write(case_dir.join("action_plan.json"), body)
            .await
            .map_err(|e| CompileError::Io(e.to_string()))?;

        Ok((plan_dir, case_dir))
    }
}
