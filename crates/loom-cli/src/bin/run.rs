use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use loom_batch::{BatchRunner, DriverFactory};
use loom_cli::chromium_factory::ChromiumFactory;
use loom_cli::runtime::{init_logging, load_local_env_overrides};
use loom_core_types::plan::ActionPlan;
use loom_core_types::run::RunStatus;
use loom_executor::{Executor, ExecutorSettings, ScreenshotPolicy};
use tracing::{error, info};

/// Runs a single compiled case or an entire batch of cases.
#[derive(Parser, Debug)]
#[command(name = "run")]
struct RunArgs {
    #[arg(long)]
    plan_dir: PathBuf,

    /// Name of a single case (under `<plan_dir>/cases/`) to run in isolation.
    #[arg(long)]
    case: Option<String>,

    /// Number of cases to sample for a batch run; 0 means every case.
    #[arg(long, default_value_t = 0)]
    batch: usize,

    #[arg(long)]
    random_seed: Option<u64>,

    #[arg(long, default_value = "results")]
    output: PathBuf,

    #[arg(long, default_value_t = false)]
    headed: bool,

    #[arg(long, default_value = "on-failure")]
    screenshots: String,

    #[arg(long, default_value_t = 10_000)]
    timeout: u64,

    #[arg(long, default_value_t = false)]
    summary: bool,

    #[arg(long, default_value_t = false)]
    no_report: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_local_env_overrides();
    let args = RunArgs::parse();
    init_logging(&args.log_level)?;

    match run(args).await {
        Ok(passed) => {
            if passed {
                info!("run completed successfully");
                Ok(())
            } else {
                error!("run completed with failures");
                std::process::exit(1);
            }
        }
        Err(err) => {
            error!(error = %err, "run failed");
            Err(err)
        }
    }
}

async fn run(args: RunArgs) -> Result<bool> {
    let screenshots = ScreenshotPolicy::from_str(&args.screenshots)
        .with_context(|| format!("invalid --screenshots value: {}", args.screenshots))?;

    let settings = ExecutorSettings {
        headless: !args.headed,
        default_timeout_ms: args.timeout,
        output_root: args.output.clone(),
        screenshots,
        generate_report: !args.no_report,
    };

    let factory = Arc::new(ChromiumFactory { headless: settings.headless });

    if let Some(case_name) = &args.case {
        run_single_case(&args.plan_dir, case_name, settings, factory, args.summary).await
    } else {
        run_batch(&args.plan_dir, args.batch, args.random_seed, settings, factory, args.summary).await
    }
}

async fn run_single_case(
    plan_dir: &PathBuf,
    case_name: &str,
    settings: ExecutorSettings,
    factory: Arc<ChromiumFactory>,
    summary: bool,
) -> Result<bool> {
    let nested = plan_dir.join("cases").join(case_name).join("action_plan.json");
    let flat = plan_dir.join("cases").join(format!("{case_name}.json"));
    let plan_path = if nested.exists() {
        nested
    } else {
        flat
    };

    let body = tokio::fs::read(&plan_path)
        .await
        .with_context(|| format!("failed to read {}", plan_path.display()))?;
    let plan: ActionPlan = serde_json::from_slice(&body).context("failed to parse action plan")?;

    let executor = Executor::new(settings.clone());
    let driver = factory.launch().await?;
    let artifacts_dir = settings.output_root.join(case_name);
    let result = executor.run(&plan, driver, artifacts_dir).await?;

    if summary {
        println!("{} {:?}", result.test_id, result.status);
    }

    Ok(result.status == RunStatus::Passed)
}

async fn run_batch(
    plan_dir: &PathBuf,
    count: usize,
    seed: Option<u64>,
    settings: ExecutorSettings,
    factory: Arc<ChromiumFactory>,
    summary: bool,
) -> Result<bool> {
    let runner = BatchRunner::new(settings, factory);
    let result = runner.run_batch(plan_dir, count, seed).await?;

    if summary {
        println!(
            "{} total={} passed={} failed={} error={}",
            result.batch_id, result.total, result.passed, result.failed, result.error
        );
    }

    Ok(result.failed == 0 && result.error == 0)
}
