use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use loom_cli::markdown::load_test_request;
use loom_cli::runtime::{init_logging, load_local_env_overrides};
use loom_compiler::{CompileOptions, PlanCompiler};
use loom_core_types::dataset::DatasetFile;
use loom_core_types::profile::SiteProfile;
use loom_llm::{LlmClient, OpenAiClient, OpenAiClientConfig};
use loom_profile_store::SiteProfileStore;
use tracing::{error, info};

/// Compiles a natural-language test request into a schema-valid ActionPlan.
#[derive(Parser, Debug)]
#[command(name = "compile")]
struct CompileArgs {
    /// Path to the TestRequest Markdown file.
    #[arg(long)]
    request: PathBuf,

    /// Path to the Site Profile JSON used for selector snapping.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Optional schema override (accepted for parity; the built-in schema is
    /// always enforced).
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Root directory under which `<plan_name>/cases/<case_name>` is written.
    #[arg(long, default_value = "plans")]
    output_root: PathBuf,

    #[arg(long)]
    plan_name: Option<String>,

    #[arg(long)]
    case_name: Option<String>,

    #[arg(long, default_value_t = 3)]
    attempts: usize,

    #[arg(long, default_value_t = 0.2)]
    temperature: f32,

    #[arg(long, default_value_t = 60)]
    api_timeout: u64,

    /// Dataset JSON to expand the compiled template against.
    #[arg(long)]
    dataset: Option<PathBuf>,

    #[arg(long)]
    dataset_category: Option<String>,

    /// Not implemented: every compile currently drives the LLM repair loop.
    #[arg(long, default_value_t = false)]
    skip_llm: bool,

    #[arg(long, default_value_t = false)]
    output_stats: bool,

    #[arg(long, default_value_t = false)]
    summary: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_local_env_overrides();
    let args = CompileArgs::parse();
    init_logging(&args.log_level)?;

    if args.skip_llm {
        anyhow::bail!("--skip-llm is not supported: the compiler always drives the LLM repair loop");
    }
    if args.schema.is_some() {
        info!("--schema override ignored: the built-in ActionPlan schema is always enforced");
    }

    match run(args).await {
        Ok(()) => {
            info!("compile completed successfully");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "compile failed");
            Err(err)
        }
    }
}

async fn run(args: CompileArgs) -> Result<()> {
    let request = load_test_request(&args.request).await?;

    let profile = match &args.profile {
        Some(path) => SiteProfileStore::new()
            .load_profile(path)
            .await
            .with_context(|| format!("failed to load site profile {}", path.display()))?,
        None => SiteProfile::empty("0".to_string()),
    };

    let mut config = OpenAiClientConfig::from_env()?;
    config.timeout = Duration::from_secs(args.api_timeout);
    let client: Arc<dyn LlmClient> = Arc::new(OpenAiClient::new(config)?);
    let compiler = PlanCompiler::new(client);

    let opts = CompileOptions {
        max_attempts: args.attempts,
        temperature: args.temperature,
        plan_name: args.plan_name.clone(),
        case_name: args.case_name.clone(),
        plan_root: args.output_root.clone(),
        model: None,
    };

    let result = compiler.compile(&request, &profile, &opts).await?;
    info!(
        test_id = %result.test_id,
        case_dir = %result.case_dir.display(),
        "compiled plan"
    );

    if let Some(dataset_path) = &args.dataset {
        expand_dataset(&result, dataset_path, args.dataset_category.as_deref(), args.output_stats).await?;
    }

    if args.summary {
        println!("OK {} -> {}", result.test_id, result.case_dir.display());
    }

    Ok(())
}

async fn expand_dataset(
    result: &loom_compiler::CompilationResult,
    dataset_path: &PathBuf,
    category_key: Option<&str>,
    output_stats: bool,
) -> Result<()> {
    let body = tokio::fs::read(dataset_path)
        .await
        .with_context(|| format!("failed to read dataset {}", dataset_path.display()))?;
    let dataset_file: DatasetFile =
        serde_json::from_slice(&body).context("failed to parse dataset JSON")?;

    let category = match category_key {
        Some(key) => dataset_file
            .data
            .category(key)
            .with_context(|| format!("dataset category not found: {key}"))?,
        None => dataset_file
            .data
            .categories
            .first()
            .context("dataset has no categories")?,
    };

    let template = serde_json::to_value(&result.plan)?;
    let outcome = loom_expander::expand(&template, category, &result.test_id);

    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    loom_expander::write_expansion(&result.case_dir, &template, &outcome, &timestamp).await?;

    info!(
        accepted = outcome.stats.accepted,
        failed = outcome.stats.failed,
        "expanded dataset"
    );

    if output_stats {
        println!("{}", serde_json::to_string_pretty(&outcome.stats)?);
    }

    Ok(())
}
