//! ifsweep - instruction-following benchmark sweep CLI
//!
//! ## Commands
//!
//! - `run`: clean the corpus, then benchmark every configured model
//! - `infer`: answer the corpus with one model (launched by `run` per model)
//! - `clean`: drop kill-listed records from the raw corpus
//! - `generate`: build a synthetic corpus from an instruction catalog
//! - `models`: show the configured model list

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ifsweep_core::{
    format_elapsed, CacheReclaimer, DataCleaner, DataLayout, ModelDescriptor, SweepConfig,
};
use ifsweep_llm::{
    ChatConfig, ChatGenerator, DataGenerator, HttpChatBackend, InferenceWorker, JsonCatalog,
    ResilientCaller, DEFAULT_START_KEY,
};
use ifsweep_pipeline::{
    BenchmarkPipeline, EvaluationOutcome, EvaluationStage, InferenceOutcome, InferenceStage,
    PipelineRecord, ProcessRunner, TaskRunner,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, warn, Level};

#[derive(Parser)]
#[command(name = "ifsweep")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Instruction-following benchmark sweep across LLM backends", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full sweep over the configured model list
    Run,

    /// Generate responses for every corpus prompt with one model
    Infer {
        /// Model descriptor, e.g. Qwen/Qwen2.5-7B-Instruct
        #[arg(long = "model-name", alias = "model_name")]
        model_name: String,
    },

    /// Remove kill-listed records from the corpus
    Clean {
        /// Input corpus (default: raw corpus in the data directory)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output corpus (default: clean corpus in the data directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a synthetic corpus by combining catalog instructions
    Generate {
        /// JSON array of {id, description, kwargs}
        #[arg(long)]
        catalog: PathBuf,

        /// Output corpus, appended to (default: raw corpus in the data directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Judge model id (default: first model served by the endpoint)
        #[arg(short, long)]
        model: Option<String>,

        /// Key of the first generated record
        #[arg(long, default_value_t = DEFAULT_START_KEY)]
        start_key: i64,

        /// Seed for reproducible instruction sampling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List configured models and their file-safe names
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    ifsweep_core::init_tracing(cli.json, level);

    let config = SweepConfig::from_env();

    match cli.command {
        Commands::Run => cmd_run(&config).await,
        Commands::Infer { model_name } => {
            if let Err(e) = cmd_infer(&config, &model_name).await {
                error!(model = %model_name, "Inference worker failed: {:?}", e);
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Clean { input, output } => {
            cmd_clean(&config, input.as_deref(), output.as_deref()).map(|_| ())
        }
        Commands::Generate {
            catalog,
            output,
            model,
            start_key,
            seed,
        } => cmd_generate(&config, &catalog, output.as_deref(), model, start_key, seed).await,
        Commands::Models => cmd_models(&config),
    }
}

/// Worker command for the inference stage: the configured override, or this
/// executable's `infer` subcommand.
fn worker_command(config: &SweepConfig) -> Result<Vec<String>> {
    match &config.worker_command {
        Some(cmd) => Ok(cmd.clone()),
        None => {
            let exe = std::env::current_exe().context("Failed to locate ifsweep executable")?;
            Ok(vec![exe.display().to_string(), "infer".to_string()])
        }
    }
}

async fn cmd_run(config: &SweepConfig) -> Result<()> {
    config.validate().context("Invalid sweep configuration")?;
    let layout = config.layout();

    if layout.raw_corpus().is_file() {
        cmd_clean(config, None, None)?;
    } else if !layout.clean_corpus().is_file() {
        warn!(
            path = %layout.clean_corpus().display(),
            "No corpus to clean and no clean corpus present; evaluations will be skipped"
        );
    }

    let runner: Arc<dyn TaskRunner> = Arc::new(ProcessRunner);
    let inference = Arc::new(InferenceStage::new(runner.clone(), worker_command(config)?));
    let evaluation = Arc::new(EvaluationStage::new(
        runner,
        config.scorer_command.clone(),
        layout,
    ));
    let reclaimer = Arc::new(CacheReclaimer::new(&config.model_cache_dir));
    println!("Model cache: {}", reclaimer.cache_dir().display());
    let pipeline = BenchmarkPipeline::new(config.models.clone(), inference, evaluation, reclaimer);

    println!("Running benchmark sweep over {} models", pipeline.models().len());
    println!("Language: {}", config.lang);

    let report = pipeline.run_with_progress(print_model_record).await;

    println!();
    println!("Sweep ID: {}", report.sweep_id);
    println!(
        "Summary: {}/{} models evaluated, {} inferred",
        report.evaluated_count(),
        report.records.len(),
        report.inferred_count()
    );
    println!("Total time: {}", format_elapsed(report.elapsed));
    Ok(())
}

fn print_model_record(record: &PipelineRecord) {
    println!();
    println!("{}", "=".repeat(60));
    println!("{} ({})", record.model, record.safe_name);

    match &record.inference {
        Some(InferenceOutcome::Success(elapsed)) => {
            println!("  ✓ inference ({})", format_elapsed(*elapsed))
        }
        Some(InferenceOutcome::Failure(code)) => {
            println!("  ✗ inference (exit code: {}), evaluation skipped", code)
        }
        None => {}
    }

    let eval_time = record
        .evaluation_elapsed
        .map(format_elapsed)
        .unwrap_or_default();
    match &record.evaluation {
        Some(EvaluationOutcome::Success) => println!("  ✓ evaluation ({})", eval_time),
        Some(EvaluationOutcome::Failure { exit_code, .. }) => {
            println!("  ✗ evaluation (exit code: {}, {})", exit_code, eval_time)
        }
        Some(EvaluationOutcome::Skipped(reason)) => println!("  - evaluation skipped: {}", reason),
        None => {}
    }

    println!("  cache entries removed: {}", record.removed);
    println!("  model time: {}", format_elapsed(record.elapsed));
}

async fn cmd_infer(config: &SweepConfig, model_name: &str) -> Result<()> {
    let chat = ChatConfig::from_env();
    let backend = HttpChatBackend::from_config(&chat).context("Failed to build chat client")?;
    let generator = ChatGenerator::new(backend, chat.worker_params());
    let worker = InferenceWorker::new(config.layout(), Arc::new(generator));

    let report = worker.run(&ModelDescriptor::new(model_name)).await?;
    println!(
        "✓ {} responses from {} written to {}",
        report.responses,
        report.input.display(),
        report.output.display()
    );
    Ok(())
}

fn cmd_clean(
    config: &SweepConfig,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<ifsweep_core::CleanReport> {
    let layout = config.layout();
    let input = input.map(Path::to_path_buf).unwrap_or_else(|| layout.raw_corpus());
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| layout.clean_corpus());

    let report = DataCleaner::new(config.kill_list.clone())
        .clean(&input, &output)
        .with_context(|| format!("Failed to clean {}", input.display()))?;

    println!(
        "Cleaning: total {} | kept {} | removed {} | malformed {}",
        report.total, report.kept, report.removed, report.malformed
    );
    println!("✓ Clean corpus written to {}", output.display());
    Ok(report)
}

async fn cmd_generate(
    config: &SweepConfig,
    catalog: &Path,
    output: Option<&Path>,
    model: Option<String>,
    start_key: i64,
    seed: Option<u64>,
) -> Result<()> {
    let catalog = JsonCatalog::from_path(catalog)
        .with_context(|| format!("Failed to load catalog {}", catalog.display()))?;
    let layout: DataLayout = config.layout();
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| layout.raw_corpus());
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let chat = ChatConfig::from_env();
    let backend = HttpChatBackend::from_config(&chat).context("Failed to build chat client")?;
    let model_id = match model {
        Some(m) => m,
        None => backend
            .first_model_id()
            .await
            .context("Failed to discover a model at the chat endpoint")?,
    };
    println!("Using judge model: {}", model_id);

    let caller = ResilientCaller::new(Arc::new(backend), chat.chat_params());
    let mut generator =
        DataGenerator::new(caller, Arc::new(catalog), &config.lang).with_start_key(start_key);
    if let Some(seed) = seed {
        generator = generator.with_seed(seed);
    }

    let report = generator
        .generate(&model_id, &output)
        .await
        .context("Corpus generation failed")?;

    println!(
        "✓ {} written, {} rejected, {} skipped -> {}",
        report.written,
        report.rejected,
        report.skipped,
        output.display()
    );
    println!("Next key: {}", generator.next_key());
    Ok(())
}

fn cmd_models(config: &SweepConfig) -> Result<()> {
    for (idx, model) in config.models.iter().enumerate() {
        println!("{:>3}. {}  ({})", idx + 1, model, model.safe_name());
    }
    config.validate().context("Invalid sweep configuration")?;
    Ok(())
}
