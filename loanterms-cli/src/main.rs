use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;

// Import from loanterms-core
use loanterms_core::storage::RESULTS_SUFFIX;
use loanterms_core::{
    BatchReport, BlobStore, DocumentAnalyzer, FileBlobStore, ItemOutcome, PipelineConfig, PipelineDriver,
    SchemaExtractor, SchemaReducer,
};

// Import CLI utilities
use loanterms::ConfigLocator;

#[cfg(feature = "azure-backend")]
use loanterms_core::{AzureBlobStore, AzureLayoutAnalyzer, AzureOpenAiExtractor, HttpClient};

#[derive(Parser)]
#[command(name = "loanterms")]
#[command(about = "Reconstruct the layout of scanned loan documents and extract their loan terms")]
struct Args {
    /// Path to custom config file (YAML format)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Debug-level logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze every supported document and persist `<name>_results.json`
    Analyze {
        /// Use a local directory as the container instead of blob storage
        #[arg(long)]
        local_dir: Option<PathBuf>,

        /// Documents processed in parallel (overrides config)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Also write the batch report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Reduce `*_results.json` blobs into structured loan-terms documents
    Reduce {
        /// Use a local directory as the container instead of blob storage
        #[arg(long)]
        local_dir: Option<PathBuf>,

        /// Result blobs to reduce (default: all of them)
        names: Vec<String>,
    },

    /// Print the effective configuration with secrets redacted
    ShowConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config_path = ConfigLocator::resolve(args.config.as_deref());
    let config_path = config_path.as_ref().map(|p| p.to_string_lossy().into_owned());
    let config = PipelineConfig::load(config_path.as_deref())?;

    // show-config writes only YAML to stdout
    if let Some(banner) = config_banner(&args.command, config_path.as_deref()) {
        println!("{}", banner);
    }

    match args.command {
        Command::Analyze {
            local_dir,
            workers,
            report,
        } => run_analyze(config, local_dir.as_deref(), workers, report.as_deref()),
        Command::Reduce { local_dir, names } => run_reduce(config, local_dir.as_deref(), names),
        Command::ShowConfig => {
            print!("{}", serde_yaml::to_string(&config.redacted())?);
            Ok(())
        }
    }
}

fn config_banner(command: &Command, config_path: Option<&str>) -> Option<String> {
    if matches!(command, Command::ShowConfig) {
        return None;
    }
    Some(match config_path {
        Some(path) => format!("📋 Loaded config from: {}", path),
        None => "📋 Using default config".to_string(),
    })
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_analyze(
    config: PipelineConfig,
    local_dir: Option<&Path>,
    workers: Option<usize>,
    report_path: Option<&Path>,
) -> Result<()> {
    println!("🦀 Loan document analysis");

    // Every required setting is checked before the first item is touched
    let store = open_store(&config, local_dir)?;
    let analyzer = create_analyzer(&config)?;
    let workers = workers.unwrap_or(config.workers);

    let driver = PipelineDriver::new(store, analyzer)
        .with_read_url_ttl(config.storage.read_url_ttl())
        .with_workers(workers);

    let report = driver.run_container()?;
    print_report(&report);

    if let Some(path) = report_path {
        std::fs::write(path, serde_json::to_vec_pretty(&report)?)
            .with_context(|| format!("writing report to {}", path.display()))?;
        println!("💾 Report saved to: {}", path.display());
    }

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_reduce(config: PipelineConfig, local_dir: Option<&Path>, names: Vec<String>) -> Result<()> {
    println!("🦀 Loan terms extraction");

    let store = open_store(&config, local_dir)?;
    let reducer = SchemaReducer::new(create_extractor(&config)?);

    let names = if names.is_empty() {
        store
            .list()?
            .into_iter()
            .filter(|name| name.ends_with(RESULTS_SUFFIX))
            .collect()
    } else {
        names
    };

    if names.is_empty() {
        println!("⚠️  No *{} blobs to reduce", RESULTS_SUFFIX);
        return Ok(());
    }

    let mut failures = 0;
    for name in &names {
        match reducer.reduce_blob(store.as_ref(), name) {
            Ok(written) => println!("  ✅ {} → {}", name, written),
            Err(e) => {
                failures += 1;
                tracing::warn!(item = %name, kind = ?e.kind(), "reduction failed: {e}");
                println!("  ❌ {}: {}", name, e);
            }
        }
    }

    println!("\n📊 Reduced {} of {} documents", names.len() - failures, names.len());
    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!("\n📊 Batch {}:", report.run_id);
    for item in &report.items {
        match &item.outcome {
            ItemOutcome::Persisted { results_name } => {
                println!("  ✅ {} → {} ({}ms)", item.name, results_name, item.elapsed_ms)
            }
            ItemOutcome::Skipped { reason } => println!("  ⏭️  {}: {}", item.name, reason),
            ItemOutcome::Failed { kind, message } => {
                println!("  ❌ {} [{:?}]: {}", item.name, kind, message)
            }
        }
    }
    let elapsed = report.finished_at - report.started_at;
    println!(
        "   - Persisted: {}, skipped: {}, failed: {} in {:.1}s",
        report.persisted(),
        report.skipped(),
        report.failed(),
        elapsed.num_milliseconds() as f64 / 1000.0
    );
}

fn open_store(config: &PipelineConfig, local_dir: Option<&Path>) -> Result<Box<dyn BlobStore>> {
    match local_dir {
        Some(dir) => {
            println!("📁 Using local directory: {}", dir.display());
            Ok(Box::new(FileBlobStore::new(dir)?))
        }
        None => open_remote_store(config),
    }
}

/// Blob container named in config, signed with the account key
#[cfg(feature = "azure-backend")]
fn open_remote_store(config: &PipelineConfig) -> Result<Box<dyn BlobStore>> {
    let account = config.validate_storage()?;
    println!(
        "☁️  Using container '{}' in account '{}'",
        config.storage.container, account.account_name
    );
    let store = AzureBlobStore::new(&account, &config.storage.container, http_client(config))?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "azure-backend"))]
fn open_remote_store(_config: &PipelineConfig) -> Result<Box<dyn BlobStore>> {
    anyhow::bail!("Built without azure-backend: pass --local-dir to use a local directory")
}

#[cfg(feature = "azure-backend")]
fn create_analyzer(config: &PipelineConfig) -> Result<Box<dyn DocumentAnalyzer>> {
    config.validate_analysis()?;
    Ok(Box::new(AzureLayoutAnalyzer::new(&config.analysis, http_client(config))?))
}

#[cfg(not(feature = "azure-backend"))]
fn create_analyzer(_config: &PipelineConfig) -> Result<Box<dyn DocumentAnalyzer>> {
    anyhow::bail!("No document analyzer available - rebuild with --features azure-backend")
}

#[cfg(feature = "azure-backend")]
fn create_extractor(config: &PipelineConfig) -> Result<Box<dyn SchemaExtractor>> {
    config.validate_extractor()?;
    Ok(Box::new(AzureOpenAiExtractor::new(&config.extractor, http_client(config))?))
}

#[cfg(not(feature = "azure-backend"))]
fn create_extractor(_config: &PipelineConfig) -> Result<Box<dyn SchemaExtractor>> {
    anyhow::bail!("No schema extractor available - rebuild with --features azure-backend")
}

#[cfg(feature = "azure-backend")]
fn http_client(config: &PipelineConfig) -> HttpClient {
    HttpClient::new(&config.http, config.retry.clone())
}
