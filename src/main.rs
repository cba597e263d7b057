//! ReQon main entry point
//!
//! This is the command-line interface for the ReQon site hygiene scanner.

use anyhow::{Context, Result};
use clap::Parser;
use reqon_core::config::{load_config_with_hash, ScanConfig};
use reqon_core::crawler::{HttpRenderer, NavigationOptions};
use reqon_core::detector::DetectorRegistry;
use reqon_core::graph::{GraphStore, MemoryGraph};
use reqon_core::storage::open_store;
use reqon_core::{EventBus, ScanPipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

/// ReQon: a site hygiene scanner
///
/// ReQon crawls one site breadth-first, runs quality and defect detectors
/// against every page, scores the result, and streams its progress as JSON
/// lines on stdout.
#[derive(Parser, Debug)]
#[command(name = "reqon")]
#[command(version = "1.0.0")]
#[command(about = "A site hygiene scanner", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the detectors that would run, without scanning
    #[arg(long)]
    dry_run: bool,

    /// Job identifier (a random UUID by default)
    #[arg(long, value_name = "ID")]
    job_id: Option<String>,

    /// Write the job's link/issue graph as JSON to this file
    #[arg(long, value_name = "FILE")]
    graph_out: Option<PathBuf>,

    /// Maximum number of graph rows to export
    #[arg(long, value_name = "N", default_value_t = 1000)]
    graph_limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the progress stream
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    let job_id = cli
        .job_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    handle_scan(&cli, config, config_hash, &job_id).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("reqon_core=info,reqon=info,warn"),
            1 => EnvFilter::new("reqon_core=debug,reqon=debug,info"),
            2 => EnvFilter::new("reqon_core=trace,reqon=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &ScanConfig) -> Result<()> {
    let crawl = &config.crawl;
    println!("=== ReQon Dry Run ===\n");

    println!("Crawl:");
    println!("  Target: {}", crawl.target_url);
    println!("  Max pages: {}", crawl.max_pages);
    println!("  Max depth: {}", crawl.max_depth);
    println!("  Concurrent pages: {}", crawl.concurrent_pages);
    println!("  Page timeout: {}ms", crawl.page_timeout_ms);
    println!("  Respect robots.txt: {}", crawl.respect_robots_txt);
    println!("  User agent: {}", crawl.user_agent);
    println!("  Include patterns: {:?}", crawl.include_patterns);
    println!("  Exclude patterns: {:?}", crawl.exclude_patterns);

    let engine = DetectorRegistry::with_builtin().build(&config.detectors)?;
    println!("\nDetectors ({}):", engine.len());
    for name in engine.detector_names() {
        println!("  - {}", name);
    }

    println!("\nScoring:");
    for (severity, weight) in &config.scoring.severity_weights {
        println!("  {}: {}", severity, weight);
    }
    for (category, weight) in &config.scoring.category_weights {
        println!("  {}: x{}", category, weight);
    }

    println!("\nOutput:");
    match &config.output.database_path {
        Some(path) => println!("  Database: {}", path),
        None => println!("  Database: none"),
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main scan operation
async fn handle_scan(
    cli: &Cli,
    config: ScanConfig,
    config_hash: String,
    job_id: &str,
) -> Result<()> {
    let options = NavigationOptions::from(&config.crawl);
    let renderer = Arc::new(HttpRenderer::new(&options)?);
    let graph = Arc::new(MemoryGraph::new());
    let bus = Arc::new(EventBus::new());

    let mut pipeline = ScanPipeline::new(config.clone(), renderer)
        .with_config_hash(config_hash)
        .with_graph(graph.clone())
        .with_bus(bus.clone());

    if let Some(path) = &config.output.database_path {
        let store = open_store(Path::new(path))
            .with_context(|| format!("Failed to open database {}", path))?;
        pipeline = pipeline.with_store(Box::new(store));
    }

    // Subscribe before the run so no message is missed
    let mut progress = bus.subscribe(job_id);
    let printer = tokio::spawn(async move {
        loop {
            match progress.recv().await {
                Ok(message) => match serde_json::to_string(&message) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Unprintable progress message: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Progress output fell behind, {} messages skipped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = pipeline.run(job_id).await;
    drop(pipeline);
    printer.await.context("Progress printer task failed")?;
    let report = result?;

    if let Some(path) = &cli.graph_out {
        let view = graph.get_graph(job_id, cli.graph_limit).await?;
        std::fs::write(path, serde_json::to_string_pretty(&view)?)
            .with_context(|| format!("Failed to write graph to {}", path.display()))?;
        tracing::info!("Graph written to {}", path.display());
    }

    tracing::info!(
        "Job {}: {} pages crawled, {} failed, {} redirected away, {} issues",
        report.job_id,
        report.pages_crawled,
        report.pages_failed,
        report.pages_redirected,
        report.issues_found
    );
    println!("{}", serde_json::to_string(&report.score)?);

    Ok(())
}
