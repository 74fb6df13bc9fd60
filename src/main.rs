//! crawl-frontier main entry point
//!
//! This is the command-line interface for the crawl frontier.

use anyhow::{bail, Context};
use clap::Parser;
use crawl_frontier::config::{generate_run_id, load_config, sanitize_run_id, Config};
use crawl_frontier::crawler::{FetchBackend, Frontier, HtmlLinkExtractor, HttpFetcher};
use crawl_frontier::output::{load_statistics, print_runs, print_statistics};
use crawl_frontier::storage::{open_store, CrawlStore, SqliteStore};
use crawl_frontier::url::normalize_url_with;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// crawl-frontier: a polite, resumable web crawler
///
/// Crawls from a set of seed URLs while respecting robots.txt and per-domain
/// rate limits. Progress lives in SQLite; rerunning with the same run id
/// resumes where the previous invocation stopped.
#[derive(Parser, Debug)]
#[command(name = "crawl-frontier")]
#[command(version)]
#[command(about = "A polite, resumable web crawl frontier", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Run identifier; reuse one to resume that run
    #[arg(long, value_name = "ID")]
    run_id: Option<String>,

    /// Seed URL (repeatable); overrides the seeds in the config file
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "list_runs", "retry_errors"])]
    dry_run: bool,

    /// Show statistics for the run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "list_runs", "retry_errors"])]
    stats: bool,

    /// List recorded runs and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "retry_errors"])]
    list_runs: bool,

    /// Move errored entries back to pending, then crawl
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "list_runs"])]
    retry_errors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    if cli.dry_run {
        return handle_dry_run(&cli, &config);
    }

    let db_path = Path::new(&config.output.database_path);
    let store = Arc::new(
        open_store(db_path)
            .with_context(|| format!("failed to open database {}", db_path.display()))?,
    );

    if cli.list_runs {
        print_runs(&store.list_runs()?);
        return Ok(());
    }

    if cli.stats {
        return handle_stats(&cli, &config, store.as_ref());
    }

    handle_crawl(&cli, config, store).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_frontier=info,warn"),
            1 => EnvFilter::new("crawl_frontier=debug,info"),
            2 => EnvFilter::new("crawl_frontier=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Run id from the command line, then the config file, else a fresh one
fn resolve_run_id(cli: &Cli, config: &Config) -> String {
    match cli.run_id.as_deref().or(config.run.run_id.as_deref()) {
        Some(raw) => sanitize_run_id(raw),
        None => generate_run_id(),
    }
}

fn resolve_seeds(cli: &Cli, config: &Config) -> Vec<String> {
    if cli.seeds.is_empty() {
        config.run.seeds.clone()
    } else {
        cli.seeds.clone()
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let crawler = &config.crawler;

    println!("=== crawl-frontier Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Crawl type: {}", crawler.crawl_type);
    println!("  Max pages: {}", crawler.max_pages);
    println!("  Batch size: {}", crawler.batch_size);
    println!("  Max parallel fetches: {}", crawler.max_parallel);
    println!("  Max retries: {}", crawler.max_retries);
    println!("  Fetch timeout: {}s", crawler.fetch_timeout);
    println!("  Respect robots.txt: {}", crawler.respect_robots);
    println!("  Respect rate limits: {}", crawler.respect_rate_limits);
    println!("  Default crawl delay: {}ms", crawler.default_crawl_delay);
    println!("  User agent: {}", crawler.user_agent);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nRun:");
    println!("  Run id: {}", resolve_run_id(cli, config));

    let seeds = resolve_seeds(cli, config);
    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        let normalized = normalize_url_with(seed, &crawler.tracking_params)
            .with_context(|| format!("invalid seed {}", seed))?;
        println!("  - {}", normalized);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode; defaults to the most recent run
fn handle_stats(cli: &Cli, config: &Config, store: &SqliteStore) -> anyhow::Result<()> {
    let run_id = match cli.run_id.as_deref().or(config.run.run_id.as_deref()) {
        Some(raw) => sanitize_run_id(raw),
        None => match store.list_runs()?.into_iter().next() {
            Some(run) => run.run_id,
            None => {
                println!("No runs recorded");
                return Ok(());
            }
        },
    };

    println!("Database: {}\n", config.output.database_path);
    let stats = load_statistics(store, &run_id)?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli, config: Config, store: Arc<SqliteStore>) -> anyhow::Result<()> {
    let run_id = resolve_run_id(cli, &config);
    let seeds = resolve_seeds(cli, &config);

    if seeds.is_empty() && store.get_run(&run_id)?.is_none() {
        bail!("no seeds given for new run {}", run_id);
    }

    if cli.retry_errors {
        let requeued = store.requeue_errors(&run_id)?;
        tracing::info!("Requeued {} errored entries", requeued);
    }

    let fetcher = FetchBackend::Http(
        HttpFetcher::new(&config.crawler).context("failed to build HTTP client")?,
    );
    let cancel = CancellationToken::new();
    let frontier = Frontier::new(store, Arc::new(fetcher), Arc::new(HtmlLinkExtractor::new()))
        .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight fetches");
            cancel.cancel();
        }
    });

    match frontier.start_run(&run_id, &seeds, &config.crawler).await {
        Ok(report) => {
            println!("\nRun {} stopped: {}", report.run_id, report.stop_reason);
            println!(
                "  fetched {}, skipped {}, failed attempts {}, discovered {}",
                report.fetched, report.skipped, report.failed, report.discovered
            );
            println!(
                "  pending {}, in progress {}, complete {}, error {}",
                report.stats.pending,
                report.stats.in_progress,
                report.stats.complete,
                report.stats.error
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
