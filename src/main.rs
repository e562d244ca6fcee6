//! Linkscan main entry point
//!
//! This is the command-line interface for the linkscan link-graph crawler.

use clap::Parser;
use linkscan::config::{load_config_with_hash, validate_scan_name};
use linkscan::crawler::{Orchestrator, Role};
use linkscan::export::export_report_to_file;
use linkscan::storage::{LinkGraphStore, SqliteStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Exit code for configuration failures, distinguishable by supervisors from
/// ordinary crashes.
const CONFIG_EXIT_CODE: i32 = 255;

/// Linkscan: a scoped link-graph crawler
///
/// Linkscan crawls a site within a configured host/path scope and records
/// the deduplicated URL graph (pages, backlinks, redirect chains) for later
/// analysis. One process consumes one queue role; run page and link
/// processes side by side against the same scan.
#[derive(Parser, Debug)]
#[command(name = "linkscan")]
#[command(version = "0.9.0")]
#[command(about = "A scoped link-graph crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Scan name (alphanumerics and underscores)
    #[arg(long)]
    scan: String,

    /// Which queue this process consumes
    #[arg(long, value_enum)]
    role: Role,

    /// Number of concurrent workers in this process
    #[arg(long, default_value_t = 8)]
    processes: usize,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write log output to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Write the backlink report for the scan to this path and exit
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref());

    // A bad config or scan name means nothing useful can run; exit with the
    // dedicated code so supervisors stop retrying.
    if let Err(e) = validate_scan_name(&cli.scan) {
        tracing::error!("Invalid scan name: {}", e);
        std::process::exit(CONFIG_EXIT_CODE);
    }

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(CONFIG_EXIT_CODE);
        }
    };

    if cli.processes < 1 {
        tracing::error!("--processes must be at least 1");
        std::process::exit(CONFIG_EXIT_CODE);
    }

    if let Some(path) = &cli.export {
        handle_export(&config, &cli.scan, path)?;
        return Ok(());
    }

    handle_crawl(&config, &config_hash, &cli.scan, cli.role, cli.processes).await?;
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("linkscan=info,warn"),
            1 => EnvFilter::new("linkscan=debug,info"),
            2 => EnvFilter::new("linkscan=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    match log_file {
        Some(path) => {
            let file = match std::fs::File::create(path) {
                Ok(file) => file,
                Err(e) => {
                    eprintln!("Failed to open log file {}: {}", path.display(), e);
                    std::process::exit(CONFIG_EXIT_CODE);
                }
            };
            builder
                .with_writer(std::sync::Arc::new(file))
                .with_ansi(false)
                .init();
        }
        None => builder.init(),
    }
}

/// Handles the --export mode: writes the backlink report and exits
fn handle_export(
    config: &linkscan::config::Config,
    scan_name: &str,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::new(Path::new(&config.output.database_path))?;

    let scan = store
        .get_scan(scan_name)?
        .ok_or_else(|| linkscan::LinkscanError::ScanNotFound(scan_name.to_string()))?;

    let rows = export_report_to_file(&store, scan.scan_id, path)?;
    tracing::info!("Exported {} backlink rows to {}", rows, path.display());
    println!("Report written to {} ({} rows)", path.display(), rows);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &linkscan::config::Config,
    config_hash: &str,
    scan_name: &str,
    role: Role,
    workers: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Starting scan '{}' as a {} process with {} workers",
        scan_name,
        role,
        workers
    );

    let orchestrator = Orchestrator::new(config, config_hash, scan_name, role, workers)?;

    match orchestrator.run().await {
        Ok(()) => {
            tracing::info!("Worker pool stopped cleanly");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Worker pool failed: {}", e);
            Err(e.into())
        }
    }
}
