//! installer-ingest - watch a drop folder and file game installers by title

use clap::Parser;
use installer_ingest::{
    CatalogClient, CliUnpacker, Config, FolderWatcher, IngestPipeline, ProcessedSet, Unpacker,
    run_with_shutdown,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "installer-ingest")]
#[command(version)]
#[command(about = "Unpack, archive and file game installers dropped into a watch folder")]
struct Cli {
    /// Path to the TOML configuration file (defaults are used if it is missing)
    #[arg(short, long, default_value = "config.toml", env = "INSTALLER_INGEST_CONFIG")]
    config: PathBuf,

    /// Scan the watch folder once and exit
    #[arg(long, conflicts_with = "iterations")]
    once: bool,

    /// Run this many scans back to back and exit
    #[arg(long, value_name = "N")]
    iterations: Option<usize>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "installer_ingest=debug"
    } else {
        "installer_ingest=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // Everything up to the loop is process-fatal
    let config = Config::load_or_default(&cli.config)?;
    config.ensure_directories()?;

    let unpacker = CliUnpacker::from_config(&config.tools)?;
    let resolver = CatalogClient::new(&config.catalog)?;
    let processed = ProcessedSet::load(config.processed_set_path());

    info!(
        config = %cli.config.display(),
        watch_dir = %config.folders.watch_dir.display(),
        dest_dir = %config.folders.dest_dir.display(),
        processed_root = %config.processed_root().display(),
        unpacker = unpacker.name(),
        tool = %unpacker.binary_path().display(),
        already_processed = processed.len(),
        "starting installer ingest"
    );

    let pipeline = Arc::new(IngestPipeline::new(
        Arc::new(config),
        Arc::new(unpacker),
        Arc::new(resolver),
        processed,
    ));
    let watcher = FolderWatcher::new(pipeline);

    let iterations = if cli.once { Some(1) } else { cli.iterations };
    match iterations {
        Some(n) => {
            let summary = watcher.run_iterations(n).await;
            info!(
                discovered = summary.discovered,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "finished"
            );
        }
        None => run_with_shutdown(&watcher).await,
    }

    Ok(())
}
