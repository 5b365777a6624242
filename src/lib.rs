//! # installer-ingest
//!
//! Watches a drop folder for game installers and files them away.
//!
//! For every new installer the crate reads the catalog identifier embedded in it,
//! looks up title and release year in the remote catalog, unpacks the payload
//! with innoextract, packs the payload into `<title> (W_P) (<year>).zip` in the
//! destination folder and moves the installer (plus its `<stem>-*.bin` parts)
//! into a per-title folder. Each installer is processed at most once, even
//! across restarts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use installer_ingest::{
//!     CatalogClient, CliUnpacker, Config, FolderWatcher, IngestPipeline, ProcessedSet,
//!     run_with_shutdown,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     config.ensure_directories()?;
//!
//!     let unpacker = Arc::new(CliUnpacker::from_config(&config.tools)?);
//!     let resolver = Arc::new(CatalogClient::new(&config.catalog)?);
//!     let processed = ProcessedSet::load(config.processed_set_path());
//!     let pipeline = Arc::new(IngestPipeline::new(
//!         Arc::new(config),
//!         unpacker,
//!         resolver,
//!         processed,
//!     ));
//!
//!     // Subscribe to events
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let watcher = FolderWatcher::new(pipeline);
//!     run_with_shutdown(&watcher).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Payload archiving
pub mod archive;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Watch loop for the drop folder
pub mod folder_watcher;
/// Title and release-year lookup
pub mod metadata;
/// Canonical naming and relocation
pub mod organize;
/// Per-installer ingest pipeline
pub mod pipeline;
/// Durable record of processed installers
pub mod processed_set;
/// Core types and events
pub mod types;
/// Installer unpacking via innoextract
pub mod unpack;
/// Utility functions
pub mod utils;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, dead_code)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use archive::ArchiveSummary;
pub use config::{Config, FileCollisionAction};
pub use error::{ArchiveError, Error, OrganizeError, Result, UnpackError};
pub use folder_watcher::FolderWatcher;
pub use metadata::{CatalogClient, MetadataResolver, NoOpResolver};
pub use organize::{FileOrganizer, Relocation};
pub use pipeline::IngestPipeline;
pub use processed_set::ProcessedSet;
pub use types::{Event, GameMetadata, IngestReport, ScanSummary, Stage};
pub use unpack::{CliUnpacker, Unpacker};

use tokio_util::sync::CancellationToken;

/// Run the watch loop until a termination signal arrives.
///
/// The loop's cancellation token is fired on the signal and this function
/// returns once the loop has stopped.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(watcher: &FolderWatcher) {
    let shutdown = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_signal(shutdown.clone()));

    watcher.run(shutdown).await;
    signal_task.abort();
}

/// Cancel `token` once a termination signal arrives
pub async fn cancel_on_signal(token: CancellationToken) {
    wait_for_signal().await;
    token.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
