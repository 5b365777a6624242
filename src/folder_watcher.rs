//! Watch loop for the installer drop folder
//!
//! The watcher polls the watch directory on a fixed interval, drops installers
//! already recorded in the processed set and hands each remaining candidate to
//! the [`IngestPipeline`]. Failures are logged and counted; the installer stays
//! in place and is retried on the next scan.
//!
//! When `watch.use_fs_events` is enabled a non-recursive `notify` watcher wakes
//! the loop early on file creation or modification. Polling stays authoritative:
//! events only shorten the wait until the next scan.
//!
//! # Example
//!
//! ```no_run
//! use installer_ingest::config::Config;
//! use installer_ingest::folder_watcher::FolderWatcher;
//! use installer_ingest::metadata::NoOpResolver;
//! use installer_ingest::pipeline::IngestPipeline;
//! use installer_ingest::processed_set::ProcessedSet;
//! use installer_ingest::unpack::CliUnpacker;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(Config::default());
//! let unpacker = Arc::new(CliUnpacker::from_config(&config.tools)?);
//! let processed = ProcessedSet::load(config.processed_set_path());
//! let pipeline = Arc::new(IngestPipeline::new(
//!     config,
//!     unpacker,
//!     Arc::new(NoOpResolver),
//!     processed,
//! ));
//!
//! let watcher = FolderWatcher::new(pipeline);
//! let shutdown = CancellationToken::new();
//! watcher.run(shutdown).await;
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::IngestPipeline;
use crate::types::ScanSummary;
use crate::utils::{has_extension, modified_age};
use futures::stream::{self, StreamExt};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Polls the watch directory and feeds new installers to the pipeline
pub struct FolderWatcher {
    pipeline: Arc<IngestPipeline>,
    config: Arc<Config>,
}

/// What woke the loop
enum Wake {
    Tick,
    FsEvent,
    FsClosed,
    Shutdown,
}

impl FolderWatcher {
    /// Create a watcher driving `pipeline`
    pub fn new(pipeline: Arc<IngestPipeline>) -> Self {
        let config = pipeline.config();
        Self { pipeline, config }
    }

    /// List unprocessed installers in the watch directory
    ///
    /// Non-recursive. Only regular files with the configured extension (compared
    /// case-insensitively) are returned, minus anything in the processed set and
    /// anything modified more recently than `watch.min_file_age`. Sorted by path.
    ///
    /// # Errors
    /// Returns [`Error::FolderWatch`] if the watch directory cannot be read.
    pub async fn scan(&self) -> Result<Vec<PathBuf>> {
        let watch_dir = &self.config.folders.watch_dir;
        let extension = self.config.installer_extension();
        let min_age = self.config.watch.min_file_age;

        let mut entries = tokio::fs::read_dir(watch_dir).await.map_err(|e| {
            Error::FolderWatch(format!(
                "Failed to read watch folder {}: {}",
                watch_dir.display(),
                e
            ))
        })?;

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            Error::FolderWatch(format!(
                "Failed to read watch folder {}: {}",
                watch_dir.display(),
                e
            ))
        })? {
            let path = entry.path();
            if !has_extension(&path, extension) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            if !min_age.is_zero() && !modified_age(&metadata).is_some_and(|age| age >= min_age) {
                debug!(path = %path.display(), "installer still settling, deferring");
                continue;
            }

            found.push(path);
        }

        let processed = self.pipeline.processed();
        let processed = processed.lock().await;
        found.retain(|path| !processed.contains(path));
        drop(processed);

        found.sort();
        Ok(found)
    }

    /// Scan once and process every candidate
    ///
    /// Candidates run one at a time unless `watch.max_concurrent_installers` is
    /// above one. Never fails: scan errors and per-installer errors are logged.
    pub async fn run_once(&self) -> ScanSummary {
        let candidates = match self.scan().await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(error = %e, "scan of watch folder failed");
                return ScanSummary::default();
            }
        };

        let mut summary = ScanSummary {
            discovered: candidates.len(),
            ..ScanSummary::default()
        };
        if candidates.is_empty() {
            debug!("no new installers");
            return summary;
        }
        info!(count = candidates.len(), "found new installers");

        let concurrency = self.config.watch.max_concurrent_installers.max(1);
        let results: Vec<bool> = stream::iter(candidates)
            .map(|installer| async move {
                match self.pipeline.process(&installer).await {
                    Ok(_) => true,
                    Err(e) => {
                        if !e.is_installer_scoped() {
                            error!(
                                installer = %installer.display(),
                                error = %e,
                                "unexpected process-level error"
                            );
                        }
                        false
                    }
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        summary.succeeded = results.iter().filter(|ok| **ok).count();
        summary.failed = results.len() - summary.succeeded;
        summary
    }

    /// Run exactly `iterations` scans back to back
    ///
    /// Returns the summed counters of all scans.
    pub async fn run_iterations(&self, iterations: usize) -> ScanSummary {
        let mut total = ScanSummary::default();
        for _ in 0..iterations {
            let summary = self.run_once().await;
            total.discovered += summary.discovered;
            total.succeeded += summary.succeeded;
            total.failed += summary.failed;
        }
        total
    }

    /// Scan every `watch.scan_interval` until `shutdown` is cancelled
    ///
    /// A scan in progress when the token fires is abandoned; its installer is
    /// left unmarked and picked up again on the next start.
    pub async fn run(&self, shutdown: CancellationToken) {
        let watch_dir = self.config.folders.watch_dir.clone();
        let mut nudge = if self.config.watch.use_fs_events {
            match FsNudge::start(&watch_dir) {
                Ok(nudge) => Some(nudge),
                Err(e) => {
                    warn!(error = %e, "filesystem events unavailable, polling only");
                    None
                }
            }
        } else {
            None
        };

        let mut interval = tokio::time::interval(self.config.watch.scan_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            watch_dir = %watch_dir.display(),
            interval = ?self.config.watch.scan_interval,
            fs_events = nudge.is_some(),
            "watch loop started"
        );

        loop {
            let wake = tokio::select! {
                _ = shutdown.cancelled() => Wake::Shutdown,
                _ = interval.tick() => Wake::Tick,
                changed = async {
                    match nudge.as_mut() {
                        Some(n) => n.changed().await,
                        None => std::future::pending().await,
                    }
                } => {
                    if changed { Wake::FsEvent } else { Wake::FsClosed }
                }
            };

            match wake {
                Wake::Shutdown => break,
                Wake::FsClosed => {
                    warn!("filesystem event channel closed, polling only");
                    nudge = None;
                    continue;
                }
                Wake::FsEvent => debug!("filesystem change, scanning early"),
                Wake::Tick => {}
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested during scan");
                    break;
                }
                summary = self.run_once() => {
                    if summary.discovered > 0 {
                        info!(
                            discovered = summary.discovered,
                            succeeded = summary.succeeded,
                            failed = summary.failed,
                            "scan finished"
                        );
                    }
                }
            }
        }

        info!("watch loop stopped");
    }
}

/// Wakes the loop on filesystem changes in the watch directory
struct FsNudge {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
}

impl FsNudge {
    fn start(dir: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                // receiver gone means the loop has stopped
                tx.send(res).ok();
            },
            NotifyConfig::default(),
        )
        .map_err(|e| Error::FolderWatch(e.to_string()))?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::FolderWatch(format!("Failed to watch folder: {}", e)))?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Wait for a create/modify event; false once the channel is closed
    ///
    /// Events already queued behind the first are drained so a burst of writes
    /// causes a single early scan.
    async fn changed(&mut self) -> bool {
        loop {
            match self.rx.recv().await {
                Some(Ok(event)) => {
                    if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        while self.rx.try_recv().is_ok() {}
                        return true;
                    }
                }
                Some(Err(e)) => warn!(error = %e, "filesystem watcher error"),
                None => return false,
            }
        }
    }
}
