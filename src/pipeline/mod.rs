//! Per-installer ingest pipeline
//!
//! [`IngestPipeline::process`] drives a single installer through every
//! [`Stage`] in order:
//!
//! 1. read the catalog identifier with the [`Unpacker`]
//! 2. resolve title and release year with the [`MetadataResolver`]
//! 3. unpack the payload into a temporary workspace
//! 4. pack the workspace into `<dest_dir>/<folder name>.zip`
//! 5. move the installer and its `.bin` parts into the title folder
//! 6. record the installer in the [`ProcessedSet`]
//!
//! Any failure aborts the run and leaves the installer unmarked, so the next scan
//! of the watch directory picks it up again. The workspace is a [`TempDir`] and is
//! removed on every exit path. Once archiving starts the workspace belongs to the
//! archive task, so dropping `process` mid-archive never deletes files from under
//! the writer.

use crate::archive;
use crate::config::Config;
use crate::error::Result;
use crate::metadata::MetadataResolver;
use crate::organize::{FileOrganizer, canonical_folder_name};
use crate::processed_set::ProcessedSet;
use crate::types::{Event, IngestReport, Stage};
use crate::unpack::Unpacker;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

/// Prefix for per-installer workspace directories
const WORKSPACE_PREFIX: &str = "ingest-";

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Runs installers through the ingest stages
pub struct IngestPipeline {
    config: Arc<Config>,
    unpacker: Arc<dyn Unpacker>,
    resolver: Arc<dyn MetadataResolver>,
    organizer: FileOrganizer,
    processed: Arc<Mutex<ProcessedSet>>,
    event_tx: broadcast::Sender<Event>,
}

impl IngestPipeline {
    /// Create a pipeline from its collaborators
    pub fn new(
        config: Arc<Config>,
        unpacker: Arc<dyn Unpacker>,
        resolver: Arc<dyn MetadataResolver>,
        processed: ProcessedSet,
    ) -> Self {
        let organizer =
            FileOrganizer::new(config.processed_root(), config.organize.file_collision);
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config,
            unpacker,
            resolver,
            organizer,
            processed: Arc::new(Mutex::new(processed)),
            event_tx,
        }
    }

    /// Subscribe to pipeline events
    ///
    /// Events sent while nobody is subscribed are dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Shared configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Shared processed set
    pub fn processed(&self) -> Arc<Mutex<ProcessedSet>> {
        Arc::clone(&self.processed)
    }

    /// Whether `installer` has already been fully processed
    pub async fn is_processed(&self, installer: &Path) -> bool {
        self.processed.lock().await.contains(installer)
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // no receivers is fine
        self.event_tx.send(event).ok();
    }

    /// Process one installer from discovery to the processed set
    ///
    /// On failure an [`Event::Failed`] naming the stage being attempted is
    /// emitted and the error is returned; the installer stays where it was.
    pub async fn process(&self, installer: &Path) -> Result<IngestReport> {
        info!(installer = %installer.display(), "processing installer");
        self.emit_event(Event::InstallerDetected {
            installer: installer.to_path_buf(),
        });

        let mut stage = Stage::Discovered;
        match self.run_stages(installer, &mut stage).await {
            Ok(report) => {
                info!(
                    installer = %installer.display(),
                    archive = %report.archive.display(),
                    folder = %report.folder.display(),
                    "installer processed"
                );
                self.emit_event(Event::Completed {
                    installer: report.installer.clone(),
                    folder: report.folder.clone(),
                    archive: report.archive.clone(),
                });
                Ok(report)
            }
            Err(e) => {
                warn!(
                    installer = %installer.display(),
                    stage = ?stage,
                    error = %e,
                    "installer processing failed, will retry on next scan"
                );
                self.emit_event(Event::Failed {
                    installer: installer.to_path_buf(),
                    stage,
                    code: e.error_code().to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Run every stage; `stage` tracks the one currently being attempted
    async fn run_stages(&self, installer: &Path, stage: &mut Stage) -> Result<IngestReport> {
        *stage = Stage::IdExtracted;
        let catalog_id = self.unpacker.extract_id(installer).await?;
        debug!(
            installer = %installer.display(),
            catalog_id = %catalog_id,
            "catalog identifier extracted"
        );
        self.stage_completed(installer, *stage);

        *stage = Stage::MetadataResolved;
        let metadata = self.resolver.resolve(&catalog_id).await;
        self.emit_event(Event::MetadataResolved {
            installer: installer.to_path_buf(),
            catalog_id: catalog_id.clone(),
            metadata: metadata.clone(),
        });
        self.stage_completed(installer, *stage);

        let folder_name = canonical_folder_name(&metadata, &self.config.organize.platform_tag);
        let archive_path = self
            .config
            .folders
            .dest_dir
            .join(format!("{}.zip", folder_name));

        *stage = Stage::PayloadExtracted;
        let workspace = self.create_workspace()?;
        self.unpacker
            .extract_payload(installer, workspace.path())
            .await?;
        self.stage_completed(installer, *stage);

        // The archive task owns the workspace and removes it once the writer is done
        *stage = Stage::Archived;
        let summary = archive::pack(workspace, &archive_path).await?;
        self.emit_event(Event::Archived {
            installer: installer.to_path_buf(),
            archive: summary.path.clone(),
            files: summary.files,
        });
        self.stage_completed(installer, *stage);

        *stage = Stage::Relocated;
        let relocation = self
            .organizer
            .relocate(installer, &folder_name, &self.config.folders.watch_dir)
            .await?;
        self.stage_completed(installer, *stage);

        *stage = Stage::MarkedDone;
        self.processed.lock().await.mark_done(installer)?;
        self.stage_completed(installer, *stage);

        Ok(IngestReport {
            installer: installer.to_path_buf(),
            catalog_id,
            metadata,
            folder_name,
            archive: summary.path,
            folder: relocation.folder,
            relocated_installer: relocation.installer,
            relocated_siblings: relocation.siblings,
        })
    }

    fn stage_completed(&self, installer: &Path, stage: Stage) {
        debug!(installer = %installer.display(), stage = ?stage, "stage completed");
        self.emit_event(Event::StageCompleted {
            installer: installer.to_path_buf(),
            stage,
        });
    }

    /// Fresh workspace under the configured temp root, or the OS temp dir
    fn create_workspace(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let workspace = match &self.config.folders.temp_dir {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!(workspace = %workspace.path().display(), "created workspace");
        Ok(workspace)
    }
}
