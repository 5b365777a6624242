//! Test configuration helpers: temp folder layouts and pipeline wiring

use installer_ingest::{
    CatalogClient, CliUnpacker, Config, FolderWatcher, IngestPipeline, ProcessedSet,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Watch/dest/temp folders under one temp directory
pub struct Layout {
    pub temp_dir: TempDir,
    pub config: Config,
}

impl Layout {
    /// Fresh layout with the catalog pointed at `catalog_url`
    pub fn new(catalog_url: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path();

        let mut config = Config::default();
        config.folders.watch_dir = root.join("watch");
        config.folders.dest_dir = root.join("dest");
        config.folders.temp_dir = Some(root.join("tmp"));
        config.catalog.base_url = catalog_url.to_string();
        config.catalog.request_timeout = Duration::from_secs(5);
        config.watch.scan_interval = Duration::from_millis(50);
        config.watch.use_fs_events = false;
        config
            .ensure_directories()
            .expect("Failed to create folder layout");

        Self { temp_dir, config }
    }

    pub fn watch_dir(&self) -> &Path {
        &self.config.folders.watch_dir
    }

    pub fn dest_dir(&self) -> &Path {
        &self.config.folders.dest_dir
    }

    pub fn tools_dir(&self) -> PathBuf {
        let dir = self.temp_dir.path().join("tools");
        std::fs::create_dir_all(&dir).expect("Failed to create tools dir");
        dir
    }

    /// Title folder for `name` under the processed root
    pub fn title_folder(&self, name: &str) -> PathBuf {
        self.config.processed_root().join(name)
    }

    /// Drop an installer and its `.bin` parts into the watch folder
    pub fn drop_installer(&self, name: &str, parts: &[&str]) -> PathBuf {
        let installer = self.watch_dir().join(name);
        std::fs::write(&installer, b"MZ installer stub").expect("Failed to write installer");
        for part in parts {
            std::fs::write(self.watch_dir().join(part), b"part data")
                .expect("Failed to write installer part");
        }
        installer
    }
}

/// Build a watcher from `config` the same way the binary does
pub fn build_watcher(config: Config) -> (FolderWatcher, Arc<IngestPipeline>) {
    let unpacker = CliUnpacker::from_config(&config.tools).expect("Failed to find unpacker");
    let resolver = CatalogClient::new(&config.catalog).expect("Failed to build catalog client");
    let processed = ProcessedSet::load(config.processed_set_path());

    let pipeline = Arc::new(IngestPipeline::new(
        Arc::new(config),
        Arc::new(unpacker),
        Arc::new(resolver),
        processed,
    ));
    (FolderWatcher::new(Arc::clone(&pipeline)), pipeline)
}
