//! Configuration types for installer-ingest

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Directory layout (watch folder, archive destination, processed installers)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FolderConfig {
    /// Directory polled for new installers (default: "./watch")
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,

    /// Directory receiving `<title>.zip` archives (default: "./dest")
    #[serde(default = "default_dest_dir")]
    pub dest_dir: PathBuf,

    /// Root for per-title folders holding the original installers (default: "processed")
    ///
    /// A relative path is resolved against `watch_dir`.
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,

    /// Where temporary extraction workspaces are created (None = OS temp dir)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// File name of the processed-installer record inside `watch_dir`
    #[serde(default = "default_processed_set_file")]
    pub processed_set_file: String,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            watch_dir: default_watch_dir(),
            dest_dir: default_dest_dir(),
            processed_dir: default_processed_dir(),
            temp_dir: None,
            processed_set_file: default_processed_set_file(),
        }
    }
}

/// External unpacking tool settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the innoextract executable (auto-detected if None)
    #[serde(default)]
    pub unpacker_path: Option<PathBuf>,

    /// Whether to search PATH for the unpacker if no explicit or bundled binary exists (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Upper bound on a single unpacker invocation (None = no limit)
    ///
    /// An invocation that runs past this limit is killed and treated as a failed
    /// extraction.
    #[serde(default, with = "optional_duration_serde")]
    pub timeout: Option<Duration>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            unpacker_path: None,
            search_path: true,
            timeout: None,
        }
    }
}

/// Remote catalog used to look up title and release year
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog API (default: "https://api.gog.com")
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Watch loop behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Delay between scans of the watch directory (default: 5 seconds)
    #[serde(default = "default_scan_interval", with = "duration_serde")]
    pub scan_interval: Duration,

    /// Extension identifying installer files, compared case-insensitively (default: "exe")
    #[serde(default = "default_installer_extension")]
    pub installer_extension: String,

    /// Ignore installers modified more recently than this (default: 0 = disabled)
    ///
    /// Guards against picking up a file that is still being copied in.
    #[serde(default, with = "duration_serde")]
    pub min_file_age: Duration,

    /// Installers processed concurrently within one scan (default: 1)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_installers: usize,

    /// Wake the loop early on filesystem events instead of waiting for the next tick (default: true)
    #[serde(default = "default_true")]
    pub use_fs_events: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            scan_interval: default_scan_interval(),
            installer_extension: default_installer_extension(),
            min_file_age: Duration::ZERO,
            max_concurrent_installers: default_max_concurrent(),
            use_fs_events: true,
        }
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename (default)
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Leave the existing file alone and fail the move
    Skip,
}

/// How processed installers are filed
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrganizeConfig {
    /// What to do when the title folder already holds a file with the same name
    #[serde(default)]
    pub file_collision: FileCollisionAction,

    /// Platform tag placed after the title in folder and archive names (default: "W_P")
    #[serde(default = "default_platform_tag")]
    pub platform_tag: String,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            file_collision: FileCollisionAction::default(),
            platform_tag: default_platform_tag(),
        }
    }
}

/// Main configuration for the ingest pipeline
///
/// Built once at startup and shared (usually as `Arc<Config>`) with every
/// component; nothing reads configuration from globals.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory layout
    #[serde(default)]
    pub folders: FolderConfig,

    /// External unpacking tool
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Remote metadata catalog
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Watch loop timing and concurrency
    #[serde(default)]
    pub watch: WatchConfig,

    /// Installer filing rules
    #[serde(default)]
    pub organize: OrganizeConfig,
}

impl Config {
    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        info!(
            path = %path.display(),
            "configuration file not found, using defaults"
        );
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.watch.scan_interval.is_zero() {
            return Err(Error::Config {
                message: "scan interval must be greater than zero".into(),
                key: Some("watch.scan_interval".into()),
            });
        }
        if self.watch.installer_extension.trim_start_matches('.').is_empty() {
            return Err(Error::Config {
                message: "installer extension must not be empty".into(),
                key: Some("watch.installer_extension".into()),
            });
        }
        if self.watch.max_concurrent_installers == 0 {
            return Err(Error::Config {
                message: "at least one installer must be processed at a time".into(),
                key: Some("watch.max_concurrent_installers".into()),
            });
        }
        if self.folders.processed_set_file.is_empty() {
            return Err(Error::Config {
                message: "processed set file name must not be empty".into(),
                key: Some("folders.processed_set_file".into()),
            });
        }
        url::Url::parse(&self.catalog.base_url).map_err(|e| Error::Config {
            message: format!("invalid catalog base URL '{}': {}", self.catalog.base_url, e),
            key: Some("catalog.base_url".into()),
        })?;
        Ok(())
    }

    /// Root directory holding one folder per processed title
    pub fn processed_root(&self) -> PathBuf {
        if self.folders.processed_dir.is_absolute() {
            self.folders.processed_dir.clone()
        } else {
            self.folders.watch_dir.join(&self.folders.processed_dir)
        }
    }

    /// Location of the persisted processed-installer record
    pub fn processed_set_path(&self) -> PathBuf {
        self.folders.watch_dir.join(&self.folders.processed_set_file)
    }

    /// Installer extension without a leading dot
    pub fn installer_extension(&self) -> &str {
        self.watch.installer_extension.trim_start_matches('.')
    }

    /// Create the watch, destination and processed directories
    ///
    /// Failing here is fatal: the watch loop must not start without somewhere
    /// to put its output.
    pub fn ensure_directories(&self) -> Result<()> {
        let dirs = [
            ("folders.watch_dir", self.folders.watch_dir.clone()),
            ("folders.dest_dir", self.folders.dest_dir.clone()),
            ("folders.processed_dir", self.processed_root()),
        ];
        for (key, dir) in dirs {
            std::fs::create_dir_all(&dir).map_err(|e| Error::Config {
                message: format!("cannot create directory {}: {}", dir.display(), e),
                key: Some(key.into()),
            })?;
        }
        if let Some(temp_dir) = &self.folders.temp_dir {
            std::fs::create_dir_all(temp_dir).map_err(|e| Error::Config {
                message: format!("cannot create directory {}: {}", temp_dir.display(), e),
                key: Some("folders.temp_dir".into()),
            })?;
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_watch_dir() -> PathBuf {
    PathBuf::from("./watch")
}

fn default_dest_dir() -> PathBuf {
    PathBuf::from("./dest")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("processed")
}

fn default_processed_set_file() -> String {
    "processed_files.json".into()
}

fn default_catalog_base_url() -> String {
    "https://api.gog.com".into()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_scan_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_installer_extension() -> String {
    "exe".into()
}

fn default_max_concurrent() -> usize {
    1
}

fn default_platform_tag() -> String {
    "W_P".into()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
