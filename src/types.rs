//! Core types and events

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Title used when the catalog cannot tell us anything
pub const UNKNOWN_TITLE: &str = "Unknown Game";

/// Release year used when the catalog has no usable date
pub const UNKNOWN_YEAR: &str = "0000";

/// Title and release year resolved from the remote catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetadata {
    /// Human-readable title
    pub title: String,
    /// Four-digit release year, or [`UNKNOWN_YEAR`]
    pub release_year: String,
}

impl GameMetadata {
    /// Create metadata from a title and year
    pub fn new(title: impl Into<String>, release_year: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            release_year: release_year.into(),
        }
    }

    /// Sentinel metadata used when the lookup fails
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_TITLE, UNKNOWN_YEAR)
    }

    /// Whether the release year is a real year rather than the sentinel
    pub fn has_known_year(&self) -> bool {
        self.release_year != UNKNOWN_YEAR
    }
}

impl Default for GameMetadata {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Pipeline stage an installer has reached
///
/// Stages advance strictly in declaration order. A failure in any stage aborts
/// the installer and leaves it unmarked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Installer found in the watch directory
    Discovered,
    /// Catalog identifier read from the installer
    IdExtracted,
    /// Title and year resolved (possibly to sentinels)
    MetadataResolved,
    /// Payload unpacked into the temporary workspace
    PayloadExtracted,
    /// Payload archive written to the destination directory
    Archived,
    /// Installer and its parts moved into the title folder
    Relocated,
    /// Installer recorded in the processed set
    MarkedDone,
}

/// Event emitted while installers move through the pipeline
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new, unprocessed installer was found
    InstallerDetected {
        /// Installer path
        installer: PathBuf,
    },

    /// The installer advanced to a new stage
    StageCompleted {
        /// Installer path
        installer: PathBuf,
        /// Stage that just completed
        stage: Stage,
    },

    /// Metadata was resolved for the installer
    MetadataResolved {
        /// Installer path
        installer: PathBuf,
        /// Catalog identifier
        catalog_id: String,
        /// Resolved metadata
        metadata: GameMetadata,
    },

    /// Payload archive written
    Archived {
        /// Installer path
        installer: PathBuf,
        /// Archive location
        archive: PathBuf,
        /// Number of files in the archive
        files: usize,
    },

    /// Installer filed into its title folder
    Completed {
        /// Original installer path
        installer: PathBuf,
        /// Title folder that now holds the installer
        folder: PathBuf,
        /// Archive location
        archive: PathBuf,
    },

    /// Processing failed; the installer will be retried on the next scan
    Failed {
        /// Installer path
        installer: PathBuf,
        /// Stage that was being attempted
        stage: Stage,
        /// Machine-readable error code
        code: String,
        /// Error message
        error: String,
    },
}

/// Outcome of one successful pipeline run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestReport {
    /// Installer path as discovered
    pub installer: PathBuf,
    /// Catalog identifier read from the installer
    pub catalog_id: String,
    /// Resolved metadata
    pub metadata: GameMetadata,
    /// Canonical folder name
    pub folder_name: String,
    /// Archive written to the destination directory
    pub archive: PathBuf,
    /// Title folder under the processed root
    pub folder: PathBuf,
    /// Where the installer ended up
    pub relocated_installer: PathBuf,
    /// Where each sibling part ended up
    pub relocated_siblings: Vec<PathBuf>,
}

/// Counters for one scan of the watch directory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Unprocessed installers found
    pub discovered: usize,
    /// Installers fully processed
    pub succeeded: usize,
    /// Installers that failed and stay pending
    pub failed: usize,
}
