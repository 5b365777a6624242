//! Canonical naming and relocation of processed installers
//!
//! Once a payload has been archived, the installer and its `<stem>-*.bin` data
//! parts are moved out of the watch directory into a per-title folder under the
//! processed root. The folder name is derived from the resolved metadata and is
//! safe on both Windows and POSIX filesystems.

use crate::config::FileCollisionAction;
use crate::error::{Error, OrganizeError, Result};
use crate::types::{GameMetadata, UNKNOWN_TITLE};
use crate::utils::{get_unique_path, has_extension, move_file};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Characters that are illegal in a file name on at least one supported platform
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Strip characters that cannot appear in a file name
///
/// Removes `< > : " / \ | ? *` and ASCII control characters, then trims
/// surrounding whitespace and trailing dots.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_ascii_control())
        .collect();

    cleaned
        .trim()
        .trim_end_matches(['.', ' '])
        .to_string()
}

/// Folder (and archive) name for a title
///
/// `"<title> (<tag>) (<year>)"`, or `"<title> (<tag>)"` when the year is the
/// sentinel. A title that sanitizes to nothing becomes [`UNKNOWN_TITLE`].
///
/// ```
/// use installer_ingest::organize::canonical_folder_name;
/// use installer_ingest::types::GameMetadata;
///
/// let meta = GameMetadata::new("Game: Subtitle", "2020");
/// assert_eq!(canonical_folder_name(&meta, "W_P"), "Game Subtitle (W_P) (2020)");
/// ```
pub fn canonical_folder_name(metadata: &GameMetadata, platform_tag: &str) -> String {
    let title = match sanitize_file_name(&metadata.title) {
        t if t.is_empty() => UNKNOWN_TITLE.to_string(),
        t => t,
    };
    let tag = sanitize_file_name(platform_tag);

    if metadata.has_known_year() {
        format!("{} ({}) ({})", title, tag, sanitize_file_name(&metadata.release_year))
    } else {
        format!("{} ({})", title, tag)
    }
}

/// Data parts that belong to `installer`: regular files named `<stem>-*.bin`
///
/// The stem is matched case-sensitively, the extension case-insensitively.
/// Results are sorted by path.
pub async fn find_sibling_parts(watch_dir: &Path, installer: &Path) -> Result<Vec<PathBuf>> {
    let stem = installer
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            Error::Organize(OrganizeError::InvalidPath {
                path: installer.to_path_buf(),
                reason: "Cannot extract file stem".to_string(),
            })
        })?;
    let prefix = format!("{}-", stem);

    let mut parts = Vec::new();
    let mut entries = tokio::fs::read_dir(watch_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&prefix));
        if matches && has_extension(&path, "bin") {
            parts.push(path);
        }
    }

    parts.sort();
    Ok(parts)
}

/// Final locations after a relocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// Title folder under the processed root
    pub folder: PathBuf,
    /// New installer path
    pub installer: PathBuf,
    /// New paths of the sibling parts, in the order they were moved
    pub siblings: Vec<PathBuf>,
}

/// Moves installers into per-title folders under the processed root
#[derive(Debug, Clone)]
pub struct FileOrganizer {
    processed_root: PathBuf,
    collision: FileCollisionAction,
}

impl FileOrganizer {
    /// Create an organizer filing into `processed_root`
    pub fn new(processed_root: impl Into<PathBuf>, collision: FileCollisionAction) -> Self {
        Self {
            processed_root: processed_root.into(),
            collision,
        }
    }

    /// Root folder holding one sub-folder per title
    pub fn processed_root(&self) -> &Path {
        &self.processed_root
    }

    /// Move `installer` and its sibling parts into `<processed_root>/<folder_name>`
    ///
    /// Siblings are moved before the installer, so if anything fails the
    /// installer is still in the watch directory and will be retried.
    pub async fn relocate(
        &self,
        installer: &Path,
        folder_name: &str,
        watch_dir: &Path,
    ) -> Result<Relocation> {
        let folder = self.processed_root.join(folder_name);
        tokio::fs::create_dir_all(&folder).await?;

        let parts = find_sibling_parts(watch_dir, installer).await?;
        debug!(
            installer = %installer.display(),
            parts = parts.len(),
            folder = %folder.display(),
            "relocating installer"
        );

        let mut siblings = Vec::with_capacity(parts.len());
        for part in &parts {
            siblings.push(self.move_into(part, &folder).await?);
        }
        let installer_dest = self.move_into(installer, &folder).await?;

        info!(
            installer = %installer.display(),
            destination = %installer_dest.display(),
            siblings = siblings.len(),
            "installer relocated"
        );

        Ok(Relocation {
            folder,
            installer: installer_dest,
            siblings,
        })
    }

    async fn move_into(&self, source: &Path, folder: &Path) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| {
            Error::Organize(OrganizeError::InvalidPath {
                path: source.to_path_buf(),
                reason: "Cannot extract file name".to_string(),
            })
        })?;

        let destination = get_unique_path(&folder.join(file_name), self.collision)?;
        move_file(source, &destination).await?;

        debug!(source = %source.display(), destination = %destination.display(), "moved file");
        Ok(destination)
    }
}
