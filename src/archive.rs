//! Payload archiving
//!
//! Packs an extracted payload tree into a single ZIP file. Entry names are
//! relative to the payload root, so nothing about the temporary workspace leaks
//! into the archive. Output is deterministic for a given tree: entries are
//! written in sorted order with fixed timestamps and permissions.
//!
//! The archive is first written to a temporary file next to its final location
//! and then renamed into place, replacing any previous archive of the same name.
//! Files over 4 GiB are written with zip64 extensions.

use crate::error::{ArchiveError, Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Largest file size a plain (non-zip64) entry can describe
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// What went into an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Final archive location
    pub path: PathBuf,
    /// Regular files written
    pub files: usize,
    /// Directory entries written
    pub directories: usize,
    /// Uncompressed payload size in bytes
    pub bytes: u64,
}

/// Pack the directory at `source` into `archive_path`
///
/// Runs the blocking ZIP writer on the blocking thread pool. `source` is owned by
/// that task and dropped only once the archive is finished, so a [`TempDir`]
/// workspace outlives the writer even when this future is dropped early.
///
/// [`TempDir`]: tempfile::TempDir
pub async fn pack<S>(source: S, archive_path: &Path) -> Result<ArchiveSummary>
where
    S: AsRef<Path> + Send + 'static,
{
    let dest = archive_path.to_path_buf();

    spawn_blocking(move || pack_blocking(source.as_ref(), &dest))
        .await
        .map_err(|e| {
            Error::Archive(ArchiveError::WriteFailed {
                path: archive_path.to_path_buf(),
                reason: format!("archive task panicked: {}", e),
            })
        })?
}

/// Blocking implementation of [`pack`]
pub fn pack_blocking(source_dir: &Path, archive_path: &Path) -> Result<ArchiveSummary> {
    let meta = std::fs::metadata(source_dir).map_err(|e| {
        Error::Archive(ArchiveError::InvalidSource {
            path: source_dir.to_path_buf(),
            reason: e.to_string(),
        })
    })?;
    if !meta.is_dir() {
        return Err(Error::Archive(ArchiveError::InvalidSource {
            path: source_dir.to_path_buf(),
            reason: "not a directory".into(),
        }));
    }

    let parent = match archive_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let write_failed = |reason: String| {
        Error::Archive(ArchiveError::WriteFailed {
            path: archive_path.to_path_buf(),
            reason,
        })
    };

    let temp = tempfile::NamedTempFile::new_in(&parent)?;
    let mut writer = ZipWriter::new(temp.as_file());

    let file_options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);
    let dir_options = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o755);

    let mut summary = ArchiveSummary {
        path: archive_path.to_path_buf(),
        files: 0,
        directories: 0,
        bytes: 0,
    };

    for entry in WalkDir::new(source_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            Error::Archive(ArchiveError::WalkFailed {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| source_dir.to_path_buf()),
                reason: e.to_string(),
            })
        })?;

        let name = entry_name(source_dir, entry.path())?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            writer
                .add_directory(name, dir_options)
                .map_err(|e| write_failed(e.to_string()))?;
            summary.directories += 1;
        } else if file_type.is_file() {
            let mut file = std::fs::File::open(entry.path())?;
            let len = file.metadata()?.len();
            writer
                .start_file(name, file_options.large_file(needs_zip64(len)))
                .map_err(|e| write_failed(e.to_string()))?;
            summary.bytes += std::io::copy(&mut file, &mut writer)?;
            summary.files += 1;
        } else {
            debug!(path = %entry.path().display(), "skipping non-regular file");
        }
    }

    writer.flush()?;
    writer.finish().map_err(|e| write_failed(e.to_string()))?;
    drop(writer);

    temp.as_file().sync_all()?;
    temp.persist(archive_path).map_err(|e| write_failed(e.error.to_string()))?;

    info!(
        archive = %archive_path.display(),
        files = summary.files,
        bytes = summary.bytes,
        "archive written"
    );
    Ok(summary)
}

fn needs_zip64(len: u64) -> bool {
    len > ZIP64_THRESHOLD
}

/// ZIP entry name for `path`: relative to `root`, `/`-separated
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        Error::Archive(ArchiveError::WalkFailed {
            path: path.to_path_buf(),
            reason: format!("not inside {}", root.display()),
        })
    })?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}
