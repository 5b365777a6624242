//! Durable record of installers that have been fully processed
//!
//! The record is a JSON array of installer path strings stored next to the
//! installers (by default `<watch_dir>/processed_files.json`). It only ever grows:
//! a path is added once its archive has been written and the installer has been
//! filed away, so an interrupted run never causes an installer to be skipped.
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the record, so a crash mid-write leaves either the old or the new
//! contents on disk.

use crate::error::Result;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Set of processed installer paths backed by a JSON file
#[derive(Debug, Clone)]
pub struct ProcessedSet {
    path: PathBuf,
    entries: BTreeSet<String>,
}

impl ProcessedSet {
    /// Load the record at `path`
    ///
    /// Never fails: a missing file yields an empty set, an unreadable file is
    /// logged and treated as empty, and a file that does not parse is moved aside
    /// to `<name>.corrupt` (so the next save does not destroy it) before starting
    /// empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(list) => list.into_iter().collect(),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "processed set is corrupt, starting empty"
                    );
                    Self::quarantine(&path);
                    BTreeSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "processed set is unreadable, starting empty"
                );
                BTreeSet::new()
            }
        };

        debug!(path = %path.display(), entries = entries.len(), "loaded processed set");
        Self { path, entries }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `installer` has already been processed
    pub fn contains(&self, installer: &Path) -> bool {
        self.entries.contains(&Self::key(installer))
    }

    /// Add `installer` to the in-memory set; returns false if it was already present
    ///
    /// Call [`ProcessedSet::save`] (or use [`ProcessedSet::mark_done`]) before
    /// treating the installer as done.
    pub fn add(&mut self, installer: &Path) -> bool {
        self.entries.insert(Self::key(installer))
    }

    /// Number of recorded installers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the set, replacing the backing file atomically
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let list: Vec<&String> = self.entries.iter().collect();
        let json = serde_json::to_vec(&list)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(&json)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), entries = self.entries.len(), "saved processed set");
        Ok(())
    }

    /// Record `installer` and persist the set
    ///
    /// On a failed save the path stays in memory, so this process will not pick
    /// the installer up again; the next successful save writes it out.
    pub fn mark_done(&mut self, installer: &Path) -> Result<()> {
        self.add(installer);
        self.save()
    }

    fn key(installer: &Path) -> String {
        installer.to_string_lossy().into_owned()
    }

    fn quarantine(path: &Path) {
        let mut corrupt = path.as_os_str().to_owned();
        corrupt.push(".corrupt");
        let corrupt = PathBuf::from(corrupt);
        match std::fs::rename(path, &corrupt) {
            Ok(()) => warn!(
                path = %corrupt.display(),
                "moved corrupt processed set aside"
            ),
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "failed to move corrupt processed set aside"
            ),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let set = ProcessedSet::load(temp_dir.path().join("processed_files.json"));
        assert!(set.is_empty());
    }

    #[test]
    fn mark_done_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let record = temp_dir.path().join("processed_files.json");
        let installer = temp_dir.path().join("setup_game.exe");

        let mut set = ProcessedSet::load(&record);
        set.mark_done(&installer).unwrap();

        let reloaded = ProcessedSet::load(&record);
        assert!(reloaded.contains(&installer));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn record_is_a_json_array_of_paths() {
        let temp_dir = TempDir::new().unwrap();
        let record = temp_dir.path().join("processed_files.json");

        let mut set = ProcessedSet::load(&record);
        set.add(Path::new("/watch/b.exe"));
        set.add(Path::new("/watch/a.exe"));
        set.save().unwrap();

        let raw = std::fs::read_to_string(&record).unwrap();
        let list: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(list, vec!["/watch/a.exe", "/watch/b.exe"]);
    }

    #[test]
    fn add_reports_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let mut set = ProcessedSet::load(temp_dir.path().join("p.json"));
        assert!(set.add(Path::new("/watch/a.exe")));
        assert!(!set.add(Path::new("/watch/a.exe")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn corrupt_file_is_quarantined_and_treated_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let record = temp_dir.path().join("processed_files.json");
        std::fs::write(&record, b"{ not json").unwrap();

        let mut set = ProcessedSet::load(&record);
        assert!(set.is_empty());

        let quarantined = temp_dir.path().join("processed_files.json.corrupt");
        assert_eq!(std::fs::read(&quarantined).unwrap(), b"{ not json");

        // Saving afterwards writes a fresh record without touching the quarantined copy
        set.mark_done(Path::new("/watch/a.exe")).unwrap();
        assert!(ProcessedSet::load(&record).contains(Path::new("/watch/a.exe")));
        assert!(quarantined.exists());
    }

    #[test]
    fn wrong_json_shape_counts_as_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let record = temp_dir.path().join("processed_files.json");
        std::fs::write(&record, br#"{"a.exe": true}"#).unwrap();

        let set = ProcessedSet::load(&record);
        assert!(set.is_empty());
    }

    #[test]
    fn save_creates_missing_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let record = temp_dir.path().join("state").join("processed_files.json");

        let mut set = ProcessedSet::load(&record);
        set.mark_done(Path::new("/watch/a.exe")).unwrap();
        assert!(record.exists());
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let temp_dir = TempDir::new().unwrap();
        let record = temp_dir.path().join("processed_files.json");

        let mut set = ProcessedSet::load(&record);
        for name in ["a.exe", "b.exe", "c.exe"] {
            set.mark_done(&temp_dir.path().join(name)).unwrap();
        }

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("processed_files.json")]);
    }
}
