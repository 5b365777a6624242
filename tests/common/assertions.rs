//! Assertions on archives, processed sets and events

use installer_ingest::Event;
use std::io::Read;
use std::path::Path;
use tokio::sync::broadcast;

/// Entry names of a ZIP archive
pub fn zip_entries(archive: &Path) -> Vec<String> {
    let file = std::fs::File::open(archive).expect("Failed to open archive");
    let mut zip = zip::ZipArchive::new(file).expect("Not a valid ZIP archive");
    (0..zip.len())
        .map(|i| zip.by_index(i).expect("Bad ZIP entry").name().to_string())
        .collect()
}

/// Contents of one archive entry
pub fn zip_entry_bytes(archive: &Path, name: &str) -> Vec<u8> {
    let file = std::fs::File::open(archive).expect("Failed to open archive");
    let mut zip = zip::ZipArchive::new(file).expect("Not a valid ZIP archive");
    let mut entry = zip.by_name(name).expect("Entry missing from archive");
    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .expect("Failed to read archive entry");
    content
}

/// Installer paths stored in a processed-set file
pub fn processed_entries(record: &Path) -> Vec<String> {
    match std::fs::read(record) {
        Ok(raw) => serde_json::from_slice(&raw).expect("Processed set is not a JSON array"),
        Err(_) => Vec::new(),
    }
}

/// Every event currently queued on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Assert a directory has no entries
pub fn assert_dir_empty(dir: &Path) {
    let entries: Vec<_> = std::fs::read_dir(dir)
        .expect("Failed to read directory")
        .map(|e| e.expect("Bad directory entry").path())
        .collect();
    assert!(entries.is_empty(), "expected {} to be empty: {:?}", dir.display(), entries);
}
