//! Shared test helpers: fake unpackers, fixed resolvers and temp layouts.

use crate::config::Config;
use crate::error::{Error, UnpackError};
use crate::metadata::MetadataResolver;
use crate::types::GameMetadata;
use crate::unpack::Unpacker;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Temp directory with watch/dest/processed folders and a matching config.
pub(crate) struct TestLayout {
    pub(crate) _temp_dir: TempDir,
    pub(crate) config: Config,
}

impl TestLayout {
    pub(crate) fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();

        let mut config = Config::default();
        config.folders.watch_dir = temp_dir.path().join("watch");
        config.folders.dest_dir = temp_dir.path().join("dest");
        config.folders.temp_dir = Some(temp_dir.path().join("tmp"));
        config.watch.scan_interval = Duration::from_millis(50);
        config.watch.use_fs_events = false;
        config.ensure_directories().unwrap();

        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    pub(crate) fn watch_dir(&self) -> &Path {
        &self.config.folders.watch_dir
    }

    pub(crate) fn dest_dir(&self) -> &Path {
        &self.config.folders.dest_dir
    }

    pub(crate) fn temp_root(&self) -> PathBuf {
        self.config.folders.temp_dir.clone().unwrap()
    }

    /// Drop an installer (and optional `.bin` parts) into the watch folder.
    pub(crate) fn add_installer(&self, name: &str, parts: &[&str]) -> PathBuf {
        let installer = self.watch_dir().join(name);
        std::fs::write(&installer, b"MZ fake installer").unwrap();
        for part in parts {
            std::fs::write(self.watch_dir().join(part), b"part data").unwrap();
        }
        installer
    }
}

/// In-process unpacker that writes a fixed payload.
pub(crate) struct FakeUnpacker {
    /// Catalog ID returned by `extract_id`; `None` means "not found"
    pub(crate) id: Option<String>,
    /// Relative path and content of every payload file
    pub(crate) files: Vec<(String, Vec<u8>)>,
    /// Make `extract_payload` fail after writing a partial payload
    pub(crate) fail_payload: bool,
    pub(crate) id_calls: AtomicUsize,
    pub(crate) payload_calls: AtomicUsize,
    /// Output directories handed to `extract_payload`
    pub(crate) output_dirs: Mutex<Vec<PathBuf>>,
}

impl FakeUnpacker {
    pub(crate) fn with_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            files: vec![
                ("app/game.exe".into(), b"game binary".to_vec()),
                ("app/data/level1.dat".into(), vec![7u8; 4096]),
                ("app/data/empty.dat".into(), Vec::new()),
            ],
            fail_payload: false,
            id_calls: AtomicUsize::new(0),
            payload_calls: AtomicUsize::new(0),
            output_dirs: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn without_id() -> Self {
        Self {
            id: None,
            ..Self::with_id("unused")
        }
    }

    pub(crate) fn empty_payload(id: &str) -> Self {
        Self {
            files: Vec::new(),
            ..Self::with_id(id)
        }
    }

    pub(crate) fn failing_payload(id: &str) -> Self {
        Self {
            fail_payload: true,
            ..Self::with_id(id)
        }
    }

    pub(crate) fn payload_calls(&self) -> usize {
        self.payload_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_output_dir(&self) -> Option<PathBuf> {
        self.output_dirs.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Unpacker for FakeUnpacker {
    async fn extract_id(&self, installer: &Path) -> crate::Result<String> {
        self.id_calls.fetch_add(1, Ordering::SeqCst);
        self.id
            .clone()
            .ok_or_else(|| Error::NotFound(format!("no catalog ID found in {}", installer.display())))
    }

    async fn extract_payload(&self, installer: &Path, output_dir: &Path) -> crate::Result<()> {
        self.payload_calls.fetch_add(1, Ordering::SeqCst);
        self.output_dirs
            .lock()
            .unwrap()
            .push(output_dir.to_path_buf());

        for (i, (rel, content)) in self.files.iter().enumerate() {
            if self.fail_payload && i == 1 {
                return Err(Error::Unpack(UnpackError::ExtractionFailed {
                    installer: installer.to_path_buf(),
                    code: Some(1),
                    reason: "simulated failure".into(),
                }));
            }
            let dest = output_dir.join(rel);
            std::fs::create_dir_all(dest.parent().unwrap())?;
            std::fs::write(dest, content)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Resolver returning canned metadata per catalog ID (sentinels otherwise).
#[derive(Default)]
pub(crate) struct StaticResolver {
    pub(crate) entries: HashMap<String, GameMetadata>,
}

impl StaticResolver {
    pub(crate) fn single(id: &str, title: &str, year: &str) -> Self {
        let mut entries = HashMap::new();
        entries.insert(id.to_string(), GameMetadata::new(title, year));
        Self { entries }
    }
}

#[async_trait]
impl MetadataResolver for StaticResolver {
    async fn resolve(&self, catalog_id: &str) -> GameMetadata {
        self.entries
            .get(catalog_id)
            .cloned()
            .unwrap_or_else(GameMetadata::unknown)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Behavior of the generated innoextract stand-in script.
#[cfg_attr(not(unix), allow(dead_code))]
pub(crate) struct FakeTool {
    pub(crate) game_id: Option<String>,
    pub(crate) payload_exit_code: i32,
    pub(crate) payload_sleep_secs: u64,
    /// `false` exits 0 without writing anything
    pub(crate) writes_payload: bool,
}

impl Default for FakeTool {
    fn default() -> Self {
        Self {
            game_id: Some("12345".into()),
            payload_exit_code: 0,
            payload_sleep_secs: 0,
            writes_payload: true,
        }
    }
}

/// Write a `/bin/sh` script that mimics innoextract's flags and output.
///
/// Callers should run under `#[serial]`: executing a file another thread may
/// still hold open for writing fails with ETXTBSY.
#[cfg(unix)]
pub(crate) fn write_fake_tool(dir: &Path, tool: &FakeTool) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let id_branch = match &tool.game_id {
        Some(id) => format!("echo \"GOG.com game ID is {id}\""),
        None => "echo \"$2: not a GOG installer\" >&2".to_string(),
    };
    let sleep_branch = if tool.payload_sleep_secs > 0 {
        format!("exec sleep {}", tool.payload_sleep_secs)
    } else {
        String::new()
    };
    let failure_branch = if tool.payload_exit_code != 0 {
        format!(
            "echo \"error: checksum mismatch\" >&2\nexit {}",
            tool.payload_exit_code
        )
    } else if !tool.writes_payload {
        "exit 0".to_string()
    } else {
        String::new()
    };

    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "--gog-game-id" ]; then
  echo "Inspecting \"$2\" - setup data version 5.5.7 (unicode)"
  {id_branch}
  exit 0
fi
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output-dir) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
{sleep_branch}
{failure_branch}
mkdir -p "$out/app/data"
printf 'payload' > "$out/app/game.exe"
: > "$out/app/data/empty.dat"
exit 0
"#
    );

    let path = dir.join("fake-innoextract");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
