//! CLI-based unpacker using the external innoextract binary

use super::parser::{parse_catalog_id, stderr_tail};
use super::traits::Unpacker;
use crate::config::ToolsConfig;
use crate::error::{Error, UnpackError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Executable name of the unpacking tool on this platform
#[cfg(windows)]
pub(crate) const TOOL_NAME: &str = "innoextract.exe";
/// Executable name of the unpacking tool on this platform
#[cfg(not(windows))]
pub(crate) const TOOL_NAME: &str = "innoextract";

/// Lines of stderr kept in extraction errors
const STDERR_TAIL_LINES: usize = 5;

/// Unpacker that shells out to innoextract
///
/// # Examples
///
/// ```no_run
/// use installer_ingest::unpack::{CliUnpacker, Unpacker};
/// use std::path::{Path, PathBuf};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Create with explicit path and a ten minute limit per invocation
/// let unpacker = CliUnpacker::new(PathBuf::from("/usr/bin/innoextract"))
///     .with_timeout(Some(Duration::from_secs(600)));
///
/// let id = unpacker.extract_id(Path::new("setup_game.exe")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CliUnpacker {
    binary_path: PathBuf,
    timeout: Option<Duration>,
}

impl CliUnpacker {
    /// Create a new CLI unpacker with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            timeout: None,
        }
    }

    /// Limit how long a single invocation may run
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attempt to find innoextract in PATH
    pub fn from_path() -> Option<Self> {
        which::which(TOOL_NAME).ok().map(Self::new)
    }

    /// Binary bundled next to the running executable (`bin/innoextract`)
    pub fn bundled_path() -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        let candidate = exe.parent()?.join("bin").join(TOOL_NAME);
        candidate.is_file().then_some(candidate)
    }

    /// Select the binary according to tool settings
    ///
    /// An explicit `unpacker_path` wins, then a bundled `bin/` binary, then PATH
    /// (when `search_path` is enabled).
    ///
    /// # Errors
    ///
    /// `Error::NotSupported` if no binary can be found.
    pub fn from_config(tools: &ToolsConfig) -> crate::Result<Self> {
        let binary_path = if let Some(path) = &tools.unpacker_path {
            path.clone()
        } else if let Some(path) = Self::bundled_path() {
            path
        } else if tools.search_path {
            which::which(TOOL_NAME).map_err(|_| {
                Error::NotSupported(format!(
                    "{} not found in PATH; set tools.unpacker_path",
                    TOOL_NAME
                ))
            })?
        } else {
            return Err(Error::NotSupported(format!(
                "no {} binary configured and PATH search is disabled",
                TOOL_NAME
            )));
        };

        info!(path = %binary_path.display(), "using unpacker binary");
        Ok(Self::new(binary_path).with_timeout(tools.timeout))
    }

    /// Path of the binary this unpacker runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Run the tool to completion, honoring the configured timeout
    ///
    /// The child is spawned with `kill_on_drop`, so when the timeout elapses the
    /// process is killed along with the dropped future.
    async fn run(
        &self,
        mut command: Command,
        installer: &Path,
        operation: &'static str,
    ) -> crate::Result<Output> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let spawn_error =
            |e: std::io::Error| Error::ExternalTool(format!("Failed to execute {}: {}", TOOL_NAME, e));

        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, command.output()).await {
                Ok(result) => result.map_err(spawn_error),
                Err(_) => Err(Error::Unpack(UnpackError::TimedOut {
                    installer: installer.to_path_buf(),
                    operation,
                    seconds: limit.as_secs(),
                })),
            },
            None => command.output().await.map_err(spawn_error),
        }
    }
}

#[async_trait]
impl Unpacker for CliUnpacker {
    async fn extract_id(&self, installer: &Path) -> crate::Result<String> {
        debug!(installer = %installer.display(), "extracting catalog id");

        let mut command = Command::new(&self.binary_path);
        command.arg("--gog-game-id").arg(installer);
        let output = self.run(command, installer, "id extraction").await?;

        parse_catalog_id(&output.stdout).ok_or_else(|| {
            let detail = stderr_tail(&output.stderr, STDERR_TAIL_LINES);
            if detail.is_empty() {
                Error::NotFound(format!("no catalog ID found in {}", installer.display()))
            } else {
                Error::NotFound(format!(
                    "no catalog ID found in {}: {}",
                    installer.display(),
                    detail
                ))
            }
        })
    }

    async fn extract_payload(&self, installer: &Path, output_dir: &Path) -> crate::Result<()> {
        debug!(
            installer = %installer.display(),
            output_dir = %output_dir.display(),
            "extracting payload"
        );
        tokio::fs::create_dir_all(output_dir).await?;

        let mut command = Command::new(&self.binary_path);
        command
            .arg("--gog")
            .arg("--exclude-temp")
            .arg("--output-dir")
            .arg(output_dir)
            .arg(installer);
        let output = self.run(command, installer, "payload extraction").await?;

        if !output.status.success() {
            return Err(Error::Unpack(UnpackError::ExtractionFailed {
                installer: installer.to_path_buf(),
                code: output.status.code(),
                reason: stderr_tail(&output.stderr, STDERR_TAIL_LINES),
            }));
        }

        // An empty payload is still archived and filed
        let mut entries = tokio::fs::read_dir(output_dir).await?;
        if entries.next_entry().await?.is_none() {
            warn!(installer = %installer.display(), "tool exited cleanly but wrote no files");
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "cli-innoextract"
    }
}
