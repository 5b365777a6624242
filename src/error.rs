//! Error types for installer-ingest
//!
//! This module provides the error taxonomy for the ingest pipeline:
//! - Domain-specific error types (unpack, archive, organize)
//! - A split between installer-scoped failures (log, skip, retry next poll) and
//!   process-fatal failures (configuration, startup)
//! - Machine-readable error codes carried on pipeline events

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for installer-ingest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for installer-ingest
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "watch.scan_interval")
        key: Option<String>,
    },

    /// Configuration file could not be parsed
    #[error("invalid configuration file: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Something the pipeline needed was not there (e.g. no catalog ID in the tool output)
    #[error("not found: {0}")]
    NotFound(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool could not be executed
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, unsupported platform, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Unpacking the installer failed
    #[error("unpack error: {0}")]
    Unpack(#[from] UnpackError),

    /// Writing the payload archive failed
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Relocating installer files failed
    #[error("organize error: {0}")]
    Organize(#[from] OrganizeError),

    /// Folder watching error
    #[error("folder watch error: {0}")]
    FolderWatch(String),
}

/// Errors raised while running the external unpacking tool
#[derive(Debug, Error)]
pub enum UnpackError {
    /// The tool ran but exited unsuccessfully
    #[error("extraction of {installer} failed (exit code {code:?}): {reason}")]
    ExtractionFailed {
        /// The installer being unpacked
        installer: PathBuf,
        /// Process exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Tail of the tool's stderr output
        reason: String,
    },

    /// The tool did not finish within the configured timeout
    #[error("{operation} for {installer} timed out after {seconds}s")]
    TimedOut {
        /// The installer being unpacked
        installer: PathBuf,
        /// Which invocation timed out ("id extraction" or "payload extraction")
        operation: &'static str,
        /// The timeout that elapsed
        seconds: u64,
    },
}

/// Errors raised while writing the payload archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The payload directory is missing or not a directory
    #[error("payload directory {path} is not readable: {reason}")]
    InvalidSource {
        /// The payload directory
        path: PathBuf,
        /// Why it could not be used
        reason: String,
    },

    /// The ZIP writer failed
    #[error("failed to write archive {path}: {reason}")]
    WriteFailed {
        /// The archive being written
        path: PathBuf,
        /// The underlying failure
        reason: String,
    },

    /// Walking the payload tree failed
    #[error("failed to walk {path}: {reason}")]
    WalkFailed {
        /// The entry that could not be visited
        path: PathBuf,
        /// The underlying failure
        reason: String,
    },
}

/// Errors raised while moving installer files into their title folder
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// File move/rename failed
    #[error("failed to move {source_path} to {dest_path}: {reason}")]
    MoveFailed {
        /// The source path of the file being moved
        source_path: PathBuf,
        /// The destination path where the file should be moved
        dest_path: PathBuf,
        /// The reason the move failed
        reason: String,
    },

    /// File collision at destination
    #[error("file collision at {path}: {reason}")]
    FileCollision {
        /// The path where the collision occurred
        path: PathBuf,
        /// The reason for the collision (e.g., "file already exists")
        reason: String,
    },

    /// Invalid path encountered while organizing
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The invalid path that was encountered
        path: PathBuf,
        /// The reason the path is invalid
        reason: String,
    },
}

impl Error {
    /// Whether this error only concerns the installer being processed
    ///
    /// Installer-scoped errors are logged by the watch loop, which then moves on;
    /// the installer stays unmarked and is picked up again on the next scan.
    /// Everything else (configuration, missing tools) stops the process before the
    /// loop starts.
    pub fn is_installer_scoped(&self) -> bool {
        !matches!(
            self,
            Error::Config { .. } | Error::TomlParse(_) | Error::NotSupported(_)
        )
    }

    /// Machine-readable error code, carried on [`crate::types::Event::Failed`]
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::TomlParse(_) => "config_parse_error",
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
            Error::Unpack(e) => match e {
                UnpackError::ExtractionFailed { .. } => "extraction_failed",
                UnpackError::TimedOut { .. } => "unpack_timeout",
            },
            Error::Archive(_) => "archive_error",
            Error::Organize(e) => match e {
                OrganizeError::MoveFailed { .. } => "move_failed",
                OrganizeError::FileCollision { .. } => "file_collision",
                OrganizeError::InvalidPath { .. } => "invalid_path",
            },
            Error::FolderWatch(_) => "folder_watch_error",
        }
    }
}
