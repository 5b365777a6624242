//! Trait for installer unpacking backends

use async_trait::async_trait;
use std::path::Path;

/// Extracts catalog identifiers and payloads from installers
///
/// Implementations must not leave child processes running after a call returns.
#[async_trait]
pub trait Unpacker: Send + Sync {
    /// Read the catalog identifier embedded in `installer`
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when the installer carries no identifier,
    /// `Error::ExternalTool` when the tool cannot be run. Both are terminal for
    /// this attempt; the installer stays in place.
    async fn extract_id(&self, installer: &Path) -> crate::Result<String>;

    /// Unpack the full payload of `installer` into `output_dir`
    ///
    /// Scratch files the tool would otherwise emit are excluded.
    ///
    /// # Errors
    ///
    /// Any unsuccessful exit is returned as an error; a partially extracted
    /// payload must not be archived.
    async fn extract_payload(&self, installer: &Path, output_dir: &Path) -> crate::Result<()>;

    /// Name of this backend for logging
    fn name(&self) -> &'static str;
}
