//! Installer unpacking through an external tool
//!
//! The pipeline talks to the unpacking tool only through the [`Unpacker`] trait,
//! which keeps process spawning and output scraping in one adapter and lets tests
//! substitute fakes.
//!
//! - [`CliUnpacker`]: runs innoextract (`--gog-game-id` to read the catalog ID,
//!   `--gog --exclude-temp --output-dir` to unpack the payload)
//!
//! ## Usage
//!
//! ```no_run
//! use installer_ingest::unpack::{CliUnpacker, Unpacker};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let unpacker = CliUnpacker::from_path().expect("innoextract not found");
//!
//!     let id = unpacker.extract_id(Path::new("setup_game.exe")).await?;
//!     println!("catalog id: {id}");
//!
//!     unpacker
//!         .extract_payload(Path::new("setup_game.exe"), Path::new("/tmp/payload"))
//!         .await?;
//!     Ok(())
//! }
//! ```

mod cli;
mod parser;
mod traits;

pub use cli::CliUnpacker;
pub use parser::{ID_MARKER, parse_catalog_id};
pub use traits::Unpacker;
