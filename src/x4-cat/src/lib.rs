//! X4 catalog archives
//!
//! Game content ships in numbered `.cat`/`.dat` archive pairs: `01.cat` to
//! `09.cat` in the installation root, and `ext_01.cat` to `ext_03.cat` in
//! each extension. Later archives override same-path files from earlier
//! ones, so the order in which they are unpacked decides what the merged
//! tree looks like.
//!
//! This crate resolves that order from the configured [`Layer`]s and defines
//! the [`ArchiveExtractor`] boundary, with two implementations:
//!
//! - [`CatTool`] runs the external catalog tool as a bounded subprocess
//! - [`LooseExtractor`] copies from already-unpacked directory trees

pub mod cattool;
pub mod detect;
pub mod extractor;
pub mod filter;
pub mod layer;
pub mod loose;
pub mod overlay;

pub use cattool::CatTool;
pub use detect::detect_layers;
pub use extractor::{ArchiveExtractor, ExtractRequest};
pub use filter::{PathFilter, PathPattern};
pub use layer::Layer;
pub use loose::LooseExtractor;
pub use overlay::{ArchiveSequence, LayerArchives};

use std::path::PathBuf;
use std::time::Duration;

/// Errors from archive extraction
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog tool not found: {}", .0.display())]
    ToolMissing(PathBuf),

    #[error("Failed to start catalog tool {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Catalog tool exited with {status}: {stderr}")]
    ToolFailed { status: String, stderr: String },

    #[error("Catalog tool timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid path pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("No archives to extract from")]
    NoArchives,
}

pub type Result<T> = std::result::Result<T, Error>;
