//! XML documents for X4 game data
//!
//! Provides an owned element tree with a reader and writer, the location-path
//! selector subset used by game documents, and the `add`/`remove`/`replace`
//! patching that extension packs use to modify base documents.
//!
//! ```
//! use x4_xml::{diff, Document};
//!
//! let base = Document::parse_str(r#"<wares><ware id="a"/></wares>"#).unwrap();
//! let patch = Document::parse_str(
//!     r#"<diff><add sel="/wares"><ware id="b"/></add></diff>"#,
//! )
//! .unwrap();
//!
//! let merged = diff::merge(&base, &[patch]);
//! assert!(merged.notes.is_empty());
//! assert_eq!(merged.document.root.elements().count(), 2);
//! ```

pub mod diff;
pub mod document;
pub mod reader;
pub mod select;
pub mod writer;

pub use diff::{merge, MergeNote, Merged, NoteKind};
pub use document::{Document, Element, Node};
pub use select::{Selector, SelectorError};

/// Errors from reading or writing documents
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
