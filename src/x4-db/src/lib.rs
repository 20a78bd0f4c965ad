//! Catalog storage for extracted X4 data
//!
//! A trait-based repository over the records one extraction run produces:
//! crafts with their equipment slots, equipment with kind-specific stats,
//! consumables, and a key-value table of run metadata. Every run is a full
//! rebuild, so [`CatalogRepository::replace_all`] swaps the whole catalog in a
//! single transaction.
//!
//! # Example
//!
//! ```no_run
//! use x4_db::{CatalogRepository, SqliteDb};
//!
//! let db = SqliteDb::open("x4_catalog.db").unwrap();
//! db.init().unwrap();
//!
//! for craft in db.list_crafts(Some("s")).unwrap() {
//!     println!("{} ({} cargo)", craft.name, craft.cargo_capacity);
//! }
//! ```

pub mod repository;
pub mod sqlite;
pub mod types;

pub use types::*;

pub use repository::{CatalogRepository, RepoError, RepoResult};

pub use sqlite::{SqliteDb, DEFAULT_DB_FILE, SCHEMA_VERSION};
