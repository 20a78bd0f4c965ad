//! Repository trait for catalog storage.

use crate::types::*;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Catalog storage for one extraction's worth of records
pub trait CatalogRepository {
    /// Create the schema if it does not exist
    fn init(&self) -> RepoResult<()>;

    /// Drop every table and create an empty schema
    fn recreate(&self) -> RepoResult<()>;

    /// Insert crafts with their slots, equipment with their stats, and consumables
    fn insert_batch(&self, batch: &Batch) -> RepoResult<BatchCounts>;

    /// `recreate` followed by `insert_batch`, atomically. On failure the
    /// previous contents are untouched.
    fn replace_all(&self, batch: &Batch) -> RepoResult<BatchCounts>;

    // === Crafts ===

    /// Get a craft with its slots
    fn get_craft(&self, macro_name: &str) -> RepoResult<Option<Craft>>;

    /// List crafts ordered by name, optionally of one size. Slots are not loaded.
    fn list_crafts(&self, size: Option<&str>) -> RepoResult<Vec<Craft>>;

    fn slots_for(&self, macro_name: &str) -> RepoResult<Vec<Slot>>;

    /// Delete a craft and its slots
    fn delete_craft(&self, macro_name: &str) -> RepoResult<bool>;

    // === Equipment ===

    /// Get equipment with its stats
    fn get_equipment(&self, macro_name: &str) -> RepoResult<Option<Equipment>>;

    /// List equipment ordered by name, optionally of one kind. Stats are not loaded.
    fn list_equipment(&self, kind: Option<EquipmentKind>) -> RepoResult<Vec<Equipment>>;

    fn list_consumables(&self) -> RepoResult<Vec<Consumable>>;

    // === Run metadata ===

    fn set_metadata(&self, key: &str, value: &str) -> RepoResult<()>;

    fn get_metadata(&self, key: &str) -> RepoResult<Option<String>>;

    // === Statistics ===

    fn stats(&self) -> RepoResult<DbStats>;
}
