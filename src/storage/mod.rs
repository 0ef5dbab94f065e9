//! Storage backends for the schema registry.
//!
//! The registry talks to persistence through one trait, [`SchemaStore`].
//! Backends in tree:
//!
//! - **Memory**: in-memory storage for embedding and testing
//!
//! Category schemas are stored keyed by category id with their `fields` map
//! serialized as a nested object, never flattened into columns; the field set
//! is open-ended and category-specific.

mod memory;

pub use memory::MemoryStore;

use crate::error::SpecResult;
use crate::types::{CategoryId, CategorySchema, DeviceId, DeviceSpecification, SchemaMigration};
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence contract for schemas, specifications, and migrations
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Load every stored category schema; called at registry startup and by
    /// the compatibility engine to resolve schemas per check
    async fn load_all_category_schemas(&self) -> SpecResult<Vec<CategorySchema>>;

    /// Upsert a category schema by its id
    async fn save_category_schema(&self, schema: &CategorySchema) -> SpecResult<()>;

    /// Load one device's specification, `NotFound` if absent
    async fn load_device_specification(
        &self,
        device_id: &DeviceId,
    ) -> SpecResult<DeviceSpecification>;

    /// Upsert a device specification by its device id
    async fn save_device_specification(&self, spec: &DeviceSpecification) -> SpecResult<()>;

    /// Load every stored specification belonging to a category
    async fn load_specifications_for_category(
        &self,
        category_id: &CategoryId,
    ) -> SpecResult<Vec<DeviceSpecification>>;

    /// Upsert a migration record by its id
    async fn save_migration(&self, migration: &SchemaMigration) -> SpecResult<()>;

    /// Load a migration record by id
    async fn load_migration(&self, id: &str) -> SpecResult<Option<SchemaMigration>>;

    /// Create a lookup index named `idx_{category}_{field}`.
    ///
    /// Best-effort: callers log failures and keep going.
    async fn create_index(&self, category_id: &CategoryId, field: &str) -> SpecResult<()>;
}

/// Type alias for a shared storage handle
pub type Storage = Arc<dyn SchemaStore>;

/// Create a storage backend from configuration
pub async fn create_storage(config: &crate::config::StorageConfig) -> SpecResult<Storage> {
    match config {
        crate::config::StorageConfig::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Conventional name of the index over one category field
pub fn index_name(category_id: &CategoryId, field: &str) -> String {
    format!("idx_{}_{}", category_id, field)
}
