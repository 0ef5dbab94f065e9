//! In-memory storage backend for embedding and tests

use super::{index_name, SchemaStore};
use crate::error::{SpecError, SpecResult};
use crate::types::{CategoryId, CategorySchema, DeviceId, DeviceSpecification, SchemaMigration};
use async_trait::async_trait;
use dashmap::DashMap;

/// In-memory storage backend
pub struct MemoryStore {
    /// Category schemas by category id
    schemas: DashMap<CategoryId, CategorySchema>,
    /// Device specifications by device id
    specifications: DashMap<DeviceId, DeviceSpecification>,
    /// Migration records by migration id
    migrations: DashMap<String, SchemaMigration>,
    /// Index name -> (category, field); lookup acceleration is a no-op in
    /// memory but the names are tracked so callers can observe them
    indexes: DashMap<String, (CategoryId, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            schemas: DashMap::new(),
            specifications: DashMap::new(),
            migrations: DashMap::new(),
            indexes: DashMap::new(),
        }
    }

    /// Names of every index created so far, sorted
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of stored category schemas
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaStore for MemoryStore {
    async fn load_all_category_schemas(&self) -> SpecResult<Vec<CategorySchema>> {
        Ok(self.schemas.iter().map(|e| e.value().clone()).collect())
    }

    async fn save_category_schema(&self, schema: &CategorySchema) -> SpecResult<()> {
        self.schemas.insert(schema.id.clone(), schema.clone());
        Ok(())
    }

    async fn load_device_specification(
        &self,
        device_id: &DeviceId,
    ) -> SpecResult<DeviceSpecification> {
        self.specifications
            .get(device_id)
            .map(|s| s.clone())
            .ok_or_else(|| SpecError::NotFound(format!("device specification '{}'", device_id)))
    }

    async fn save_device_specification(&self, spec: &DeviceSpecification) -> SpecResult<()> {
        self.specifications
            .insert(spec.device_id.clone(), spec.clone());
        Ok(())
    }

    async fn load_specifications_for_category(
        &self,
        category_id: &CategoryId,
    ) -> SpecResult<Vec<DeviceSpecification>> {
        Ok(self
            .specifications
            .iter()
            .filter(|e| e.value().category_id == *category_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn save_migration(&self, migration: &SchemaMigration) -> SpecResult<()> {
        self.migrations
            .insert(migration.id.clone(), migration.clone());
        Ok(())
    }

    async fn load_migration(&self, id: &str) -> SpecResult<Option<SchemaMigration>> {
        Ok(self.migrations.get(id).map(|m| m.clone()))
    }

    async fn create_index(&self, category_id: &CategoryId, field: &str) -> SpecResult<()> {
        let name = index_name(category_id, field);
        self.indexes
            .insert(name, (category_id.clone(), field.to_string()));
        Ok(())
    }
}
