//! Schema registry - main interface
//!
//! Owns the live set of category schemas (current version per category) and
//! their migration history, dispatches to the validator and the migration
//! engine, and talks to the storage collaborator to load and save.
//!
//! The in-memory maps are guarded by `parking_lot::RwLock` and locks are
//! never held across an `.await`; `register_schema` performs its cycle check
//! and insert inside one write-locked section so check-then-insert is atomic.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::error::{SpecError, SpecResult};
use crate::migration;
use crate::storage::{create_storage, Storage};
use crate::templates::{presets, CategoryTemplate, TemplateCustomizations};
use crate::types::{
    CategoryId, CategorySchema, CompatibilityRule, DeviceSpecification, FieldDefinition,
    MigrationOperation, SchemaMigration, SpecReport, ValidationRule,
};
use crate::validator::{Validator, ValidatorConfig};
use crate::version::{self, VersionBump};

/// Partial update applied to a schema copy by [`SchemaRegistry::update_schema`].
///
/// Each present field replaces the copy's value wholesale; absent fields keep
/// the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, FieldDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_fields: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<Vec<ValidationRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility_rules: Option<Vec<CompatibilityRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    /// Version component to bump; the registry default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bump: Option<VersionBump>,
}

impl SchemaUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, FieldDefinition>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_bump(mut self, bump: VersionBump) -> Self {
        self.bump = Some(bump);
        self
    }

    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = Some(deprecated);
        self
    }
}

/// Selection applied by [`SchemaRegistry::get_all_schemas`]
#[derive(Debug, Clone, Default)]
pub struct SchemaFilter {
    /// Only schemas with this parent
    pub parent_id: Option<CategoryId>,
    /// Include deprecated schemas (excluded by default)
    pub include_deprecated: bool,
}

impl SchemaFilter {
    fn matches(&self, schema: &CategorySchema) -> bool {
        if !self.include_deprecated && schema.deprecated {
            return false;
        }
        match &self.parent_id {
            Some(parent) => schema.parent_id.as_ref() == Some(parent),
            None => true,
        }
    }
}

/// Result of applying one migration to a category's stored devices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOutcome {
    /// Number of device specifications brought forward
    pub devices_migrated: usize,
    /// Names of the indexes created for newly indexable fields
    pub index_names: Vec<String>,
}

/// Operational counters for introspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStats {
    pub schemas: usize,
    pub migrations: usize,
    pub pending_migrations: usize,
    pub templates: usize,
}

/// Schema registry - main interface for schema management
///
/// Thread-safe and async-ready: all in-memory state sits behind
/// `parking_lot::RwLock` and storage calls happen outside the locks.
pub struct SchemaRegistry {
    /// Storage backend
    storage: Storage,
    /// Structure and value validator
    validator: Validator,
    /// Registry configuration
    config: RegistryConfig,
    /// Current schema per category
    schemas: RwLock<BTreeMap<CategoryId, CategorySchema>>,
    /// Migration history per category
    history: RwLock<BTreeMap<CategoryId, Vec<SchemaMigration>>>,
    /// Named category templates
    templates: RwLock<BTreeMap<String, CategoryTemplate>>,
    /// Set once `initialize` has loaded the backing store
    initialized: AtomicBool,
}

impl SchemaRegistry {
    /// Create a registry with the given configuration
    pub async fn new(config: RegistryConfig) -> SpecResult<Self> {
        let storage = create_storage(&config.storage).await?;
        Ok(Self::with_storage(storage, config))
    }

    /// Create a registry over an existing storage handle
    pub fn with_storage(storage: Storage, config: RegistryConfig) -> Self {
        let validator = Validator::with_config(ValidatorConfig {
            warnings_as_errors: config.warnings_as_errors,
        });
        let templates = if config.register_builtin_templates {
            presets::all()
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect()
        } else {
            BTreeMap::new()
        };
        Self {
            storage,
            validator,
            config,
            schemas: RwLock::new(BTreeMap::new()),
            history: RwLock::new(BTreeMap::new()),
            templates: RwLock::new(templates),
            initialized: AtomicBool::new(false),
        }
    }

    /// Populate the in-memory schema map from the backing store.
    ///
    /// Idempotent: a second call is a no-op once initialization has
    /// succeeded.
    pub async fn initialize(&self) -> SpecResult<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        let loaded = self.storage.load_all_category_schemas().await?;
        let count = loaded.len();
        {
            let mut schemas = self.schemas.write();
            for schema in loaded {
                schemas.insert(schema.id.clone(), schema);
            }
        }
        self.initialized.store(true, Ordering::Release);
        info!(schemas = count, "Schema registry initialized");
        Ok(())
    }

    /// Access the validator the registry dispatches to
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    // ========================================================================
    // Registration and lookup
    // ========================================================================

    /// Register a category schema as the current version for its category.
    ///
    /// Fails closed: a schema that does not validate, or whose parent chain
    /// loops, is rejected before any store mutation. Index creation for
    /// indexable fields is best-effort.
    pub async fn register_schema(&self, schema: CategorySchema) -> SpecResult<CategorySchema> {
        let report = self.validator.validate_schema(&schema);
        if !report.is_valid() {
            return Err(SpecError::Structural(report.errors.join("; ")));
        }

        // cycle check and insert under one write lock
        let previous = {
            let mut schemas = self.schemas.write();
            if schema.parent_id.is_some() {
                check_parent_chain(&schema, &schemas)?;
            }
            schemas.insert(schema.id.clone(), schema.clone())
        };

        if let Err(error) = self.storage.save_category_schema(&schema).await {
            // roll the in-memory insert back so the map mirrors the store
            let mut schemas = self.schemas.write();
            match previous {
                Some(old) => {
                    schemas.insert(schema.id.clone(), old);
                }
                None => {
                    schemas.remove(&schema.id);
                }
            }
            return Err(error);
        }

        for (name, definition) in &schema.fields {
            if definition.metadata.indexable {
                if let Err(error) = self.storage.create_index(&schema.id, name).await {
                    warn!(
                        category = %schema.id,
                        field = %name,
                        error = %error,
                        "Index creation failed"
                    );
                }
            }
        }

        info!(
            category = %schema.id,
            version = %schema.version,
            fields = schema.fields.len(),
            "Registered schema"
        );
        Ok(schema)
    }

    /// Current schema of a category
    pub fn get_schema(&self, category_id: &CategoryId) -> SpecResult<CategorySchema> {
        self.schemas
            .read()
            .get(category_id)
            .cloned()
            .ok_or_else(|| SpecError::NotFound(format!("category schema '{category_id}'")))
    }

    /// Current schemas, optionally filtered by parent and deprecation state
    pub fn get_all_schemas(&self, filter: Option<&SchemaFilter>) -> Vec<CategorySchema> {
        let default_filter = SchemaFilter::default();
        let filter = filter.unwrap_or(&default_filter);
        self.schemas
            .read()
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect()
    }

    /// Parent id -> child ids, derived from the current schemas
    pub fn get_schema_hierarchy(&self) -> BTreeMap<CategoryId, Vec<CategoryId>> {
        let mut hierarchy: BTreeMap<CategoryId, Vec<CategoryId>> = BTreeMap::new();
        for schema in self.schemas.read().values() {
            if let Some(parent) = &schema.parent_id {
                hierarchy
                    .entry(parent.clone())
                    .or_default()
                    .push(schema.id.clone());
            }
        }
        hierarchy
    }

    /// Merge a registered parent's fields underneath a child schema.
    ///
    /// Child keys win on conflict; required fields are unioned; field names
    /// taken from the parent are recorded in `inherited_fields`.
    pub fn inherit_from_parent(&self, child: &CategorySchema) -> SpecResult<CategorySchema> {
        let Some(parent_id) = &child.parent_id else {
            return Ok(child.clone());
        };
        let parent = self.get_schema(parent_id)?;

        let mut merged = child.clone();
        for (name, definition) in &parent.fields {
            if !merged.fields.contains_key(name) {
                merged.fields.insert(name.clone(), definition.clone());
                merged.inherited_fields.push(name.clone());
            }
        }
        for required in &parent.required_fields {
            merged.required_fields.insert(required.clone());
        }

        debug!(
            child = %child.id,
            parent = %parent_id,
            inherited = merged.inherited_fields.len(),
            "Inherited parent fields"
        );
        Ok(merged)
    }

    /// Validate a device's values against its category's current schema
    pub fn validate_specification(&self, spec: &DeviceSpecification) -> SpecResult<SpecReport> {
        let schema = self.get_schema(&spec.category_id)?;
        Ok(self.validator.validate_specification(spec, &schema))
    }

    // ========================================================================
    // Updates and templates
    // ========================================================================

    /// Advance a category to a new schema version.
    ///
    /// The next version comes from `increment_version` (the registry default
    /// bump unless the update picks one); the partial update is merged into a
    /// copy and the result validated before anything is persisted. A
    /// non-empty operation list is recorded as a migration from the old to
    /// the new version.
    pub async fn update_schema(
        &self,
        category_id: &CategoryId,
        update: SchemaUpdate,
        operations: Vec<MigrationOperation>,
    ) -> SpecResult<CategorySchema> {
        let current = self.get_schema(category_id)?;
        let bump = update.bump.unwrap_or(self.config.default_bump);
        let next_version = version::increment_version(&current.version, bump)?;

        let mut next = current.clone();
        next.version = next_version.clone();
        next.updated_at = Utc::now();
        if let Some(name) = update.name {
            next.name = name;
        }
        if let Some(parent_id) = update.parent_id {
            next.parent_id = Some(parent_id);
        }
        if let Some(fields) = update.fields {
            next.fields = fields;
        }
        if let Some(required_fields) = update.required_fields {
            next.required_fields = required_fields;
        }
        if let Some(validation_rules) = update.validation_rules {
            next.validation_rules = validation_rules;
        }
        if let Some(compatibility_rules) = update.compatibility_rules {
            next.compatibility_rules = compatibility_rules;
        }
        if let Some(deprecated) = update.deprecated {
            next.deprecated = deprecated;
        }

        let report = self.validator.validate_schema(&next);
        if !report.is_valid() {
            return Err(SpecError::Structural(report.errors.join("; ")));
        }

        if !operations.is_empty() {
            let migration = SchemaMigration::new(
                Uuid::new_v4().to_string(),
                category_id.clone(),
                current.version.clone(),
                next_version.clone(),
                operations,
            );
            self.storage.save_migration(&migration).await?;
            self.history
                .write()
                .entry(category_id.clone())
                .or_default()
                .push(migration);
        }

        info!(
            category = %category_id,
            from = %current.version,
            to = %next_version,
            "Updating schema"
        );
        self.register_schema(next).await
    }

    /// Instantiate a named template at version `1.0.0` and register it
    pub async fn create_category_from_template(
        &self,
        template_name: &str,
        category_id: impl Into<CategoryId>,
        customizations: Option<&TemplateCustomizations>,
    ) -> SpecResult<CategorySchema> {
        let template = self
            .templates
            .read()
            .get(template_name)
            .cloned()
            .ok_or_else(|| SpecError::NotFound(format!("category template '{template_name}'")))?;
        let schema = template.instantiate(category_id, customizations);
        self.register_schema(schema).await
    }

    /// Add or replace a named template
    pub fn add_template(&self, template: CategoryTemplate) {
        self.templates
            .write()
            .insert(template.name.clone(), template);
    }

    /// Names of every registered template, sorted
    pub fn template_names(&self) -> Vec<String> {
        self.templates.read().keys().cloned().collect()
    }

    // ========================================================================
    // Migration surface
    // ========================================================================

    /// Record a migration for a category; the id is generated
    pub async fn create_migration(
        &self,
        category_id: &CategoryId,
        from_version: impl Into<String>,
        to_version: impl Into<String>,
        operations: Vec<MigrationOperation>,
    ) -> SpecResult<SchemaMigration> {
        // the category must exist; a migration for an unknown category is a
        // caller error
        self.get_schema(category_id)?;

        let migration = SchemaMigration::new(
            Uuid::new_v4().to_string(),
            category_id.clone(),
            from_version,
            to_version,
            operations,
        );
        self.storage.save_migration(&migration).await?;
        self.history
            .write()
            .entry(category_id.clone())
            .or_default()
            .push(migration.clone());

        info!(
            migration = %migration.id,
            category = %category_id,
            from = %migration.from_version,
            to = %migration.to_version,
            operations = migration.operations.len(),
            "Created migration"
        );
        Ok(migration)
    }

    /// Bring every stored specification of the migration's category forward.
    ///
    /// Fails `AlreadyApplied` for an applied migration. Indexes are created
    /// for `add_field` operations whose definition is indexable, best-effort.
    /// Devices saved before a failing save are not rolled back; the migration
    /// stays marked not applied.
    pub async fn apply_migration(&self, migration_id: &str) -> SpecResult<MigrationOutcome> {
        let mut migration = self
            .storage
            .load_migration(migration_id)
            .await?
            .ok_or_else(|| SpecError::NotFound(format!("migration '{migration_id}'")))?;
        if migration.is_applied() {
            return Err(SpecError::AlreadyApplied(migration.id));
        }

        let specifications = self
            .storage
            .load_specifications_for_category(&migration.category_id)
            .await?;
        let mut devices_migrated = 0usize;
        for spec in &specifications {
            let migrated = migration::migrate_specification(spec, &migration)?;
            self.storage.save_device_specification(&migrated).await?;
            devices_migrated += 1;
        }

        let mut index_names = Vec::new();
        for operation in &migration.operations {
            if let MigrationOperation::AddField { field, definition } = operation {
                if definition.metadata.indexable {
                    let name = crate::storage::index_name(&migration.category_id, field);
                    match self.storage.create_index(&migration.category_id, field).await {
                        Ok(()) => index_names.push(name),
                        Err(error) => warn!(
                            category = %migration.category_id,
                            field = %field,
                            error = %error,
                            "Index creation failed"
                        ),
                    }
                }
            }
        }

        migration.applied_at = Some(Utc::now());
        self.storage.save_migration(&migration).await?;
        {
            let mut history = self.history.write();
            if let Some(entries) = history.get_mut(&migration.category_id) {
                if let Some(entry) = entries.iter_mut().find(|m| m.id == migration.id) {
                    entry.applied_at = migration.applied_at;
                }
            }
        }

        info!(
            migration = %migration.id,
            category = %migration.category_id,
            devices = devices_migrated,
            indexes = index_names.len(),
            "Applied migration"
        );
        Ok(MigrationOutcome {
            devices_migrated,
            index_names,
        })
    }

    /// History entries for a category that have not been applied
    pub fn get_pending_migrations(&self, category_id: &CategoryId) -> Vec<SchemaMigration> {
        self.history
            .read()
            .get(category_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|m| !m.is_applied())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All recorded migrations for a category, in creation order
    pub fn get_migration_history(&self, category_id: &CategoryId) -> Vec<SchemaMigration> {
        self.history
            .read()
            .get(category_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Rolling a migration back is not supported
    pub async fn rollback_migration(&self, _migration_id: &str) -> SpecResult<()> {
        Err(SpecError::NotImplemented("migration rollback".into()))
    }

    /// Operational counters
    pub fn stats(&self) -> RegistryStats {
        let history = self.history.read();
        let migrations = history.values().map(Vec::len).sum();
        let pending_migrations = history
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|m| !m.is_applied())
            .count();
        RegistryStats {
            schemas: self.schemas.read().len(),
            migrations,
            pending_migrations,
            templates: self.templates.read().len(),
        }
    }
}

/// Walk the parent chain from `schema`, failing on a revisited id.
///
/// The walk is bounded by the visited set; an id missing from the map ends
/// the chain (parents may be registered later).
fn check_parent_chain(
    schema: &CategorySchema,
    schemas: &BTreeMap<CategoryId, CategorySchema>,
) -> SpecResult<()> {
    let mut visited = BTreeSet::new();
    visited.insert(schema.id.clone());

    let mut current = schema.parent_id.clone();
    while let Some(parent_id) = current {
        if !visited.insert(parent_id.clone()) {
            return Err(SpecError::CircularInheritance(parent_id.to_string()));
        }
        current = schemas
            .get(&parent_id)
            .and_then(|parent| parent.parent_id.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, SchemaStore};
    use crate::types::{FieldConstraints, FieldType};
    use serde_json::json;
    use std::sync::Arc;

    fn monitor_schema() -> CategorySchema {
        CategorySchema::new("monitor", "Monitor", "1.0.0")
            .with_field(
                "resolution",
                FieldDefinition::new(FieldType::String, "Resolution"),
            )
            .with_field(
                "refresh_rate",
                FieldDefinition::new(FieldType::Number, "Refresh Rate").indexable(),
            )
            .with_required_field("resolution")
    }

    fn registry_over(store: Arc<MemoryStore>) -> SchemaRegistry {
        SchemaRegistry::with_storage(store, RegistryConfig::memory())
    }

    // ==== Registration Tests ====

    #[tokio::test]
    async fn test_register_and_get_schema() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry.register_schema(monitor_schema()).await.unwrap();

        let schema = registry.get_schema(&CategoryId::new("monitor")).unwrap();
        assert_eq!(schema.version, "1.0.0");
        assert!(schema.has_field("resolution"));
    }

    #[tokio::test]
    async fn test_register_invalid_schema_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry_over(store.clone());

        // required field that is not defined
        let schema = CategorySchema::new("monitor", "Monitor", "1.0.0")
            .with_required_field("resolution");
        let result = registry.register_schema(schema).await;
        assert!(matches!(result, Err(SpecError::Structural(_))));

        // nothing persisted, nothing cached
        assert_eq!(store.schema_count(), 0);
        assert!(registry.get_schema(&CategoryId::new("monitor")).is_err());
    }

    #[tokio::test]
    async fn test_register_creates_indexes_for_indexable_fields() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry_over(store.clone());
        registry.register_schema(monitor_schema()).await.unwrap();

        assert_eq!(store.index_names(), vec!["idx_monitor_refresh_rate"]);
    }

    #[tokio::test]
    async fn test_get_missing_schema_is_not_found() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        assert!(matches!(
            registry.get_schema(&CategoryId::new("ghost")),
            Err(SpecError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        store
            .save_category_schema(&monitor_schema())
            .await
            .unwrap();

        let registry = registry_over(store);
        registry.initialize().await.unwrap();
        registry.initialize().await.unwrap();

        assert_eq!(registry.stats().schemas, 1);
    }

    // ==== Inheritance Tests ====

    #[tokio::test]
    async fn test_circular_inheritance_rejected() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry
            .register_schema(
                CategorySchema::new("a", "A", "1.0.0")
                    .with_field("x", FieldDefinition::new(FieldType::String, "X"))
                    .with_parent("b"),
            )
            .await
            .unwrap();
        registry
            .register_schema(
                CategorySchema::new("b", "B", "1.0.0")
                    .with_field("y", FieldDefinition::new(FieldType::String, "Y"))
                    .with_parent("c"),
            )
            .await
            .unwrap();

        // c -> a closes the loop c -> a -> b -> c
        let result = registry
            .register_schema(
                CategorySchema::new("c", "C", "1.0.0")
                    .with_field("z", FieldDefinition::new(FieldType::String, "Z"))
                    .with_parent("a"),
            )
            .await;
        assert!(matches!(result, Err(SpecError::CircularInheritance(_))));
    }

    #[tokio::test]
    async fn test_self_parent_rejected() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        let result = registry
            .register_schema(
                CategorySchema::new("a", "A", "1.0.0")
                    .with_field("x", FieldDefinition::new(FieldType::String, "X"))
                    .with_parent("a"),
            )
            .await;
        assert!(matches!(result, Err(SpecError::CircularInheritance(_))));
    }

    #[tokio::test]
    async fn test_inherit_from_parent_merges_fields() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry
            .register_schema(
                CategorySchema::new("monitor", "Monitor", "1.0.0")
                    .with_field(
                        "resolution",
                        FieldDefinition::new(FieldType::String, "Resolution"),
                    )
                    .with_field("size", FieldDefinition::new(FieldType::Number, "Size"))
                    .with_required_field("resolution"),
            )
            .await
            .unwrap();

        // child overrides `size` and adds its own field
        let child = CategorySchema::new("gaming_monitor", "Gaming Monitor", "1.0.0")
            .with_parent("monitor")
            .with_field(
                "size",
                FieldDefinition::new(FieldType::Number, "Diagonal Size"),
            )
            .with_field(
                "refresh_rate",
                FieldDefinition::new(FieldType::Number, "Refresh Rate"),
            )
            .with_required_field("refresh_rate");

        let merged = registry.inherit_from_parent(&child).unwrap();
        assert_eq!(merged.fields.len(), 3);
        assert_eq!(merged.fields["size"].metadata.label, "Diagonal Size");
        assert_eq!(merged.inherited_fields, vec!["resolution"]);
        assert!(merged.required_fields.contains("resolution"));
        assert!(merged.required_fields.contains("refresh_rate"));
    }

    #[tokio::test]
    async fn test_inherit_without_parent_is_unchanged() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        let schema = monitor_schema();
        let merged = registry.inherit_from_parent(&schema).unwrap();
        assert_eq!(merged, schema);
    }

    #[tokio::test]
    async fn test_schema_hierarchy() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry.register_schema(monitor_schema()).await.unwrap();
        registry
            .register_schema(
                CategorySchema::new("gaming_monitor", "Gaming Monitor", "1.0.0")
                    .with_parent("monitor")
                    .with_field("hdr", FieldDefinition::new(FieldType::Boolean, "HDR")),
            )
            .await
            .unwrap();
        registry
            .register_schema(
                CategorySchema::new("office_monitor", "Office Monitor", "1.0.0")
                    .with_parent("monitor")
                    .with_field("pivot", FieldDefinition::new(FieldType::Boolean, "Pivot")),
            )
            .await
            .unwrap();

        let hierarchy = registry.get_schema_hierarchy();
        assert_eq!(
            hierarchy[&CategoryId::new("monitor")],
            vec![
                CategoryId::new("gaming_monitor"),
                CategoryId::new("office_monitor")
            ]
        );
    }

    // ==== Update Tests ====

    #[tokio::test]
    async fn test_update_schema_bumps_minor_by_default() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry.register_schema(monitor_schema()).await.unwrap();

        let updated = registry
            .update_schema(
                &CategoryId::new("monitor"),
                SchemaUpdate::new().with_name("Desktop Monitor"),
                Vec::new(),
            )
            .await
            .unwrap();
        assert_eq!(updated.version, "1.1.0");
        assert_eq!(updated.name, "Desktop Monitor");
        // the update becomes the current schema
        assert_eq!(
            registry.get_schema(&CategoryId::new("monitor")).unwrap().version,
            "1.1.0"
        );
    }

    #[tokio::test]
    async fn test_update_schema_with_explicit_bump() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry.register_schema(monitor_schema()).await.unwrap();

        let updated = registry
            .update_schema(
                &CategoryId::new("monitor"),
                SchemaUpdate::new().with_bump(VersionBump::Major),
                Vec::new(),
            )
            .await
            .unwrap();
        assert_eq!(updated.version, "2.0.0");
    }

    #[tokio::test]
    async fn test_update_missing_category_is_not_found() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        let result = registry
            .update_schema(&CategoryId::new("ghost"), SchemaUpdate::new(), Vec::new())
            .await;
        assert!(matches!(result, Err(SpecError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_with_operations_records_migration() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry.register_schema(monitor_schema()).await.unwrap();

        let category = CategoryId::new("monitor");
        let mut fields = registry.get_schema(&category).unwrap().fields;
        fields.insert(
            "hdr".into(),
            FieldDefinition::new(FieldType::Boolean, "HDR"),
        );
        let operations = vec![MigrationOperation::AddField {
            field: "hdr".into(),
            definition: Box::new(FieldDefinition::new(FieldType::Boolean, "HDR")),
        }];

        registry
            .update_schema(
                &category,
                SchemaUpdate::new().with_fields(fields),
                operations,
            )
            .await
            .unwrap();

        let pending = registry.get_pending_migrations(&category);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].from_version, "1.0.0");
        assert_eq!(pending[0].to_version, "1.1.0");
    }

    #[tokio::test]
    async fn test_update_rejecting_invalid_result() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry.register_schema(monitor_schema()).await.unwrap();

        let mut required = BTreeSet::new();
        required.insert("nonexistent".to_string());
        let result = registry
            .update_schema(
                &CategoryId::new("monitor"),
                SchemaUpdate {
                    required_fields: Some(required),
                    ..Default::default()
                },
                Vec::new(),
            )
            .await;
        assert!(matches!(result, Err(SpecError::Structural(_))));
        // current schema untouched
        assert_eq!(
            registry.get_schema(&CategoryId::new("monitor")).unwrap().version,
            "1.0.0"
        );
    }

    // ==== Template Tests ====

    #[tokio::test]
    async fn test_create_category_from_template() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        let schema = registry
            .create_category_from_template("monitor", "office_monitor", None)
            .await
            .unwrap();

        assert_eq!(schema.version, "1.0.0");
        assert_eq!(schema.id.as_str(), "office_monitor");
        assert!(schema.has_field("resolution"));
        assert!(registry.get_schema(&CategoryId::new("office_monitor")).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_template_is_not_found() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        let result = registry
            .create_category_from_template("toaster", "toaster", None)
            .await;
        assert!(matches!(result, Err(SpecError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_builtin_templates_registered_by_default() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        assert_eq!(
            registry.template_names(),
            vec!["gaming_console", "headphones", "monitor"]
        );
    }

    #[tokio::test]
    async fn test_builtin_templates_can_be_disabled() {
        let registry = SchemaRegistry::with_storage(
            Arc::new(MemoryStore::new()),
            RegistryConfig::memory().with_builtin_templates(false),
        );
        assert!(registry.template_names().is_empty());

        registry.add_template(CategoryTemplate::new("webcam", "Webcam", "USB webcams"));
        assert_eq!(registry.template_names(), vec!["webcam"]);
    }

    // ==== Filter Tests ====

    #[tokio::test]
    async fn test_get_all_schemas_excludes_deprecated_by_default() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry.register_schema(monitor_schema()).await.unwrap();
        let mut old = CategorySchema::new("crt", "CRT Monitor", "1.0.0")
            .with_field("size", FieldDefinition::new(FieldType::Number, "Size"));
        old.deprecated = true;
        registry.register_schema(old).await.unwrap();

        assert_eq!(registry.get_all_schemas(None).len(), 1);
        assert_eq!(
            registry
                .get_all_schemas(Some(&SchemaFilter {
                    include_deprecated: true,
                    ..Default::default()
                }))
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_get_all_schemas_filters_by_parent() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry.register_schema(monitor_schema()).await.unwrap();
        registry
            .register_schema(
                CategorySchema::new("gaming_monitor", "Gaming Monitor", "1.0.0")
                    .with_parent("monitor")
                    .with_field("hdr", FieldDefinition::new(FieldType::Boolean, "HDR")),
            )
            .await
            .unwrap();

        let children = registry.get_all_schemas(Some(&SchemaFilter {
            parent_id: Some(CategoryId::new("monitor")),
            ..Default::default()
        }));
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id.as_str(), "gaming_monitor");
    }

    // ==== Migration Surface Tests ====

    #[tokio::test]
    async fn test_create_and_apply_migration() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry_over(store.clone());
        registry.register_schema(monitor_schema()).await.unwrap();

        let spec = DeviceSpecification::new("dev-1", "monitor", "1.0.0")
            .with_value("resolution", json!("2560x1440"))
            .with_value("refresh_rate", json!(144))
            .with_confidence("refresh_rate", 0.8);
        store.save_device_specification(&spec).await.unwrap();

        let category = CategoryId::new("monitor");
        let migration = registry
            .create_migration(
                &category,
                "1.0.0",
                "1.1.0",
                vec![
                    MigrationOperation::RenameField {
                        from: "refresh_rate".into(),
                        to: "max_refresh_rate".into(),
                    },
                    MigrationOperation::AddField {
                        field: "hdr".into(),
                        definition: Box::new(
                            FieldDefinition::new(FieldType::Boolean, "HDR")
                                .with_default_value(json!(false))
                                .indexable(),
                        ),
                    },
                ],
            )
            .await
            .unwrap();

        let outcome = registry.apply_migration(&migration.id).await.unwrap();
        assert_eq!(outcome.devices_migrated, 1);
        assert_eq!(outcome.index_names, vec!["idx_monitor_hdr"]);

        let migrated = store
            .load_device_specification(&crate::types::DeviceId::new("dev-1"))
            .await
            .unwrap();
        assert_eq!(migrated.schema_version, "1.1.0");
        assert_eq!(migrated.specifications["max_refresh_rate"], json!(144));
        assert_eq!(migrated.confidence_scores["max_refresh_rate"], 0.8);
        assert_eq!(migrated.specifications["hdr"], json!(false));

        assert!(registry.get_pending_migrations(&category).is_empty());
    }

    #[tokio::test]
    async fn test_apply_migration_twice_fails() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry.register_schema(monitor_schema()).await.unwrap();

        let migration = registry
            .create_migration(&CategoryId::new("monitor"), "1.0.0", "1.1.0", Vec::new())
            .await
            .unwrap();
        registry.apply_migration(&migration.id).await.unwrap();

        let result = registry.apply_migration(&migration.id).await;
        assert!(matches!(result, Err(SpecError::AlreadyApplied(_))));
    }

    #[tokio::test]
    async fn test_apply_missing_migration_is_not_found() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        let result = registry.apply_migration("ghost").await;
        assert!(matches!(result, Err(SpecError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_migration_for_unknown_category_fails() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        let result = registry
            .create_migration(&CategoryId::new("ghost"), "1.0.0", "1.1.0", Vec::new())
            .await;
        assert!(matches!(result, Err(SpecError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rollback_is_not_implemented() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        let result = registry.rollback_migration("any").await;
        match result {
            Err(SpecError::NotImplemented(what)) => assert_eq!(what, "migration rollback"),
            other => panic!("expected NotImplemented, got {other:?}"),
        }
    }

    // ==== Stats Tests ====

    #[tokio::test]
    async fn test_stats_counters() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry.register_schema(monitor_schema()).await.unwrap();
        let migration = registry
            .create_migration(&CategoryId::new("monitor"), "1.0.0", "1.1.0", Vec::new())
            .await
            .unwrap();
        registry
            .create_migration(&CategoryId::new("monitor"), "1.1.0", "1.2.0", Vec::new())
            .await
            .unwrap();
        registry.apply_migration(&migration.id).await.unwrap();

        let stats = registry.stats();
        assert_eq!(stats.schemas, 1);
        assert_eq!(stats.migrations, 2);
        assert_eq!(stats.pending_migrations, 1);
        assert_eq!(stats.templates, 3);
    }

    // ==== Validation Dispatch Tests ====

    #[tokio::test]
    async fn test_validate_specification_through_registry() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry
            .register_schema(
                CategorySchema::new("psu", "Power Supply", "1.0.0").with_field(
                    "power",
                    FieldDefinition::new(FieldType::Number, "Power").with_constraints(
                        FieldConstraints {
                            min: Some(0.0),
                            ..Default::default()
                        },
                    ),
                ),
            )
            .await
            .unwrap();

        let spec = DeviceSpecification::new("dev-1", "psu", "1.0.0")
            .with_value("power", json!(-5));
        let report = registry.validate_specification(&spec).unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.field_errors.len(), 1);
        assert_eq!(
            report.field_errors[0].code,
            crate::types::ViolationCode::MinValueViolation
        );
    }

    #[tokio::test]
    async fn test_update_preserves_unrelated_fields() {
        let registry = registry_over(Arc::new(MemoryStore::new()));
        registry.register_schema(monitor_schema()).await.unwrap();

        let updated = registry
            .update_schema(
                &CategoryId::new("monitor"),
                SchemaUpdate::new().with_deprecated(true),
                Vec::new(),
            )
            .await
            .unwrap();
        assert!(updated.deprecated);
        assert!(updated.has_field("resolution"));
        assert!(updated.required_fields.contains("resolution"));
    }
}
