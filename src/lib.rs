//! # fitspec
//!
//! Schema registry, migration engine, and compatibility scoring for
//! open-ended device specifications.
//!
//! Device categories carry an open-ended, versioned set of typed attributes
//! instead of a fixed relational schema. `fitspec` validates device data
//! against those definitions, evolves the definitions over time via
//! migrations, and scores pairwise device compatibility with rule-based and
//! field-level evidence.
//!
//! ## Features
//!
//! - **Typed field definitions**: nine value types with constraints
//!   (bounds, lengths, patterns, enums) and scoring metadata
//! - **Structural and value validation**: schema integrity checks at
//!   registration, per-field violation codes for device data
//! - **Schema evolution**: structural diffing to migration operations,
//!   ordered application to schemas and stored specifications,
//!   migration-path search, breaking-change classification
//! - **Single-parent inheritance**: bounded cycle detection, child-wins
//!   field merging
//! - **Compatibility scoring**: pluggable rule processors combined with
//!   weighted per-field comparison
//! - **Safe rule conditions**: a typed expression AST evaluated by an
//!   interpreter, never dynamically executed code
//! - **Storage backends**: in-memory for embedding and tests, one trait for
//!   everything else
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Schema Registry                         │
//! │  ├── registration, versioned updates, inheritance           │
//! │  ├── category templates                                     │
//! │  └── migration surface (create / apply / pending)           │
//! ├──────────────────────┬──────────────────────────────────────┤
//! │  Validator           │  Version Manager                     │
//! │  ├── schema checks   │  ├── semver arithmetic               │
//! │  └── value checks    │  ├── schema diffing                  │
//! │                      │  ├── operation application           │
//! │                      │  └── path search / safety            │
//! ├──────────────────────┴──────────────────────────────────────┤
//! │  Compatibility Engine                                       │
//! │  ├── rule processors (power ratio, expressions)             │
//! │  └── weighted field comparison                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Storage (SchemaStore trait)                                │
//! │  └── Memory (embedding / testing)                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fitspec::{
//!     CategorySchema, FieldDefinition, FieldType, RegistryConfig, SchemaRegistry,
//! };
//!
//! let registry = SchemaRegistry::new(RegistryConfig::memory()).await?;
//! registry.initialize().await?;
//!
//! let schema = CategorySchema::new("monitor", "Monitor", "1.0.0")
//!     .with_field(
//!         "resolution",
//!         FieldDefinition::new(FieldType::String, "Resolution"),
//!     )
//!     .with_required_field("resolution");
//! registry.register_schema(schema).await?;
//! ```

pub mod compatibility;
pub mod config;
pub mod error;
pub mod expr;
pub mod fingerprint;
pub mod migration;
pub mod pipeline;
pub mod registry;
pub mod storage;
pub mod templates;
pub mod types;
pub mod validator;
pub mod version;

pub use compatibility::{
    CompatibilityEngine, CompatibilityReport, ExpressionProcessor, FieldComparison,
    PowerRatioProcessor, ProcessorRegistry, ProcessorVerdict, RuleContext, RuleOutcome,
    RuleProcessor,
};
pub use config::{RegistryConfig, StorageConfig};
pub use error::{SpecError, SpecResult};
pub use expr::Condition;
pub use migration::{
    apply_operations, breaking_changes, diff_schemas, find_migration_path, is_safe_migration,
    migrate_specification, MAX_MIGRATION_HOPS,
};
pub use registry::{
    MigrationOutcome, RegistryStats, SchemaFilter, SchemaRegistry, SchemaUpdate,
};
pub use storage::{MemoryStore, SchemaStore, Storage};
pub use templates::{CategoryTemplate, TemplateCustomizations};
pub use types::{
    CategoryId, CategorySchema, CompatibilityRule, CompatibilityType, DeviceId,
    DeviceSpecification, FieldConstraints, FieldDefinition, FieldDelta, FieldError, FieldMetadata,
    FieldType, Importance, MigrationOperation, SchemaMigration, SchemaReport, Severity, SpecReport,
    ValidationRule, VerificationStatus, ViolationCode,
};
pub use validator::{Validator, ValidatorConfig};
pub use version::{compare_versions, increment_version, is_compatible_version, VersionBump};
