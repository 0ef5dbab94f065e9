//! Registry configuration

use crate::version::VersionBump;
use serde::{Deserialize, Serialize};

/// Configuration for the schema registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Storage backend configuration
    pub storage: StorageConfig,

    /// Version component bumped by `update_schema` when the caller does not
    /// pick one
    #[serde(default)]
    pub default_bump: VersionBump,

    /// Escalate warning-severity validation findings to errors
    #[serde(default)]
    pub warnings_as_errors: bool,

    /// Hop limit for migration path search before a cycle is reported
    #[serde(default = "default_max_migration_hops")]
    pub max_migration_hops: usize,

    /// Seed the template table with the built-in category templates
    #[serde(default = "default_true")]
    pub register_builtin_templates: bool,
}

fn default_max_migration_hops() -> usize {
    crate::migration::MAX_MIGRATION_HOPS
}

fn default_true() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::Memory,
            default_bump: VersionBump::default(),
            warnings_as_errors: false,
            max_migration_hops: default_max_migration_hops(),
            register_builtin_templates: true,
        }
    }
}

impl RegistryConfig {
    /// Create config with in-memory storage
    pub fn memory() -> Self {
        Self {
            storage: StorageConfig::Memory,
            ..Default::default()
        }
    }

    /// Set the default version bump kind
    pub fn with_default_bump(mut self, bump: VersionBump) -> Self {
        self.default_bump = bump;
        self
    }

    /// Treat warnings as errors during validation
    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    /// Set the migration path hop limit
    pub fn with_max_migration_hops(mut self, hops: usize) -> Self {
        self.max_migration_hops = hops;
        self
    }

    /// Enable or disable built-in template registration
    pub fn with_builtin_templates(mut self, enabled: bool) -> Self {
        self.register_builtin_templates = enabled;
        self
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (default; embedding and tests)
    #[default]
    Memory,
}
