//! Error types for the specification schema engine

use thiserror::Error;

use crate::expr::ExprError;

/// Stable numeric error codes surfaced to API callers.
///
/// The 4xx-range codes describe rejected input, the 5xx-range codes describe
/// engine or collaborator failures.
pub mod error_codes {
    /// Category, schema, device, migration, or template not found
    pub const NOT_FOUND: u32 = 40401;
    /// Schema structure failed validation
    pub const STRUCTURAL: u32 = 42201;
    /// Version string does not parse
    pub const INVALID_VERSION: u32 = 42202;
    /// Parent chain contains a cycle
    pub const CIRCULAR_INHERITANCE: u32 = 42203;
    /// Rule condition failed to parse or evaluate
    pub const EXPRESSION: u32 = 42204;
    /// Migration has already been applied
    pub const MIGRATION_ALREADY_APPLIED: u32 = 40901;
    /// No migration chain connects the requested versions
    pub const NO_MIGRATION_PATH: u32 = 40902;
    /// Migration chain exceeded the hop limit
    pub const CIRCULAR_MIGRATION: u32 = 40903;
    /// A migration operation could not be applied
    pub const OPERATION_FAILED: u32 = 40904;
    /// Storage backend failure
    pub const STORAGE_ERROR: u32 = 50001;
    /// Serialization failure
    pub const SERIALIZATION_ERROR: u32 = 50002;
    /// Operation is not implemented
    pub const NOT_IMPLEMENTED: u32 = 50101;
}

/// Errors produced by the schema engine
#[derive(Debug, Error)]
pub enum SpecError {
    /// Category, schema, device, migration, or template not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Schema structure is invalid; carries the validation findings
    #[error("Invalid schema: {0}")]
    Structural(String),

    /// Version string does not match the lenient semver grammar
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// Registering the schema would create an inheritance cycle
    #[error("Circular inheritance detected at category '{0}'")]
    CircularInheritance(String),

    /// Rule condition failed to parse or evaluate
    #[error("Expression error: {0}")]
    Expression(#[from] ExprError),

    /// Migration was already applied and cannot be applied again
    #[error("Migration '{0}' has already been applied")]
    AlreadyApplied(String),

    /// No chain of migrations connects the two versions
    #[error("No migration path found from {from} to {to}")]
    NoMigrationPath { from: String, to: String },

    /// Migration chain exceeded the hop limit, indicating a cycle
    #[error("Circular migration chain detected after {0} hops")]
    CircularMigration(usize),

    /// A migration operation could not be applied to its target
    #[error("Migration operation '{op}' failed on field '{field}': {reason}")]
    OperationFailed {
        op: String,
        field: String,
        reason: String,
    },

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation exists on the surface but is not implemented
    #[error("{0} is not yet implemented")]
    NotImplemented(String),
}

impl SpecError {
    /// Stable numeric code for this error
    pub fn error_code(&self) -> u32 {
        match self {
            Self::NotFound(_) => error_codes::NOT_FOUND,
            Self::Structural(_) => error_codes::STRUCTURAL,
            Self::InvalidVersion(_) => error_codes::INVALID_VERSION,
            Self::CircularInheritance(_) => error_codes::CIRCULAR_INHERITANCE,
            Self::Expression(_) => error_codes::EXPRESSION,
            Self::AlreadyApplied(_) => error_codes::MIGRATION_ALREADY_APPLIED,
            Self::NoMigrationPath { .. } => error_codes::NO_MIGRATION_PATH,
            Self::CircularMigration(_) => error_codes::CIRCULAR_MIGRATION,
            Self::OperationFailed { .. } => error_codes::OPERATION_FAILED,
            Self::Storage(_) => error_codes::STORAGE_ERROR,
            Self::Serialization(_) => error_codes::SERIALIZATION_ERROR,
            Self::NotImplemented(_) => error_codes::NOT_IMPLEMENTED,
        }
    }

    /// HTTP status an API layer should map this error to
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Structural(_)
            | Self::InvalidVersion(_)
            | Self::CircularInheritance(_)
            | Self::Expression(_) => 422,
            Self::AlreadyApplied(_)
            | Self::NoMigrationPath { .. }
            | Self::CircularMigration(_)
            | Self::OperationFailed { .. } => 409,
            Self::Storage(_) | Self::Serialization(_) => 500,
            Self::NotImplemented(_) => 501,
        }
    }
}

impl From<serde_json::Error> for SpecError {
    fn from(err: serde_json::Error) -> Self {
        SpecError::Serialization(err.to_string())
    }
}

/// Result type for schema engine operations
pub type SpecResult<T> = Result<T, SpecError>;
