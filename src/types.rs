//! Core data model for category schemas, device specifications, and migrations

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SpecError;

/// JSON number from an `f64`, preferring integer representation when exact.
///
/// Non-finite input maps to null; JSON has no encoding for it.
pub(crate) fn json_number(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// Stable key identifying one device category (e.g. "monitor")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CategoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of one device instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// Field definitions
// ============================================================================

/// Closed set of field value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Enum,
    Array,
    Object,
    Date,
    Url,
    Email,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Enum => "enum",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Date => "date",
            FieldType::Url => "url",
            FieldType::Email => "email",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(FieldType::String),
            "number" => Ok(FieldType::Number),
            "boolean" => Ok(FieldType::Boolean),
            "enum" => Ok(FieldType::Enum),
            "array" => Ok(FieldType::Array),
            "object" => Ok(FieldType::Object),
            "date" => Ok(FieldType::Date),
            "url" => Ok(FieldType::Url),
            "email" => Ok(FieldType::Email),
            _ => Err(SpecError::Structural(format!("unknown field type: {s}"))),
        }
    }
}

/// How much a field matters when presenting or scoring a device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Value constraints attached to a field definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraints {
    /// Field must be present on every specification
    #[serde(default)]
    pub required: bool,
    /// Minimum numeric value (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum numeric value (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Minimum string length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum string length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regex the string value must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Ordered list of allowed values for enum fields
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    /// Unit of measurement (informational, used by pipeline plugins)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl FieldConstraints {
    pub fn is_empty(&self) -> bool {
        !self.required
            && self.min.is_none()
            && self.max.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
            && self.allowed_values.is_none()
            && self.unit.is_none()
    }
}

/// Presentation and scoring metadata for a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Human-readable field name (always required)
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub importance: Importance,
    /// Weight in 0..1 applied during compatibility scoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub indexable: bool,
    #[serde(default)]
    pub deprecated: bool,
}

impl FieldMetadata {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
            importance: Importance::default(),
            weight: None,
            searchable: false,
            indexable: false,
            deprecated: false,
        }
    }

    /// Weight used in compatibility scoring, defaulting to 1.0
    pub fn scoring_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}

/// One attribute's contract within a category schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "FieldConstraints::is_empty")]
    pub constraints: FieldConstraints,
    pub metadata: FieldMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub computed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_function: Option<String>,
}

impl FieldDefinition {
    pub fn new(field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            field_type,
            constraints: FieldConstraints::default(),
            metadata: FieldMetadata::new(label),
            default_value: None,
            computed: false,
            compute_function: None,
        }
    }

    pub fn with_constraints(mut self, constraints: FieldConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.metadata.weight = Some(weight);
        self
    }

    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.metadata.importance = importance;
        self
    }

    pub fn with_default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.constraints.unit = Some(unit.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.constraints.required = true;
        self
    }

    pub fn indexable(mut self) -> Self {
        self.metadata.indexable = true;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.metadata.searchable = true;
        self
    }
}

// ============================================================================
// Rules
// ============================================================================

/// Severity of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Schema-declared boolean check over a specification's field map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub id: String,
    pub name: String,
    /// Boolean expression over the specification's fields
    pub condition: String,
    pub error_message: String,
    pub severity: Severity,
}

impl ValidationRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        condition: impl Into<String>,
        error_message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            condition: condition.into(),
            error_message: error_message.into(),
            severity,
        }
    }
}

/// Compatibility verdict bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityType {
    Full,
    Partial,
    None,
}

impl CompatibilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompatibilityType::Full => "full",
            CompatibilityType::Partial => "partial",
            CompatibilityType::None => "none",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CompatibilityType::Full => 2,
            CompatibilityType::Partial => 1,
            CompatibilityType::None => 0,
        }
    }

    /// The weaker of two verdicts; aggregation downgrades, never upgrades
    pub fn weaker(self, other: Self) -> Self {
        if self.rank() <= other.rank() {
            self
        } else {
            other
        }
    }

    /// Numeric contribution to the weighted field score
    pub fn score(&self) -> f64 {
        match self {
            CompatibilityType::Full => 1.0,
            CompatibilityType::Partial => 0.5,
            CompatibilityType::None => 0.0,
        }
    }

    /// Bucket a weighted score: >= 0.8 is full, >= 0.3 is partial
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            CompatibilityType::Full
        } else if score >= 0.3 {
            CompatibilityType::Partial
        } else {
            CompatibilityType::None
        }
    }
}

impl fmt::Display for CompatibilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category-declared, field-pair-specific compatibility check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityRule {
    pub id: String,
    /// Processor name; unknown names fall back to the expression processor
    pub name: String,
    pub source_field: String,
    pub target_field: String,
    /// Expression over `source`, `target`, `source_spec.*`, `target_spec.*`
    pub condition: String,
    pub compatibility_type: CompatibilityType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limitations: Vec<String>,
}

impl CompatibilityRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source_field: impl Into<String>,
        target_field: impl Into<String>,
        condition: impl Into<String>,
        compatibility_type: CompatibilityType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_field: source_field.into(),
            target_field: target_field.into(),
            condition: condition.into(),
            compatibility_type,
            message: message.into(),
            limitations: Vec::new(),
        }
    }

    pub fn with_limitation(mut self, limitation: impl Into<String>) -> Self {
        self.limitations.push(limitation.into());
        self
    }
}

// ============================================================================
// Category schema
// ============================================================================

/// One versioned field-set definition for a device category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySchema {
    pub id: CategoryId,
    pub name: String,
    /// Semver string; missing components compare as zero
    pub version: String,
    /// Single-parent inheritance link; the chain must be acyclic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
    pub fields: BTreeMap<String, FieldDefinition>,
    /// Every entry must name a key of `fields`
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_fields: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compatibility_rules: Vec<CompatibilityRule>,
    /// Field names merged down from the parent by inheritance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherited_fields: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategorySchema {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>, version: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            parent_id: None,
            fields: BTreeMap::new(),
            required_fields: BTreeSet::new(),
            validation_rules: Vec::new(),
            compatibility_rules: Vec::new(),
            inherited_fields: Vec::new(),
            deprecated: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<CategoryId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.insert(name.into(), definition);
        self
    }

    pub fn with_required_field(mut self, name: impl Into<String>) -> Self {
        self.required_fields.insert(name.into());
        self
    }

    pub fn with_validation_rule(mut self, rule: ValidationRule) -> Self {
        self.validation_rules.push(rule);
        self
    }

    pub fn with_compatibility_rule(mut self, rule: CompatibilityRule) -> Self {
        self.compatibility_rules.push(rule);
        self
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }
}

// ============================================================================
// Device specification
// ============================================================================

/// Per-field verification state of a specification value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

/// One device's concrete values for a schema version.
///
/// The `confidence_scores`, `sources`, and `verification_status` maps are
/// keyed per field and stay in lock-step with `specifications`; migration
/// operations move or delete entries in all of them together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpecification {
    pub device_id: DeviceId,
    pub category_id: CategoryId,
    pub schema_version: String,
    pub specifications: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub computed_values: BTreeMap<String, Value>,
    /// Per-field confidence in 0..1
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub confidence_scores: BTreeMap<String, f64>,
    /// Per-field data origin
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub verification_status: BTreeMap<String, VerificationStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeviceSpecification {
    pub fn new(
        device_id: impl Into<DeviceId>,
        category_id: impl Into<CategoryId>,
        schema_version: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            device_id: device_id.into(),
            category_id: category_id.into(),
            schema_version: schema_version.into(),
            specifications: BTreeMap::new(),
            computed_values: BTreeMap::new(),
            confidence_scores: BTreeMap::new(),
            sources: BTreeMap::new(),
            verification_status: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_value(mut self, field: impl Into<String>, value: Value) -> Self {
        self.specifications.insert(field.into(), value);
        self
    }

    pub fn with_confidence(mut self, field: impl Into<String>, score: f64) -> Self {
        self.confidence_scores.insert(field.into(), score);
        self
    }

    pub fn with_source(mut self, field: impl Into<String>, source: impl Into<String>) -> Self {
        self.sources.insert(field.into(), source.into());
        self
    }

    pub fn with_verification(mut self, field: impl Into<String>, status: VerificationStatus) -> Self {
        self.verification_status.insert(field.into(), status);
        self
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.specifications.get(field)
    }
}

// ============================================================================
// Migrations
// ============================================================================

/// Per-key override payload of a `modify_field` operation.
///
/// Only keys whose serialized form differs between the old and new definition
/// are set; merging replaces each present key wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDelta {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<FieldConstraints>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FieldMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_function: Option<String>,
}

impl FieldDelta {
    pub fn is_empty(&self) -> bool {
        self.field_type.is_none()
            && self.constraints.is_none()
            && self.metadata.is_none()
            && self.default_value.is_none()
            && self.computed.is_none()
            && self.compute_function.is_none()
    }
}

/// One step of a schema migration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MigrationOperation {
    AddField {
        field: String,
        definition: Box<FieldDefinition>,
    },
    RemoveField {
        field: String,
    },
    ModifyField {
        field: String,
        changes: FieldDelta,
    },
    RenameField {
        from: String,
        to: String,
    },
    AddValidationRule {
        rule: ValidationRule,
    },
    RemoveValidationRule {
        rule_id: String,
    },
    AddCompatibilityRule {
        rule: CompatibilityRule,
    },
    RemoveCompatibilityRule {
        rule_id: String,
    },
}

impl MigrationOperation {
    /// Wire name of the operation kind
    pub fn op_name(&self) -> &'static str {
        match self {
            MigrationOperation::AddField { .. } => "add_field",
            MigrationOperation::RemoveField { .. } => "remove_field",
            MigrationOperation::ModifyField { .. } => "modify_field",
            MigrationOperation::RenameField { .. } => "rename_field",
            MigrationOperation::AddValidationRule { .. } => "add_validation_rule",
            MigrationOperation::RemoveValidationRule { .. } => "remove_validation_rule",
            MigrationOperation::AddCompatibilityRule { .. } => "add_compatibility_rule",
            MigrationOperation::RemoveCompatibilityRule { .. } => "remove_compatibility_rule",
        }
    }

    /// Field or rule id the operation targets
    pub fn target(&self) -> &str {
        match self {
            MigrationOperation::AddField { field, .. } => field,
            MigrationOperation::RemoveField { field } => field,
            MigrationOperation::ModifyField { field, .. } => field,
            MigrationOperation::RenameField { from, .. } => from,
            MigrationOperation::AddValidationRule { rule } => &rule.id,
            MigrationOperation::RemoveValidationRule { rule_id } => rule_id,
            MigrationOperation::AddCompatibilityRule { rule } => &rule.id,
            MigrationOperation::RemoveCompatibilityRule { rule_id } => rule_id,
        }
    }
}

/// Ordered operation list transforming a category schema between versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMigration {
    pub id: String,
    pub category_id: CategoryId,
    pub from_version: String,
    pub to_version: String,
    pub operations: Vec<MigrationOperation>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

impl SchemaMigration {
    pub fn new(
        id: impl Into<String>,
        category_id: impl Into<CategoryId>,
        from_version: impl Into<String>,
        to_version: impl Into<String>,
        operations: Vec<MigrationOperation>,
    ) -> Self {
        Self {
            id: id.into(),
            category_id: category_id.into(),
            from_version: from_version.into(),
            to_version: to_version.into(),
            operations,
            created_at: Utc::now(),
            applied_at: None,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

// ============================================================================
// Validation reports
// ============================================================================

/// Stable codes identifying field-level validation findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    RequiredFieldMissing,
    UndefinedField,
    InvalidType,
    MinLengthViolation,
    MaxLengthViolation,
    PatternViolation,
    MinValueViolation,
    MaxValueViolation,
    EnumViolation,
    RuleViolation,
    VersionMismatch,
}

impl ViolationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationCode::RequiredFieldMissing => "REQUIRED_FIELD_MISSING",
            ViolationCode::UndefinedField => "UNDEFINED_FIELD",
            ViolationCode::InvalidType => "INVALID_TYPE",
            ViolationCode::MinLengthViolation => "MIN_LENGTH_VIOLATION",
            ViolationCode::MaxLengthViolation => "MAX_LENGTH_VIOLATION",
            ViolationCode::PatternViolation => "PATTERN_VIOLATION",
            ViolationCode::MinValueViolation => "MIN_VALUE_VIOLATION",
            ViolationCode::MaxValueViolation => "MAX_VALUE_VIOLATION",
            ViolationCode::EnumViolation => "ENUM_VIOLATION",
            ViolationCode::RuleViolation => "RULE_VIOLATION",
            ViolationCode::VersionMismatch => "VERSION_MISMATCH",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One field-level validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub code: ViolationCode,
    pub message: String,
    pub severity: Severity,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        code: ViolationCode,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
            severity,
        }
    }
}

/// Result of validating a schema's structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaReport {
    pub errors: Vec<String>,
}

impl SchemaReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

/// Result of validating a specification against a schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecReport {
    pub field_errors: Vec<FieldError>,
}

impl SpecReport {
    /// Valid iff no error-severity finding exists; warnings and infos pass
    pub fn is_valid(&self) -> bool {
        !self
            .field_errors
            .iter()
            .any(|e| e.severity == Severity::Error)
    }

    pub fn add(&mut self, error: FieldError) {
        self.field_errors.push(error);
    }

    pub fn errors(&self) -> impl Iterator<Item = &FieldError> {
        self.field_errors
            .iter()
            .filter(|e| e.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &FieldError> {
        self.field_errors
            .iter()
            .filter(|e| e.severity == Severity::Warning)
    }
}
