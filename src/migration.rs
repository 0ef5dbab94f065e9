//! Schema diffing, migration application, path search, and safety
//! classification.
//!
//! Operations within one migration are applied strictly in list order; a
//! `rename_field` followed by a `modify_field` referencing the new name
//! depends on that ordering.

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::error::{SpecError, SpecResult};
use crate::fingerprint;
use crate::types::{
    CategorySchema, DeviceSpecification, FieldDefinition, FieldDelta, FieldType,
    MigrationOperation, SchemaMigration,
};
use crate::version;

/// Path search gives up after this many hops and reports a cycle
pub const MAX_MIGRATION_HOPS: usize = 100;

// ============================================================================
// Diffing
// ============================================================================

/// Compute the operations transforming `from` into `to`.
///
/// Field additions come first, then modifications, then removals; the same
/// added/removed diff is repeated for validation rules and compatibility
/// rules by rule id. Definitions compare by canonical fingerprint, so key
/// order never produces a spurious modification.
pub fn diff_schemas(
    from: &CategorySchema,
    to: &CategorySchema,
) -> SpecResult<Vec<MigrationOperation>> {
    let mut operations = Vec::new();

    for (name, definition) in &to.fields {
        if !from.fields.contains_key(name) {
            operations.push(MigrationOperation::AddField {
                field: name.clone(),
                definition: Box::new(definition.clone()),
            });
        }
    }

    for (name, to_def) in &to.fields {
        if let Some(from_def) = from.fields.get(name) {
            if fingerprint::fingerprint_field(from_def)? != fingerprint::fingerprint_field(to_def)?
            {
                let changes = field_delta(from_def, to_def);
                if !changes.is_empty() {
                    operations.push(MigrationOperation::ModifyField {
                        field: name.clone(),
                        changes,
                    });
                }
            }
        }
    }

    for name in from.fields.keys() {
        if !to.fields.contains_key(name) {
            operations.push(MigrationOperation::RemoveField {
                field: name.clone(),
            });
        }
    }

    for rule in &to.validation_rules {
        if !from.validation_rules.iter().any(|r| r.id == rule.id) {
            operations.push(MigrationOperation::AddValidationRule { rule: rule.clone() });
        }
    }
    for rule in &from.validation_rules {
        if !to.validation_rules.iter().any(|r| r.id == rule.id) {
            operations.push(MigrationOperation::RemoveValidationRule {
                rule_id: rule.id.clone(),
            });
        }
    }

    for rule in &to.compatibility_rules {
        if !from.compatibility_rules.iter().any(|r| r.id == rule.id) {
            operations.push(MigrationOperation::AddCompatibilityRule { rule: rule.clone() });
        }
    }
    for rule in &from.compatibility_rules {
        if !to.compatibility_rules.iter().any(|r| r.id == rule.id) {
            operations.push(MigrationOperation::RemoveCompatibilityRule {
                rule_id: rule.id.clone(),
            });
        }
    }

    debug!(
        from = %from.version,
        to = %to.version,
        operations = operations.len(),
        "Computed schema diff"
    );
    Ok(operations)
}

/// Delta containing only the top-level keys that differ between definitions
fn field_delta(from: &FieldDefinition, to: &FieldDefinition) -> FieldDelta {
    FieldDelta {
        field_type: (from.field_type != to.field_type).then_some(to.field_type),
        constraints: (from.constraints != to.constraints).then(|| to.constraints.clone()),
        metadata: (from.metadata != to.metadata).then(|| to.metadata.clone()),
        default_value: if from.default_value != to.default_value {
            to.default_value.clone()
        } else {
            None
        },
        computed: (from.computed != to.computed).then_some(to.computed),
        compute_function: if from.compute_function != to.compute_function {
            to.compute_function.clone()
        } else {
            None
        },
    }
}

// ============================================================================
// Application to schemas
// ============================================================================

/// Apply operations to a copy of the schema, in order
pub fn apply_operations(
    schema: &CategorySchema,
    operations: &[MigrationOperation],
) -> SpecResult<CategorySchema> {
    let mut next = schema.clone();
    for operation in operations {
        apply_to_schema(&mut next, operation)?;
    }
    next.updated_at = Utc::now();
    Ok(next)
}

fn apply_to_schema(schema: &mut CategorySchema, operation: &MigrationOperation) -> SpecResult<()> {
    match operation {
        MigrationOperation::AddField { field, definition } => {
            schema.fields.insert(field.clone(), (**definition).clone());
        }
        MigrationOperation::RemoveField { field } => {
            // removal is idempotent
            schema.fields.remove(field);
            schema.required_fields.remove(field);
        }
        MigrationOperation::ModifyField { field, changes } => {
            let definition =
                schema
                    .fields
                    .get_mut(field)
                    .ok_or_else(|| SpecError::OperationFailed {
                        op: "modify_field".into(),
                        field: field.clone(),
                        reason: "field does not exist".into(),
                    })?;
            merge_delta(definition, changes);
        }
        MigrationOperation::RenameField { from, to } => {
            let definition =
                schema
                    .fields
                    .remove(from)
                    .ok_or_else(|| SpecError::OperationFailed {
                        op: "rename_field".into(),
                        field: from.clone(),
                        reason: "field does not exist".into(),
                    })?;
            schema.fields.insert(to.clone(), definition);
            if schema.required_fields.remove(from) {
                schema.required_fields.insert(to.clone());
            }
        }
        MigrationOperation::AddValidationRule { rule } => {
            schema.validation_rules.push(rule.clone());
        }
        MigrationOperation::RemoveValidationRule { rule_id } => {
            schema.validation_rules.retain(|r| r.id != *rule_id);
        }
        MigrationOperation::AddCompatibilityRule { rule } => {
            schema.compatibility_rules.push(rule.clone());
        }
        MigrationOperation::RemoveCompatibilityRule { rule_id } => {
            schema.compatibility_rules.retain(|r| r.id != *rule_id);
        }
    }
    Ok(())
}

fn merge_delta(definition: &mut FieldDefinition, delta: &FieldDelta) {
    if let Some(field_type) = delta.field_type {
        definition.field_type = field_type;
    }
    if let Some(constraints) = &delta.constraints {
        definition.constraints = constraints.clone();
    }
    if let Some(metadata) = &delta.metadata {
        definition.metadata = metadata.clone();
    }
    if let Some(default_value) = &delta.default_value {
        definition.default_value = Some(default_value.clone());
    }
    if let Some(computed) = delta.computed {
        definition.computed = computed;
    }
    if let Some(compute_function) = &delta.compute_function {
        definition.compute_function = Some(compute_function.clone());
    }
}

// ============================================================================
// Application to stored specifications
// ============================================================================

/// Bring a stored specification forward across one migration.
///
/// The `specifications` map and its parallel per-field maps (computed values,
/// confidence scores, sources, verification status) are kept in lock-step:
/// removals and renames touch all of them together.
pub fn migrate_specification(
    spec: &DeviceSpecification,
    migration: &SchemaMigration,
) -> SpecResult<DeviceSpecification> {
    let mut next = spec.clone();
    next.schema_version = migration.to_version.clone();
    for operation in &migration.operations {
        apply_to_specification(&mut next, operation);
    }
    next.updated_at = Utc::now();
    debug!(
        device = %spec.device_id,
        migration = %migration.id,
        to_version = %migration.to_version,
        "Migrated specification"
    );
    Ok(next)
}

fn apply_to_specification(spec: &mut DeviceSpecification, operation: &MigrationOperation) {
    match operation {
        MigrationOperation::AddField { field, definition } => {
            if let Some(default) = &definition.default_value {
                spec.specifications.insert(field.clone(), default.clone());
            }
        }
        MigrationOperation::RemoveField { field } => {
            spec.specifications.remove(field);
            spec.computed_values.remove(field);
            spec.confidence_scores.remove(field);
            spec.sources.remove(field);
            spec.verification_status.remove(field);
        }
        MigrationOperation::RenameField { from, to } => {
            if let Some(value) = spec.specifications.remove(from) {
                spec.specifications.insert(to.clone(), value);
            }
            if let Some(value) = spec.computed_values.remove(from) {
                spec.computed_values.insert(to.clone(), value);
            }
            if let Some(value) = spec.confidence_scores.remove(from) {
                spec.confidence_scores.insert(to.clone(), value);
            }
            if let Some(value) = spec.sources.remove(from) {
                spec.sources.insert(to.clone(), value);
            }
            if let Some(value) = spec.verification_status.remove(from) {
                spec.verification_status.insert(to.clone(), value);
            }
        }
        MigrationOperation::ModifyField { field, changes } => {
            if let Some(new_type) = changes.field_type {
                if let Some(value) = spec.specifications.get(field).cloned() {
                    spec.specifications
                        .insert(field.clone(), coerce_value(&value, new_type));
                }
            }
        }
        // rule operations do not touch specification data
        MigrationOperation::AddValidationRule { .. }
        | MigrationOperation::RemoveValidationRule { .. }
        | MigrationOperation::AddCompatibilityRule { .. }
        | MigrationOperation::RemoveCompatibilityRule { .. } => {}
    }
}

/// Coerce an existing value to a newly declared field type.
///
/// Only string, number, and boolean targets coerce; other targets keep the
/// value untouched. An uncastable numeric coercion stores null.
fn coerce_value(value: &Value, target: FieldType) -> Value {
    match target {
        FieldType::String => match value {
            Value::String(_) => value.clone(),
            other => Value::String(other.to_string()),
        },
        FieldType::Number => match value {
            Value::Number(_) => value.clone(),
            Value::String(text) => match text.trim().parse::<f64>() {
                Ok(parsed) => crate::types::json_number(parsed),
                Err(_) => Value::Null,
            },
            Value::Bool(flag) => Value::from(if *flag { 1 } else { 0 }),
            _ => Value::Null,
        },
        FieldType::Boolean => Value::Bool(match value {
            Value::Bool(flag) => *flag,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Value::String(s) => !s.is_empty(),
            Value::Null => false,
            Value::Array(_) | Value::Object(_) => true,
        }),
        _ => value.clone(),
    }
}

// ============================================================================
// Path search
// ============================================================================

/// Greedily chain migrations from one version to another.
///
/// At each step the unique migration whose `from_version` semver-equals the
/// current version is followed. More than [`MAX_MIGRATION_HOPS`] hops means
/// the migration set loops.
pub fn find_migration_path<'a>(
    from: &str,
    to: &str,
    migrations: &'a [SchemaMigration],
) -> SpecResult<Vec<&'a SchemaMigration>> {
    find_migration_path_with_limit(from, to, migrations, MAX_MIGRATION_HOPS)
}

/// Path search with a caller-chosen hop limit
pub fn find_migration_path_with_limit<'a>(
    from: &str,
    to: &str,
    migrations: &'a [SchemaMigration],
    max_hops: usize,
) -> SpecResult<Vec<&'a SchemaMigration>> {
    let mut path = Vec::new();
    let mut current = from.to_string();
    let mut hops = 0usize;

    while !version::versions_equal(&current, to) {
        if hops >= max_hops {
            return Err(SpecError::CircularMigration(hops));
        }
        let next = migrations
            .iter()
            .find(|m| version::versions_equal(&m.from_version, &current))
            .ok_or_else(|| SpecError::NoMigrationPath {
                from: from.to_string(),
                to: to.to_string(),
            })?;
        path.push(next);
        current = next.to_version.clone();
        hops += 1;
    }

    Ok(path)
}

// ============================================================================
// Safety classification
// ============================================================================

/// Human-readable reasons an operation list would break existing consumers
pub fn breaking_changes(operations: &[MigrationOperation]) -> Vec<String> {
    let mut reasons = Vec::new();
    for operation in operations {
        match operation {
            MigrationOperation::RemoveField { field } => {
                reasons.push(format!("removes field '{field}'"));
            }
            MigrationOperation::RemoveValidationRule { rule_id } => {
                reasons.push(format!("removes validation rule '{rule_id}'"));
            }
            MigrationOperation::RemoveCompatibilityRule { rule_id } => {
                reasons.push(format!("removes compatibility rule '{rule_id}'"));
            }
            MigrationOperation::ModifyField { field, changes } => {
                if changes.field_type.is_some() {
                    reasons.push(format!("changes the type of field '{field}'"));
                }
                if let Some(constraints) = &changes.constraints {
                    if constraints.required {
                        reasons.push(format!("makes field '{field}' required"));
                    }
                    if constraints.min.is_some() || constraints.max.is_some() {
                        reasons.push(format!("tightens numeric bounds on field '{field}'"));
                    }
                    if constraints.pattern.is_some() {
                        reasons.push(format!("adds a pattern to field '{field}'"));
                    }
                }
            }
            MigrationOperation::AddField { .. }
            | MigrationOperation::RenameField { .. }
            | MigrationOperation::AddValidationRule { .. }
            | MigrationOperation::AddCompatibilityRule { .. } => {}
        }
    }
    reasons
}

/// Whether every operation in the list is non-breaking
pub fn is_safe_migration(operations: &[MigrationOperation]) -> bool {
    breaking_changes(operations).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldConstraints, Severity, ValidationRule};
    use serde_json::json;

    fn base_schema() -> CategorySchema {
        CategorySchema::new("monitor", "Monitor", "1.0.0")
            .with_field(
                "resolution",
                FieldDefinition::new(FieldType::String, "Resolution"),
            )
            .with_field(
                "refresh_rate",
                FieldDefinition::new(FieldType::Number, "Refresh Rate"),
            )
            .with_required_field("resolution")
    }

    // ==== Diff Tests ====

    #[test]
    fn test_diff_single_added_field() {
        let from = base_schema();
        let to = from
            .clone()
            .with_field("hdr", FieldDefinition::new(FieldType::Boolean, "HDR"));

        let operations = diff_schemas(&from, &to).unwrap();
        assert_eq!(operations.len(), 1);
        match &operations[0] {
            MigrationOperation::AddField { field, .. } => assert_eq!(field, "hdr"),
            other => panic!("expected add_field, got {other:?}"),
        }

        let applied = apply_operations(&from, &operations).unwrap();
        assert_eq!(applied.fields, to.fields);
    }

    #[test]
    fn test_diff_removed_field() {
        let from = base_schema();
        let mut to = from.clone();
        to.fields.remove("refresh_rate");

        let operations = diff_schemas(&from, &to).unwrap();
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].op_name(), "remove_field");
    }

    #[test]
    fn test_diff_modified_field_carries_only_changes() {
        let from = base_schema();
        let mut to = from.clone();
        if let Some(def) = to.fields.get_mut("refresh_rate") {
            def.constraints.min = Some(30.0);
            def.constraints.max = Some(500.0);
        }

        let operations = diff_schemas(&from, &to).unwrap();
        assert_eq!(operations.len(), 1);
        match &operations[0] {
            MigrationOperation::ModifyField { field, changes } => {
                assert_eq!(field, "refresh_rate");
                assert!(changes.constraints.is_some());
                assert!(changes.field_type.is_none());
                assert!(changes.metadata.is_none());
            }
            other => panic!("expected modify_field, got {other:?}"),
        }
    }

    #[test]
    fn test_diff_identical_schemas_is_empty() {
        let schema = base_schema();
        assert!(diff_schemas(&schema, &schema.clone()).unwrap().is_empty());
    }

    #[test]
    fn test_diff_rules_by_id() {
        let from = base_schema();
        let to = from.clone().with_validation_rule(ValidationRule::new(
            "vr-1",
            "sanity",
            "refresh_rate > 0",
            "refresh rate must be positive",
            Severity::Error,
        ));

        let operations = diff_schemas(&from, &to).unwrap();
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].op_name(), "add_validation_rule");

        let reverse = diff_schemas(&to, &from).unwrap();
        assert_eq!(reverse.len(), 1);
        assert_eq!(reverse[0].op_name(), "remove_validation_rule");
    }

    #[test]
    fn test_diff_roundtrip() {
        let from = base_schema();
        let mut to = from
            .clone()
            .with_field("hdr", FieldDefinition::new(FieldType::Boolean, "HDR"))
            .with_validation_rule(ValidationRule::new(
                "vr-1",
                "sanity",
                "refresh_rate > 0",
                "must be positive",
                Severity::Error,
            ));
        to.fields.remove("refresh_rate");
        if let Some(def) = to.fields.get_mut("resolution") {
            def.constraints.pattern = Some(r"^\d+x\d+$".into());
        }

        let operations = diff_schemas(&from, &to).unwrap();
        let applied = apply_operations(&from, &operations).unwrap();
        assert_eq!(applied.fields, to.fields);
        assert_eq!(applied.validation_rules, to.validation_rules);
        assert_eq!(applied.compatibility_rules, to.compatibility_rules);
    }

    // ==== Schema Application Tests ====

    #[test]
    fn test_remove_field_strips_required() {
        let schema = base_schema();
        let operations = vec![MigrationOperation::RemoveField {
            field: "resolution".into(),
        }];
        let applied = apply_operations(&schema, &operations).unwrap();
        assert!(!applied.fields.contains_key("resolution"));
        assert!(!applied.required_fields.contains("resolution"));
    }

    #[test]
    fn test_rename_field_updates_required() {
        let schema = base_schema();
        let operations = vec![MigrationOperation::RenameField {
            from: "resolution".into(),
            to: "native_resolution".into(),
        }];
        let applied = apply_operations(&schema, &operations).unwrap();
        assert!(applied.fields.contains_key("native_resolution"));
        assert!(!applied.fields.contains_key("resolution"));
        assert!(applied.required_fields.contains("native_resolution"));
        assert!(!applied.required_fields.contains("resolution"));
    }

    #[test]
    fn test_modify_missing_field_fails() {
        let schema = base_schema();
        let operations = vec![MigrationOperation::ModifyField {
            field: "brightness".into(),
            changes: FieldDelta {
                field_type: Some(FieldType::Number),
                ..Default::default()
            },
        }];
        match apply_operations(&schema, &operations) {
            Err(SpecError::OperationFailed { op, field, .. }) => {
                assert_eq!(op, "modify_field");
                assert_eq!(field, "brightness");
            }
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_rename_missing_field_fails() {
        let schema = base_schema();
        let operations = vec![MigrationOperation::RenameField {
            from: "brightness".into(),
            to: "luminance".into(),
        }];
        assert!(matches!(
            apply_operations(&schema, &operations),
            Err(SpecError::OperationFailed { .. })
        ));
    }

    #[test]
    fn test_remove_missing_field_is_noop() {
        let schema = base_schema();
        let operations = vec![MigrationOperation::RemoveField {
            field: "brightness".into(),
        }];
        let applied = apply_operations(&schema, &operations).unwrap();
        assert_eq!(applied.fields, schema.fields);
    }

    #[test]
    fn test_operations_apply_in_order() {
        // rename then modify through the new name
        let schema = base_schema();
        let operations = vec![
            MigrationOperation::RenameField {
                from: "refresh_rate".into(),
                to: "max_refresh_rate".into(),
            },
            MigrationOperation::ModifyField {
                field: "max_refresh_rate".into(),
                changes: FieldDelta {
                    constraints: Some(FieldConstraints {
                        max: Some(500.0),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            },
        ];
        let applied = apply_operations(&schema, &operations).unwrap();
        assert_eq!(
            applied.fields["max_refresh_rate"].constraints.max,
            Some(500.0)
        );
    }

    // ==== Specification Migration Tests ====

    fn base_spec() -> DeviceSpecification {
        DeviceSpecification::new("dev-1", "monitor", "1.0.0")
            .with_value("resolution", json!("2560x1440"))
            .with_value("refresh_rate", json!(144))
            .with_confidence("refresh_rate", 0.8)
            .with_source("refresh_rate", "datasheet")
    }

    #[test]
    fn test_migrate_sets_target_version() {
        let migration = SchemaMigration::new("m1", "monitor", "1.0.0", "1.1.0", Vec::new());
        let migrated = migrate_specification(&base_spec(), &migration).unwrap();
        assert_eq!(migrated.schema_version, "1.1.0");
    }

    #[test]
    fn test_add_field_sets_default() {
        let migration = SchemaMigration::new(
            "m1",
            "monitor",
            "1.0.0",
            "1.1.0",
            vec![MigrationOperation::AddField {
                field: "hdr".into(),
                definition: Box::new(
                    FieldDefinition::new(FieldType::Boolean, "HDR")
                        .with_default_value(json!(false)),
                ),
            }],
        );
        let migrated = migrate_specification(&base_spec(), &migration).unwrap();
        assert_eq!(migrated.specifications["hdr"], json!(false));
    }

    #[test]
    fn test_add_field_without_default_sets_nothing() {
        let migration = SchemaMigration::new(
            "m1",
            "monitor",
            "1.0.0",
            "1.1.0",
            vec![MigrationOperation::AddField {
                field: "hdr".into(),
                definition: Box::new(FieldDefinition::new(FieldType::Boolean, "HDR")),
            }],
        );
        let migrated = migrate_specification(&base_spec(), &migration).unwrap();
        assert!(!migrated.specifications.contains_key("hdr"));
    }

    #[test]
    fn test_remove_field_clears_parallel_maps() {
        let migration = SchemaMigration::new(
            "m1",
            "monitor",
            "1.0.0",
            "1.1.0",
            vec![MigrationOperation::RemoveField {
                field: "refresh_rate".into(),
            }],
        );
        let migrated = migrate_specification(&base_spec(), &migration).unwrap();
        assert!(!migrated.specifications.contains_key("refresh_rate"));
        assert!(!migrated.confidence_scores.contains_key("refresh_rate"));
        assert!(!migrated.sources.contains_key("refresh_rate"));
    }

    #[test]
    fn test_rename_moves_parallel_maps_in_lockstep() {
        // oldField -> newField carries the 0.8 confidence along
        let spec = DeviceSpecification::new("dev-1", "monitor", "1.0.0")
            .with_value("oldField", json!(42))
            .with_confidence("oldField", 0.8);
        let migration = SchemaMigration::new(
            "m1",
            "monitor",
            "1.0.0",
            "1.1.0",
            vec![MigrationOperation::RenameField {
                from: "oldField".into(),
                to: "newField".into(),
            }],
        );
        let migrated = migrate_specification(&spec, &migration).unwrap();
        assert!(migrated.specifications.contains_key("newField"));
        assert!(!migrated.specifications.contains_key("oldField"));
        assert_eq!(migrated.confidence_scores["newField"], 0.8);
        assert!(!migrated.confidence_scores.contains_key("oldField"));
    }

    #[test]
    fn test_type_change_coerces_to_string() {
        let migration = SchemaMigration::new(
            "m1",
            "monitor",
            "1.0.0",
            "1.1.0",
            vec![MigrationOperation::ModifyField {
                field: "refresh_rate".into(),
                changes: FieldDelta {
                    field_type: Some(FieldType::String),
                    ..Default::default()
                },
            }],
        );
        let migrated = migrate_specification(&base_spec(), &migration).unwrap();
        assert_eq!(migrated.specifications["refresh_rate"], json!("144"));
    }

    #[test]
    fn test_type_change_coerces_to_number() {
        let spec = DeviceSpecification::new("dev-1", "monitor", "1.0.0")
            .with_value("size", json!("27"))
            .with_value("name", json!("not numeric"));
        let migration = SchemaMigration::new(
            "m1",
            "monitor",
            "1.0.0",
            "1.1.0",
            vec![
                MigrationOperation::ModifyField {
                    field: "size".into(),
                    changes: FieldDelta {
                        field_type: Some(FieldType::Number),
                        ..Default::default()
                    },
                },
                MigrationOperation::ModifyField {
                    field: "name".into(),
                    changes: FieldDelta {
                        field_type: Some(FieldType::Number),
                        ..Default::default()
                    },
                },
            ],
        );
        let migrated = migrate_specification(&spec, &migration).unwrap();
        assert_eq!(migrated.specifications["size"], json!(27));
        // uncastable values store null
        assert_eq!(migrated.specifications["name"], Value::Null);
    }

    #[test]
    fn test_type_change_coerces_to_boolean() {
        let spec = DeviceSpecification::new("dev-1", "monitor", "1.0.0")
            .with_value("hdr", json!(1))
            .with_value("curved", json!(""));
        let migration = SchemaMigration::new(
            "m1",
            "monitor",
            "1.0.0",
            "1.1.0",
            vec![
                MigrationOperation::ModifyField {
                    field: "hdr".into(),
                    changes: FieldDelta {
                        field_type: Some(FieldType::Boolean),
                        ..Default::default()
                    },
                },
                MigrationOperation::ModifyField {
                    field: "curved".into(),
                    changes: FieldDelta {
                        field_type: Some(FieldType::Boolean),
                        ..Default::default()
                    },
                },
            ],
        );
        let migrated = migrate_specification(&spec, &migration).unwrap();
        assert_eq!(migrated.specifications["hdr"], json!(true));
        assert_eq!(migrated.specifications["curved"], json!(false));
    }

    #[test]
    fn test_modify_without_type_change_keeps_value() {
        let migration = SchemaMigration::new(
            "m1",
            "monitor",
            "1.0.0",
            "1.1.0",
            vec![MigrationOperation::ModifyField {
                field: "refresh_rate".into(),
                changes: FieldDelta {
                    constraints: Some(FieldConstraints {
                        max: Some(500.0),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            }],
        );
        let migrated = migrate_specification(&base_spec(), &migration).unwrap();
        assert_eq!(migrated.specifications["refresh_rate"], json!(144));
    }

    // ==== Path Search Tests ====

    #[test]
    fn test_migration_path_in_order() {
        let migrations = vec![
            SchemaMigration::new("m1", "monitor", "1.0.0", "1.1.0", Vec::new()),
            SchemaMigration::new("m2", "monitor", "1.1.0", "1.2.0", Vec::new()),
        ];
        let path = find_migration_path("1.0.0", "1.2.0", &migrations).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].id, "m1");
        assert_eq!(path[1].id, "m2");
    }

    #[test]
    fn test_no_migration_path() {
        match find_migration_path("1.0.0", "1.2.0", &[]) {
            Err(SpecError::NoMigrationPath { from, to }) => {
                assert_eq!(from, "1.0.0");
                assert_eq!(to, "1.2.0");
            }
            other => panic!("expected NoMigrationPath, got {other:?}"),
        }
    }

    #[test]
    fn test_same_version_is_empty_path() {
        let path = find_migration_path("1.0.0", "1.0.0", &[]).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_path_uses_semantic_version_equality() {
        let migrations = vec![SchemaMigration::new(
            "m1", "monitor", "1.0", "1.1.0", Vec::new(),
        )];
        let path = find_migration_path("1.0.0", "1.1.0", &migrations).unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_circular_chain_detected() {
        let migrations = vec![
            SchemaMigration::new("m1", "monitor", "1.0.0", "1.1.0", Vec::new()),
            SchemaMigration::new("m2", "monitor", "1.1.0", "1.0.0", Vec::new()),
        ];
        match find_migration_path("1.0.0", "2.0.0", &migrations) {
            Err(SpecError::CircularMigration(hops)) => assert_eq!(hops, MAX_MIGRATION_HOPS),
            other => panic!("expected CircularMigration, got {other:?}"),
        }
    }

    // ==== Safety Classification Tests ====

    #[test]
    fn test_removals_are_unsafe() {
        let operations = vec![MigrationOperation::RemoveField {
            field: "resolution".into(),
        }];
        assert!(!is_safe_migration(&operations));
        assert_eq!(breaking_changes(&operations).len(), 1);
    }

    #[test]
    fn test_additions_are_safe() {
        let operations = vec![
            MigrationOperation::AddField {
                field: "hdr".into(),
                definition: Box::new(FieldDefinition::new(FieldType::Boolean, "HDR")),
            },
            MigrationOperation::AddField {
                field: "ports".into(),
                definition: Box::new(FieldDefinition::new(FieldType::Array, "Ports")),
            },
        ];
        assert!(is_safe_migration(&operations));
    }

    #[test]
    fn test_rename_is_safe() {
        let operations = vec![MigrationOperation::RenameField {
            from: "a".into(),
            to: "b".into(),
        }];
        assert!(is_safe_migration(&operations));
    }

    #[test]
    fn test_type_change_is_unsafe() {
        let operations = vec![MigrationOperation::ModifyField {
            field: "size".into(),
            changes: FieldDelta {
                field_type: Some(FieldType::String),
                ..Default::default()
            },
        }];
        assert!(!is_safe_migration(&operations));
        assert!(breaking_changes(&operations)[0].contains("type"));
    }

    #[test]
    fn test_tightened_constraints_are_unsafe() {
        for constraints in [
            FieldConstraints {
                required: true,
                ..Default::default()
            },
            FieldConstraints {
                min: Some(0.0),
                ..Default::default()
            },
            FieldConstraints {
                max: Some(10.0),
                ..Default::default()
            },
            FieldConstraints {
                pattern: Some("^x".into()),
                ..Default::default()
            },
        ] {
            let operations = vec![MigrationOperation::ModifyField {
                field: "size".into(),
                changes: FieldDelta {
                    constraints: Some(constraints),
                    ..Default::default()
                },
            }];
            assert!(!is_safe_migration(&operations));
        }
    }

    #[test]
    fn test_metadata_only_modify_is_safe() {
        let operations = vec![MigrationOperation::ModifyField {
            field: "size".into(),
            changes: FieldDelta {
                metadata: Some(crate::types::FieldMetadata::new("Screen Size")),
                ..Default::default()
            },
        }];
        assert!(is_safe_migration(&operations));
    }

    #[test]
    fn test_remove_rule_operations_are_unsafe() {
        assert!(!is_safe_migration(&[MigrationOperation::RemoveValidationRule {
            rule_id: "vr-1".into(),
        }]));
        assert!(!is_safe_migration(&[
            MigrationOperation::RemoveCompatibilityRule {
                rule_id: "cr-1".into(),
            }
        ]));
    }
}
