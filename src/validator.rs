//! Schema structure validation and specification value validation

use regex::RegexBuilder;
use serde_json::Value;
use tracing::{debug, warn};

use crate::expr::Condition;
use crate::types::{
    CategorySchema, DeviceSpecification, FieldConstraints, FieldDefinition, FieldError, FieldType,
    SchemaReport, Severity, SpecReport, ViolationCode,
};
use crate::version;

/// Upper bound on compiled regex size; oversized patterns are rejected
const MAX_REGEX_SIZE: usize = 1_000_000;

/// Validator configuration
#[derive(Debug, Clone, Default)]
pub struct ValidatorConfig {
    /// Escalate warning-severity findings to errors
    pub warnings_as_errors: bool,
}

/// Validates schema structure and specification values
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    // ========================================================================
    // Schema validation
    // ========================================================================

    /// Check a schema's structural integrity.
    ///
    /// A schema that fails here must never be registered or persisted.
    pub fn validate_schema(&self, schema: &CategorySchema) -> SchemaReport {
        let mut report = SchemaReport::default();

        if schema.id.as_str().trim().is_empty() {
            report.add_error("Schema id must not be empty");
        }
        if schema.name.trim().is_empty() {
            report.add_error("Schema name must not be empty");
        }
        if schema.version.trim().is_empty() {
            report.add_error("Schema version must not be empty");
        } else if version::parse_version(&schema.version).is_err() {
            report.add_error(format!(
                "Schema version '{}' is not a valid semver string",
                schema.version
            ));
        }

        for (name, definition) in &schema.fields {
            self.validate_field_definition(name, definition, &mut report);
        }

        for required in &schema.required_fields {
            if !schema.fields.contains_key(required) {
                report.add_error(format!(
                    "Required field '{required}' is not defined in fields"
                ));
            }
        }

        for rule in &schema.validation_rules {
            match Condition::parse(&rule.condition) {
                Ok(condition) => {
                    for reference in condition.references() {
                        let root = reference.split('.').next().unwrap_or("");
                        if !schema.fields.contains_key(root) {
                            report.add_error(format!(
                                "Validation rule '{}' references unknown field '{root}'",
                                rule.id
                            ));
                        }
                    }
                }
                Err(err) => report.add_error(format!(
                    "Validation rule '{}' has an invalid condition: {err}",
                    rule.id
                )),
            }
        }

        for rule in &schema.compatibility_rules {
            if !schema.fields.contains_key(&rule.source_field) {
                report.add_error(format!(
                    "Compatibility rule '{}' references unknown source field '{}'",
                    rule.id, rule.source_field
                ));
            }
            if !schema.fields.contains_key(&rule.target_field) {
                report.add_error(format!(
                    "Compatibility rule '{}' references unknown target field '{}'",
                    rule.id, rule.target_field
                ));
            }
            if let Err(err) = Condition::parse(&rule.condition) {
                report.add_error(format!(
                    "Compatibility rule '{}' has an invalid condition: {err}",
                    rule.id
                ));
            }
        }

        debug!(
            schema = %schema.id,
            version = %schema.version,
            errors = report.errors.len(),
            "Schema validation finished"
        );
        report
    }

    fn validate_field_definition(
        &self,
        name: &str,
        definition: &FieldDefinition,
        report: &mut SchemaReport,
    ) {
        if definition.metadata.label.trim().is_empty() {
            report.add_error(format!("Field '{name}' is missing a label"));
        }

        let constraints = &definition.constraints;

        if definition.field_type == FieldType::Enum {
            let has_values = constraints
                .allowed_values
                .as_ref()
                .map(|v| !v.is_empty())
                .unwrap_or(false);
            if !has_values {
                report.add_error(format!(
                    "Enum field '{name}' must declare a non-empty enum list"
                ));
            }
        }

        for (bound, label) in [(constraints.min, "min"), (constraints.max, "max")] {
            if let Some(value) = bound {
                if !value.is_finite() {
                    report.add_error(format!("Field '{name}' has a non-numeric {label} bound"));
                }
            }
        }
        if let (Some(min), Some(max)) = (constraints.min, constraints.max) {
            if min > max {
                report.add_error(format!("Field '{name}' has min greater than max"));
            }
        }
        if let (Some(min_len), Some(max_len)) = (constraints.min_length, constraints.max_length) {
            if min_len > max_len {
                report.add_error(format!(
                    "Field '{name}' has min_length greater than max_length"
                ));
            }
        }

        if let Some(pattern) = &constraints.pattern {
            if let Err(err) = RegexBuilder::new(pattern)
                .size_limit(MAX_REGEX_SIZE)
                .build()
            {
                report.add_error(format!("Field '{name}' has an invalid pattern: {err}"));
            }
        }

        if let Some(weight) = definition.metadata.weight {
            if !(0.0..=1.0).contains(&weight) {
                report.add_error(format!("Field '{name}' has a weight outside 0..1"));
            }
        }
    }

    // ========================================================================
    // Specification validation
    // ========================================================================

    /// Validate a device's values against a schema.
    ///
    /// Warning and info findings never fail the specification; only
    /// error-severity findings make the report invalid.
    pub fn validate_specification(
        &self,
        spec: &DeviceSpecification,
        schema: &CategorySchema,
    ) -> SpecReport {
        let mut report = SpecReport::default();

        if !version::versions_equal(&spec.schema_version, &schema.version) {
            report.add(FieldError::new(
                "schema_version",
                ViolationCode::VersionMismatch,
                format!(
                    "Specification targets schema version {} but the schema is at {}",
                    spec.schema_version, schema.version
                ),
                self.effective(Severity::Warning),
            ));
        }

        for required in &schema.required_fields {
            if !spec.specifications.contains_key(required) {
                report.add(FieldError::new(
                    required,
                    ViolationCode::RequiredFieldMissing,
                    format!("Required field '{required}' is missing"),
                    Severity::Error,
                ));
            }
        }

        for (name, value) in &spec.specifications {
            let definition = match schema.fields.get(name) {
                Some(definition) => definition,
                None => {
                    report.add(FieldError::new(
                        name,
                        ViolationCode::UndefinedField,
                        format!("Field '{name}' is not declared in the schema"),
                        self.effective(Severity::Warning),
                    ));
                    continue;
                }
            };

            if !value_matches_type(value, definition.field_type) {
                report.add(FieldError::new(
                    name,
                    ViolationCode::InvalidType,
                    format!(
                        "Field '{name}' expected type {} but got {}",
                        definition.field_type,
                        describe_value(value)
                    ),
                    Severity::Error,
                ));
                continue;
            }

            self.check_constraints(name, value, &definition.constraints, &mut report);
        }

        self.evaluate_rules(spec, schema, &mut report);

        debug!(
            device = %spec.device_id,
            schema = %schema.id,
            findings = report.field_errors.len(),
            valid = report.is_valid(),
            "Specification validation finished"
        );
        report
    }

    fn check_constraints(
        &self,
        name: &str,
        value: &Value,
        constraints: &FieldConstraints,
        report: &mut SpecReport,
    ) {
        if let Some(text) = value.as_str() {
            let length = text.chars().count();
            if let Some(min_len) = constraints.min_length {
                if length < min_len {
                    report.add(FieldError::new(
                        name,
                        ViolationCode::MinLengthViolation,
                        format!("Field '{name}' is shorter than minimum length {min_len}"),
                        Severity::Error,
                    ));
                }
            }
            if let Some(max_len) = constraints.max_length {
                if length > max_len {
                    report.add(FieldError::new(
                        name,
                        ViolationCode::MaxLengthViolation,
                        format!("Field '{name}' is longer than maximum length {max_len}"),
                        Severity::Error,
                    ));
                }
            }
            if let Some(pattern) = &constraints.pattern {
                match RegexBuilder::new(pattern).size_limit(MAX_REGEX_SIZE).build() {
                    Ok(regex) => {
                        if !regex.is_match(text) {
                            report.add(FieldError::new(
                                name,
                                ViolationCode::PatternViolation,
                                format!("Field '{name}' does not match pattern '{pattern}'"),
                                Severity::Error,
                            ));
                        }
                    }
                    Err(err) => {
                        // schema validation rejects these; tolerate here
                        warn!(field = name, error = %err, "Skipping uncompilable pattern");
                    }
                }
            }
            if let Some(allowed) = &constraints.allowed_values {
                if !allowed.iter().any(|v| v == text) {
                    report.add(FieldError::new(
                        name,
                        ViolationCode::EnumViolation,
                        format!("Field '{name}' value '{text}' is not in the allowed list"),
                        Severity::Error,
                    ));
                }
            }
        }

        if let Some(number) = value.as_f64() {
            if let Some(min) = constraints.min {
                if number < min {
                    report.add(FieldError::new(
                        name,
                        ViolationCode::MinValueViolation,
                        format!("Field '{name}' is below minimum value {min}"),
                        Severity::Error,
                    ));
                }
            }
            if let Some(max) = constraints.max {
                if number > max {
                    report.add(FieldError::new(
                        name,
                        ViolationCode::MaxValueViolation,
                        format!("Field '{name}' is above maximum value {max}"),
                        Severity::Error,
                    ));
                }
            }
        }
    }

    fn evaluate_rules(
        &self,
        spec: &DeviceSpecification,
        schema: &CategorySchema,
        report: &mut SpecReport,
    ) {
        if schema.validation_rules.is_empty() {
            return;
        }

        let context = Value::Object(
            spec.specifications
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        for rule in &schema.validation_rules {
            let condition = match Condition::parse(&rule.condition) {
                Ok(condition) => condition,
                Err(err) => {
                    warn!(rule = %rule.id, error = %err, "Skipping unparsable validation rule");
                    continue;
                }
            };
            match condition.evaluate(&context) {
                Ok(true) => {}
                Ok(false) => {
                    let field = condition
                        .references()
                        .first()
                        .map(|r| r.split('.').next().unwrap_or("").to_string())
                        .unwrap_or_else(|| rule.id.clone());
                    report.add(FieldError::new(
                        field,
                        ViolationCode::RuleViolation,
                        rule.error_message.clone(),
                        self.effective(rule.severity),
                    ));
                }
                Err(err) => {
                    warn!(rule = %rule.id, error = %err, "Validation rule evaluation failed, skipping");
                }
            }
        }
    }

    fn effective(&self, severity: Severity) -> Severity {
        if self.config.warnings_as_errors && severity == Severity::Warning {
            Severity::Error
        } else {
            severity
        }
    }
}

// ============================================================================
// Type recognizers
// ============================================================================

/// Whether a JSON value inhabits a declared field type
pub fn value_matches_type(value: &Value, field_type: FieldType) -> bool {
    match field_type {
        FieldType::String => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Enum => value.is_string(),
        FieldType::Array => value.is_array(),
        // objects must be non-array, non-null
        FieldType::Object => value.is_object(),
        FieldType::Date => value.as_str().map(is_date_like).unwrap_or(false),
        FieldType::Url => value.as_str().map(is_url_like).unwrap_or(false),
        FieldType::Email => value.as_str().map(is_email_like).unwrap_or(false),
    }
}

fn is_date_like(text: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(text).is_ok()
        || chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

fn is_url_like(text: &str) -> bool {
    match text.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && !rest.is_empty()
                && !rest.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn is_email_like(text: &str) -> bool {
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !text.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}

fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
