//! Per-field processing pipeline.
//!
//! Transforms run first, in registration order, each feeding the next; checks
//! run afterwards and are independent of one another. Both declare which
//! field types they support and are skipped for everything else. An observer
//! trait receives lifecycle events around each step.

use serde_json::Value;
use tracing::debug;

use crate::error::SpecResult;
use crate::types::{FieldDefinition, FieldError, FieldType, Severity, ViolationCode};

/// Value transformation step
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;
    fn supports(&self, field_type: FieldType) -> bool;
    fn apply(&self, value: &Value, definition: &FieldDefinition) -> SpecResult<Value>;
}

/// Independent post-transform verification step
pub trait Check: Send + Sync {
    fn name(&self) -> &str;
    fn supports(&self, field_type: FieldType) -> bool;
    fn check(&self, field: &str, value: &Value, definition: &FieldDefinition)
        -> Option<FieldError>;
}

/// Observer notified around pipeline steps
pub trait PipelineHook: Send + Sync {
    fn before_transform(&self, _field: &str, _transform: &str, _value: &Value) {}
    fn after_transform(&self, _field: &str, _transform: &str, _value: &Value) {}
    fn check_failed(&self, _field: &str, _check: &str, _error: &FieldError) {}
}

/// Transformed value plus any check findings
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub value: Value,
    pub findings: Vec<FieldError>,
}

/// Ordered transforms and checks applied to one field value
#[derive(Default)]
pub struct FieldPipeline {
    transforms: Vec<Box<dyn Transform>>,
    checks: Vec<Box<dyn Check>>,
    hooks: Vec<Box<dyn PipelineHook>>,
}

impl FieldPipeline {
    /// Empty pipeline; values pass through untouched
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline preloaded with the built-in transforms and checks
    pub fn with_builtins() -> Self {
        let mut pipeline = Self::new();
        pipeline.add_transform(UnitConversion::new());
        pipeline.add_transform(TextNormalize);
        pipeline.add_check(NumericRange);
        pipeline
    }

    pub fn add_transform(&mut self, transform: impl Transform + 'static) {
        self.transforms.push(Box::new(transform));
    }

    pub fn add_check(&mut self, check: impl Check + 'static) {
        self.checks.push(Box::new(check));
    }

    pub fn add_hook(&mut self, hook: impl PipelineHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Run the field value through every supporting transform, then every
    /// supporting check
    pub fn process(
        &self,
        field: &str,
        value: &Value,
        definition: &FieldDefinition,
    ) -> SpecResult<PipelineOutcome> {
        let mut current = value.clone();

        for transform in &self.transforms {
            if !transform.supports(definition.field_type) {
                continue;
            }
            for hook in &self.hooks {
                hook.before_transform(field, transform.name(), &current);
            }
            current = transform.apply(&current, definition)?;
            for hook in &self.hooks {
                hook.after_transform(field, transform.name(), &current);
            }
        }

        let mut findings = Vec::new();
        for check in &self.checks {
            if !check.supports(definition.field_type) {
                continue;
            }
            if let Some(error) = check.check(field, &current, definition) {
                debug!(field = %field, check = %check.name(), code = %error.code, "Check failed");
                for hook in &self.hooks {
                    hook.check_failed(field, check.name(), &error);
                }
                findings.push(error);
            }
        }

        Ok(PipelineOutcome {
            value: current,
            findings,
        })
    }
}

// ============================================================================
// Built-in transforms
// ============================================================================

/// Normalizes values declared in common non-canonical units
pub struct UnitConversion {
    /// (declared unit, canonical unit, multiplier)
    table: Vec<(&'static str, &'static str, f64)>,
}

impl UnitConversion {
    pub fn new() -> Self {
        Self {
            table: vec![
                ("mm", "m", 0.001),
                ("cm", "m", 0.01),
                ("g", "kg", 0.001),
                ("mg", "kg", 0.000_001),
                ("mA", "A", 0.001),
                ("mW", "W", 0.001),
            ],
        }
    }

    /// Canonical unit a declared unit maps to, if any
    pub fn canonical_unit(&self, unit: &str) -> Option<&'static str> {
        self.table
            .iter()
            .find(|(from, _, _)| *from == unit)
            .map(|(_, to, _)| *to)
    }
}

impl Default for UnitConversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for UnitConversion {
    fn name(&self) -> &str {
        "unit_conversion"
    }

    fn supports(&self, field_type: FieldType) -> bool {
        field_type == FieldType::Number
    }

    fn apply(&self, value: &Value, definition: &FieldDefinition) -> SpecResult<Value> {
        let Some(unit) = definition.constraints.unit.as_deref() else {
            return Ok(value.clone());
        };
        let Some((_, _, factor)) = self.table.iter().find(|(from, _, _)| *from == unit) else {
            return Ok(value.clone());
        };
        match value.as_f64() {
            Some(n) => Ok(crate::types::json_number(n * factor)),
            None => Ok(value.clone()),
        }
    }
}

/// Trims and collapses internal whitespace runs
pub struct TextNormalize;

impl Transform for TextNormalize {
    fn name(&self) -> &str {
        "text_normalize"
    }

    fn supports(&self, field_type: FieldType) -> bool {
        matches!(
            field_type,
            FieldType::String | FieldType::Url | FieldType::Email
        )
    }

    fn apply(&self, value: &Value, _definition: &FieldDefinition) -> SpecResult<Value> {
        match value {
            Value::String(text) => {
                let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
                Ok(Value::String(normalized))
            }
            other => Ok(other.clone()),
        }
    }
}

// ============================================================================
// Built-in checks
// ============================================================================

/// Re-verifies numeric bounds after transformation
pub struct NumericRange;

impl Check for NumericRange {
    fn name(&self) -> &str {
        "numeric_range"
    }

    fn supports(&self, field_type: FieldType) -> bool {
        field_type == FieldType::Number
    }

    fn check(
        &self,
        field: &str,
        value: &Value,
        definition: &FieldDefinition,
    ) -> Option<FieldError> {
        let n = value.as_f64()?;
        if let Some(min) = definition.constraints.min {
            if n < min {
                return Some(FieldError::new(
                    field,
                    ViolationCode::MinValueViolation,
                    format!("value {n} is below minimum {min}"),
                    Severity::Error,
                ));
            }
        }
        if let Some(max) = definition.constraints.max {
            if n > max {
                return Some(FieldError::new(
                    field,
                    ViolationCode::MaxValueViolation,
                    format!("value {n} is above maximum {max}"),
                    Severity::Error,
                ));
            }
        }
        None
    }
}
