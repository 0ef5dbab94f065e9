//! Device-to-device compatibility checking.
//!
//! A check combines two independent sources of evidence: schema-declared
//! compatibility rules, dispatched to pluggable rule processors, and a
//! generic per-field comparison over the fields both devices share. Field
//! evidence can refine a rule verdict downwards but never override a
//! rule-based `none`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{SpecError, SpecResult};
use crate::expr::{Condition, ExprError};
use crate::fingerprint;
use crate::storage::Storage;
use crate::types::{
    CategorySchema, CompatibilityRule, CompatibilityType, DeviceId, DeviceSpecification,
    FieldDefinition, FieldType,
};

/// Tolerance for treating two numeric field values as identical
const NUMERIC_EPSILON: f64 = 1e-9;

// ============================================================================
// Rule processors
// ============================================================================

/// What one rule processor concluded about one rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorVerdict {
    pub compatibility: CompatibilityType,
    /// Processor's certainty in 0..1; the report keeps the running minimum
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limitations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl ProcessorVerdict {
    pub fn full() -> Self {
        Self {
            compatibility: CompatibilityType::Full,
            confidence: 1.0,
            limitations: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// Both specifications, as seen by a rule processor
pub struct RuleContext<'a> {
    pub source_spec: &'a DeviceSpecification,
    pub target_spec: &'a DeviceSpecification,
}

impl RuleContext<'_> {
    /// Value of the rule's source field on the source device
    pub fn source_value(&self, rule: &CompatibilityRule) -> Option<&Value> {
        self.source_spec.specifications.get(&rule.source_field)
    }

    /// Value of the rule's target field on the target device
    pub fn target_value(&self, rule: &CompatibilityRule) -> Option<&Value> {
        self.target_spec.specifications.get(&rule.target_field)
    }
}

/// One pluggable compatibility-rule evaluator
pub trait RuleProcessor: Send + Sync {
    fn name(&self) -> &str;
    fn process(
        &self,
        rule: &CompatibilityRule,
        context: &RuleContext<'_>,
    ) -> SpecResult<ProcessorVerdict>;
}

/// Closed table of rule processors, keyed by rule name.
///
/// Unknown rule names fall back to the expression processor.
pub struct ProcessorRegistry {
    processors: BTreeMap<String, Box<dyn RuleProcessor>>,
    fallback: Box<dyn RuleProcessor>,
}

impl ProcessorRegistry {
    /// Registry with the built-in processors installed
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            processors: BTreeMap::new(),
            fallback: Box::new(ExpressionProcessor),
        };
        registry.register(Box::new(PowerRatioProcessor));
        registry.register(Box::new(ExpressionProcessor));
        registry
    }

    pub fn register(&mut self, processor: Box<dyn RuleProcessor>) {
        self.processors
            .insert(processor.name().to_string(), processor);
    }

    pub fn resolve(&self, name: &str) -> &dyn RuleProcessor {
        self.processors
            .get(name)
            .map(|p| p.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Sizing check for power-style fields: the target must cover the source.
///
/// `target/source >= 1.0` is full, `>= 0.8` partial with a limitation,
/// anything lower fails with a sizing recommendation.
pub struct PowerRatioProcessor;

impl RuleProcessor for PowerRatioProcessor {
    fn name(&self) -> &str {
        "power"
    }

    fn process(
        &self,
        rule: &CompatibilityRule,
        context: &RuleContext<'_>,
    ) -> SpecResult<ProcessorVerdict> {
        let source = context
            .source_value(rule)
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                ExprError::Eval(format!(
                    "power rule '{}' needs a numeric source field '{}'",
                    rule.id, rule.source_field
                ))
            })?;
        let target = context
            .target_value(rule)
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                ExprError::Eval(format!(
                    "power rule '{}' needs a numeric target field '{}'",
                    rule.id, rule.target_field
                ))
            })?;

        let ratio = target / source;
        let verdict = if ratio >= 1.0 {
            ProcessorVerdict::full()
        } else if ratio >= 0.8 {
            ProcessorVerdict {
                compatibility: CompatibilityType::Partial,
                confidence: 0.8,
                limitations: vec![format!(
                    "{} covers only {:.0}% of the required {}",
                    rule.target_field,
                    ratio * 100.0,
                    rule.source_field
                )],
                recommendations: Vec::new(),
            }
        } else {
            ProcessorVerdict {
                compatibility: CompatibilityType::None,
                confidence: 1.0,
                limitations: Vec::new(),
                recommendations: vec![format!(
                    "{} of at least {:.0} is needed to cover {}",
                    rule.target_field, source, rule.source_field
                )],
            }
        };
        Ok(verdict)
    }
}

/// Default processor: evaluates the rule's condition expression.
///
/// The context exposes `source` and `target` (the rule's field values) plus
/// `source_spec.*` and `target_spec.*` (the full field maps). A truthy result
/// maps to the rule's declared compatibility type, falsy to `none` with the
/// rule's message as a limitation.
pub struct ExpressionProcessor;

impl RuleProcessor for ExpressionProcessor {
    fn name(&self) -> &str {
        "expression"
    }

    fn process(
        &self,
        rule: &CompatibilityRule,
        context: &RuleContext<'_>,
    ) -> SpecResult<ProcessorVerdict> {
        let condition = Condition::parse(&rule.condition)?;

        let mut scope = serde_json::Map::new();
        scope.insert(
            "source".into(),
            context.source_value(rule).cloned().unwrap_or(Value::Null),
        );
        scope.insert(
            "target".into(),
            context.target_value(rule).cloned().unwrap_or(Value::Null),
        );
        scope.insert(
            "source_spec".into(),
            Value::Object(
                context
                    .source_spec
                    .specifications
                    .clone()
                    .into_iter()
                    .collect(),
            ),
        );
        scope.insert(
            "target_spec".into(),
            Value::Object(
                context
                    .target_spec
                    .specifications
                    .clone()
                    .into_iter()
                    .collect(),
            ),
        );

        let verdict = if condition.evaluate(&Value::Object(scope))? {
            ProcessorVerdict {
                compatibility: rule.compatibility_type,
                confidence: 1.0,
                limitations: rule.limitations.clone(),
                recommendations: Vec::new(),
            }
        } else {
            ProcessorVerdict {
                compatibility: CompatibilityType::None,
                confidence: 1.0,
                limitations: vec![rule.message.clone()],
                recommendations: Vec::new(),
            }
        };
        Ok(verdict)
    }
}

// ============================================================================
// Report model
// ============================================================================

/// Outcome of one applicable rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule_id: String,
    pub processor: String,
    pub verdict: ProcessorVerdict,
}

/// Generic comparison of one field shared by both devices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldComparison {
    pub field: String,
    pub source_value: Value,
    pub target_value: Value,
    pub compatibility: CompatibilityType,
    pub weight: f64,
}

/// Full result of one compatibility check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub source_device: DeviceId,
    pub target_device: DeviceId,
    pub compatibility: CompatibilityType,
    /// Weighted field score in 0..1; 0 when no fields were comparable
    pub score: f64,
    /// Running minimum over processor confidences
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_outcomes: Vec<RuleOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_comparisons: Vec<FieldComparison>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limitations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

// ============================================================================
// Engine
// ============================================================================

/// Compatibility checker over a storage backend
pub struct CompatibilityEngine {
    storage: Storage,
    processors: ProcessorRegistry,
}

impl CompatibilityEngine {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            processors: ProcessorRegistry::with_builtins(),
        }
    }

    pub fn with_processors(storage: Storage, processors: ProcessorRegistry) -> Self {
        Self {
            storage,
            processors,
        }
    }

    /// Check whether two devices work together.
    ///
    /// Both specifications and both category schemas are resolved through the
    /// store; a missing one fails `NotFound`.
    pub async fn check_compatibility(
        &self,
        source_device: &DeviceId,
        target_device: &DeviceId,
    ) -> SpecResult<CompatibilityReport> {
        let source_spec = self.storage.load_device_specification(source_device).await?;
        let target_spec = self.storage.load_device_specification(target_device).await?;

        let schemas = self.storage.load_all_category_schemas().await?;
        let source_schema = schemas
            .iter()
            .find(|s| s.id == source_spec.category_id)
            .ok_or_else(|| {
                SpecError::NotFound(format!("category schema '{}'", source_spec.category_id))
            })?;
        let target_schema = schemas
            .iter()
            .find(|s| s.id == target_spec.category_id)
            .ok_or_else(|| {
                SpecError::NotFound(format!("category schema '{}'", target_spec.category_id))
            })?;

        Ok(self.evaluate(&source_spec, source_schema, &target_spec, target_schema))
    }

    /// Pure comparison of two resolved (specification, schema) pairs
    pub fn evaluate(
        &self,
        source_spec: &DeviceSpecification,
        source_schema: &CategorySchema,
        target_spec: &DeviceSpecification,
        target_schema: &CategorySchema,
    ) -> CompatibilityReport {
        debug!(
            source = %source_spec.device_id,
            target = %target_spec.device_id,
            "Checking compatibility"
        );

        let context = RuleContext {
            source_spec,
            target_spec,
        };

        // rule evidence
        let mut rule_outcomes = Vec::new();
        let mut rule_verdict: Option<CompatibilityType> = None;
        let mut confidence = 1.0_f64;
        let mut limitations = Vec::new();
        let mut recommendations = Vec::new();

        for rule in applicable_rules(source_schema, target_schema, &context) {
            let processor = self.processors.resolve(&rule.name);
            match processor.process(rule, &context) {
                Ok(verdict) => {
                    rule_verdict = Some(match rule_verdict {
                        Some(current) => current.weaker(verdict.compatibility),
                        None => verdict.compatibility,
                    });
                    confidence = confidence.min(verdict.confidence);
                    limitations.extend(verdict.limitations.iter().cloned());
                    recommendations.extend(verdict.recommendations.iter().cloned());
                    rule_outcomes.push(RuleOutcome {
                        rule_id: rule.id.clone(),
                        processor: processor.name().to_string(),
                        verdict,
                    });
                }
                Err(error) => {
                    warn!(
                        rule = %rule.id,
                        processor = %processor.name(),
                        error = %error,
                        "Rule processor failed, skipping rule"
                    );
                }
            }
        }

        // field evidence
        let field_comparisons = compare_common_fields(
            source_spec,
            source_schema,
            target_spec,
            target_schema,
        );
        let (score, field_verdict) = weighted_score(&field_comparisons);

        let compatibility = match (rule_verdict, field_verdict) {
            (Some(rules), Some(fields)) => rules.weaker(fields),
            (Some(rules), None) => rules,
            (None, Some(fields)) => fields,
            (None, None) => {
                limitations.push("no comparable fields or applicable rules".to_string());
                CompatibilityType::None
            }
        };

        debug!(
            source = %source_spec.device_id,
            target = %target_spec.device_id,
            compatibility = %compatibility,
            score = score,
            "Compatibility check complete"
        );

        CompatibilityReport {
            source_device: source_spec.device_id.clone(),
            target_device: target_spec.device_id.clone(),
            compatibility,
            score,
            confidence,
            rule_outcomes,
            field_comparisons,
            limitations,
            recommendations,
            checked_at: Utc::now(),
        }
    }
}

/// Rules from either schema whose source field is present on the source spec
/// and target field on the target spec, deduplicated by id
fn applicable_rules<'a>(
    source_schema: &'a CategorySchema,
    target_schema: &'a CategorySchema,
    context: &RuleContext<'_>,
) -> Vec<&'a CompatibilityRule> {
    let mut seen = std::collections::BTreeSet::new();
    source_schema
        .compatibility_rules
        .iter()
        .chain(target_schema.compatibility_rules.iter())
        .filter(|rule| seen.insert(rule.id.as_str()))
        .filter(|rule| {
            context.source_value(rule).is_some() && context.target_value(rule).is_some()
        })
        .collect()
}

/// Compare every field declared in both schemas and valued on both specs.
///
/// The source schema's definition supplies the comparison type and weight.
fn compare_common_fields(
    source_spec: &DeviceSpecification,
    source_schema: &CategorySchema,
    target_spec: &DeviceSpecification,
    target_schema: &CategorySchema,
) -> Vec<FieldComparison> {
    let mut comparisons = Vec::new();
    for (field, definition) in &source_schema.fields {
        if !target_schema.fields.contains_key(field) {
            continue;
        }
        let (Some(source_value), Some(target_value)) = (
            source_spec.specifications.get(field),
            target_spec.specifications.get(field),
        ) else {
            continue;
        };
        comparisons.push(FieldComparison {
            field: field.clone(),
            source_value: source_value.clone(),
            target_value: target_value.clone(),
            compatibility: compare_values(definition, source_value, target_value),
            weight: definition.metadata.scoring_weight(),
        });
    }
    comparisons
}

/// Type-directed comparison of two field values
fn compare_values(definition: &FieldDefinition, source: &Value, target: &Value) -> CompatibilityType {
    match definition.field_type {
        FieldType::Number => compare_numbers(source, target),
        FieldType::String | FieldType::Date | FieldType::Url | FieldType::Email => {
            compare_strings(source, target)
        }
        FieldType::Enum => compare_enums(definition, source, target),
        FieldType::Array => compare_arrays(source, target),
        FieldType::Boolean | FieldType::Object => {
            if source == target {
                CompatibilityType::Full
            } else {
                CompatibilityType::None
            }
        }
    }
}

/// Relative difference `|a-b| / max(|a|,|b|)`: within 10% is full, within
/// 20% partial
fn compare_numbers(source: &Value, target: &Value) -> CompatibilityType {
    let (Some(a), Some(b)) = (source.as_f64(), target.as_f64()) else {
        return CompatibilityType::None;
    };
    if (a - b).abs() < NUMERIC_EPSILON {
        return CompatibilityType::Full;
    }
    let denominator = a.abs().max(b.abs());
    let relative = (a - b).abs() / denominator;
    if relative <= 0.1 {
        CompatibilityType::Full
    } else if relative <= 0.2 {
        CompatibilityType::Partial
    } else {
        CompatibilityType::None
    }
}

/// Case-insensitive equality is full, substring containment either way is
/// partial
fn compare_strings(source: &Value, target: &Value) -> CompatibilityType {
    let (Some(a), Some(b)) = (source.as_str(), target.as_str()) else {
        return if source == target {
            CompatibilityType::Full
        } else {
            CompatibilityType::None
        };
    };
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        CompatibilityType::Full
    } else if a.contains(&b) || b.contains(&a) {
        CompatibilityType::Partial
    } else {
        CompatibilityType::None
    }
}

/// Equal is full, adjacent in the declared ordering is partial; a value
/// missing from the declared list is none
fn compare_enums(
    definition: &FieldDefinition,
    source: &Value,
    target: &Value,
) -> CompatibilityType {
    if source == target {
        return CompatibilityType::Full;
    }
    let (Some(a), Some(b)) = (source.as_str(), target.as_str()) else {
        return CompatibilityType::None;
    };
    let Some(allowed) = definition.constraints.allowed_values.as_deref() else {
        return CompatibilityType::None;
    };
    let (Some(i), Some(j)) = (
        allowed.iter().position(|v| v == a),
        allowed.iter().position(|v| v == b),
    ) else {
        return CompatibilityType::None;
    };
    if i.abs_diff(j) <= 1 {
        CompatibilityType::Partial
    } else {
        CompatibilityType::None
    }
}

/// Jaccard overlap of the two element sets: `>= 0.8` full, `>= 0.3` partial
fn compare_arrays(source: &Value, target: &Value) -> CompatibilityType {
    let (Some(a), Some(b)) = (source.as_array(), target.as_array()) else {
        return CompatibilityType::None;
    };
    let left: std::collections::BTreeSet<String> =
        a.iter().map(fingerprint::fingerprint_value).collect();
    let right: std::collections::BTreeSet<String> =
        b.iter().map(fingerprint::fingerprint_value).collect();

    let union = left.union(&right).count();
    if union == 0 {
        return CompatibilityType::Full;
    }
    let intersection = left.intersection(&right).count();
    let jaccard = intersection as f64 / union as f64;
    if jaccard >= 0.8 {
        CompatibilityType::Full
    } else if jaccard >= 0.3 {
        CompatibilityType::Partial
    } else {
        CompatibilityType::None
    }
}

/// Weighted field score and its bucket; `None` when nothing was comparable
fn weighted_score(comparisons: &[FieldComparison]) -> (f64, Option<CompatibilityType>) {
    let total_weight: f64 = comparisons.iter().map(|c| c.weight).sum();
    if comparisons.is_empty() || total_weight <= 0.0 {
        return (0.0, None);
    }
    let weighted: f64 = comparisons
        .iter()
        .map(|c| c.weight * c.compatibility.score())
        .sum();
    let score = weighted / total_weight;
    (score, Some(CompatibilityType::from_score(score)))
}
