//! Category templates and the built-in presets.
//!
//! A template is a reusable starting point for a category schema: a field
//! set with constraints, weights, and rules. Instantiating one always
//! produces a schema at version `1.0.0`; customizations overlay the base
//! field set before registration.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::{
    CategoryId, CategorySchema, CompatibilityRule, CompatibilityType, FieldDefinition,
    ValidationRule,
};

/// Reusable base definition for new category schemas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTemplate {
    /// Lookup key in the registry's template table
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub fields: BTreeMap<String, FieldDefinition>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_fields: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compatibility_rules: Vec<CompatibilityRule>,
}

/// Overlay applied on top of a template during instantiation.
///
/// Fields replace same-named base fields wholesale; required fields and
/// rules are appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateCustomizations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldDefinition>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_fields: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compatibility_rules: Vec<CompatibilityRule>,
}

impl CategoryTemplate {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: description.into(),
            fields: BTreeMap::new(),
            required_fields: BTreeSet::new(),
            validation_rules: Vec::new(),
            compatibility_rules: Vec::new(),
        }
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

    /// Build a fresh `1.0.0` schema from this template
    pub fn instantiate(
        &self,
        category_id: impl Into<CategoryId>,
        customizations: Option<&TemplateCustomizations>,
    ) -> CategorySchema {
        let mut schema = CategorySchema::new(category_id, self.display_name.clone(), "1.0.0");
        schema.fields = self.fields.clone();
        schema.required_fields = self.required_fields.clone();
        schema.validation_rules = self.validation_rules.clone();
        schema.compatibility_rules = self.compatibility_rules.clone();

        if let Some(custom) = customizations {
            if let Some(name) = &custom.name {
                schema.name = name.clone();
            }
            for (field, definition) in &custom.fields {
                schema.fields.insert(field.clone(), definition.clone());
            }
            for field in &custom.required_fields {
                schema.required_fields.insert(field.clone());
            }
            schema
                .validation_rules
                .extend(custom.validation_rules.iter().cloned());
            schema
                .compatibility_rules
                .extend(custom.compatibility_rules.iter().cloned());
        }

        schema
    }
}

/// Built-in templates seeded into the registry by default
pub mod presets {
    use super::*;
    use crate::types::{FieldConstraints, FieldType, Importance, Severity};

    /// All built-in templates, in registration order
    pub fn all() -> Vec<CategoryTemplate> {
        vec![monitor(), headphones(), gaming_console()]
    }

    pub fn monitor() -> CategoryTemplate {
        CategoryTemplate::new("monitor", "Monitor", "Desktop monitors and displays")
            .with_field(
                "resolution",
                FieldDefinition::new(FieldType::String, "Native Resolution")
                    .required()
                    .with_constraints(FieldConstraints {
                        required: true,
                        pattern: Some(r"^\d+x\d+$".into()),
                        ..Default::default()
                    })
                    .with_importance(Importance::Critical)
                    .with_weight(0.9)
                    .indexable(),
            )
            .with_field(
                "refresh_rate",
                FieldDefinition::new(FieldType::Number, "Refresh Rate")
                    .with_constraints(FieldConstraints {
                        required: true,
                        min: Some(24.0),
                        max: Some(1000.0),
                        unit: Some("Hz".into()),
                        ..Default::default()
                    })
                    .with_importance(Importance::High)
                    .with_weight(0.8)
                    .indexable(),
            )
            .with_field(
                "size_inches",
                FieldDefinition::new(FieldType::Number, "Screen Size")
                    .with_constraints(FieldConstraints {
                        min: Some(10.0),
                        max: Some(100.0),
                        unit: Some("in".into()),
                        ..Default::default()
                    })
                    .with_weight(0.6),
            )
            .with_field(
                "panel_type",
                FieldDefinition::new(FieldType::Enum, "Panel Type")
                    .with_constraints(FieldConstraints {
                        allowed_values: Some(vec![
                            "ips".into(),
                            "va".into(),
                            "tn".into(),
                            "oled".into(),
                        ]),
                        ..Default::default()
                    })
                    .with_weight(0.5),
            )
            .with_field(
                "brightness_nits",
                FieldDefinition::new(FieldType::Number, "Peak Brightness")
                    .with_constraints(FieldConstraints {
                        min: Some(50.0),
                        max: Some(10000.0),
                        unit: Some("nit".into()),
                        ..Default::default()
                    })
                    .with_weight(0.4),
            )
            .with_field(
                "hdr",
                FieldDefinition::new(FieldType::Boolean, "HDR Support")
                    .with_default_value(serde_json::Value::Bool(false))
                    .with_weight(0.3),
            )
            .with_field(
                "ports",
                FieldDefinition::new(FieldType::Array, "Input Ports").with_weight(0.7),
            )
            .with_required_field("resolution")
            .with_required_field("refresh_rate")
            .with_validation_rule(ValidationRule::new(
                "monitor-hdr-brightness",
                "HDR brightness floor",
                "not hdr || brightness_nits >= 400",
                "HDR is claimed but peak brightness is below 400 nits",
                Severity::Warning,
            ))
            .with_compatibility_rule(CompatibilityRule::new(
                "monitor-resolution-match",
                "expression",
                "resolution",
                "resolution",
                "source == target",
                CompatibilityType::Full,
                "Native resolutions match",
            ))
    }

    pub fn headphones() -> CategoryTemplate {
        CategoryTemplate::new("headphones", "Headphones", "Wired and wireless headphones")
            .with_field(
                "impedance_ohms",
                FieldDefinition::new(FieldType::Number, "Impedance")
                    .with_constraints(FieldConstraints {
                        required: true,
                        min: Some(4.0),
                        max: Some(600.0),
                        unit: Some("ohm".into()),
                        ..Default::default()
                    })
                    .with_importance(Importance::High)
                    .with_weight(0.8),
            )
            .with_field(
                "sensitivity_db",
                FieldDefinition::new(FieldType::Number, "Sensitivity")
                    .with_constraints(FieldConstraints {
                        min: Some(60.0),
                        max: Some(130.0),
                        unit: Some("dB".into()),
                        ..Default::default()
                    })
                    .with_weight(0.6),
            )
            .with_field(
                "driver_type",
                FieldDefinition::new(FieldType::Enum, "Driver Type")
                    .with_constraints(FieldConstraints {
                        allowed_values: Some(vec![
                            "dynamic".into(),
                            "planar".into(),
                            "electrostatic".into(),
                        ]),
                        ..Default::default()
                    })
                    .with_weight(0.5),
            )
            .with_field(
                "wireless",
                FieldDefinition::new(FieldType::Boolean, "Wireless")
                    .required()
                    .with_importance(Importance::High)
                    .with_weight(0.7),
            )
            .with_field(
                "has_microphone",
                FieldDefinition::new(FieldType::Boolean, "Built-in Microphone").with_weight(0.2),
            )
            .with_required_field("impedance_ohms")
            .with_required_field("wireless")
            .with_validation_rule(ValidationRule::new(
                "headphones-impedance-drive",
                "High impedance needs amplification",
                "wireless || impedance_ohms <= 300",
                "Wired headphones above 300 ohm need a dedicated amplifier",
                Severity::Info,
            ))
            .with_compatibility_rule(CompatibilityRule::new(
                "headphones-wireless-pairing",
                "expression",
                "wireless",
                "wireless",
                "source == target",
                CompatibilityType::Full,
                "Both sides agree on wireless operation",
            ))
    }

    pub fn gaming_console() -> CategoryTemplate {
        CategoryTemplate::new(
            "gaming_console",
            "Gaming Console",
            "Home and portable gaming consoles",
        )
        .with_field(
            "max_resolution",
            FieldDefinition::new(FieldType::String, "Maximum Output Resolution")
                .required()
                .with_constraints(FieldConstraints {
                    required: true,
                    pattern: Some(r"^\d+x\d+$".into()),
                    ..Default::default()
                })
                .with_importance(Importance::Critical)
                .with_weight(0.9),
        )
        .with_field(
            "max_fps",
            FieldDefinition::new(FieldType::Number, "Maximum Frame Rate")
                .with_constraints(FieldConstraints {
                    min: Some(30.0),
                    max: Some(240.0),
                    unit: Some("fps".into()),
                    ..Default::default()
                })
                .with_weight(0.7),
        )
        .with_field(
            "storage_gb",
            FieldDefinition::new(FieldType::Number, "Internal Storage")
                .with_constraints(FieldConstraints {
                    required: true,
                    min: Some(32.0),
                    max: Some(8192.0),
                    unit: Some("GB".into()),
                    ..Default::default()
                })
                .with_weight(0.6),
        )
        .with_field(
            "hdmi_version",
            FieldDefinition::new(FieldType::Enum, "HDMI Version")
                .with_constraints(FieldConstraints {
                    allowed_values: Some(vec!["1.4".into(), "2.0".into(), "2.1".into()]),
                    ..Default::default()
                })
                .with_weight(0.8),
        )
        .with_field(
            "power_watts",
            FieldDefinition::new(FieldType::Number, "Power Draw")
                .with_constraints(FieldConstraints {
                    min: Some(10.0),
                    max: Some(600.0),
                    unit: Some("W".into()),
                    ..Default::default()
                })
                .with_weight(0.5),
        )
        .with_field(
            "supports_vrr",
            FieldDefinition::new(FieldType::Boolean, "Variable Refresh Rate").with_weight(0.4),
        )
        .with_required_field("max_resolution")
        .with_required_field("storage_gb")
        .with_validation_rule(ValidationRule::new(
            "console-fps-hdmi",
            "High frame rate needs modern HDMI",
            "max_fps <= 60 || hdmi_version != '1.4'",
            "Frame rates above 60 need HDMI 2.0 or newer",
            Severity::Warning,
        ))
        .with_compatibility_rule(CompatibilityRule::new(
            "console-display-refresh",
            "expression",
            "max_fps",
            "refresh_rate",
            "source <= target",
            CompatibilityType::Full,
            "Display refresh rate covers the console frame rate",
        ))
    }
}
