//! Canonical schema fingerprints.
//!
//! Field definitions and whole schemas are hashed over a canonical JSON form
//! (object keys sorted, no insignificant whitespace) so that two definitions
//! compare equal iff their serialized content is equal, regardless of key
//! order in the input.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::SpecResult;
use crate::types::{CategorySchema, FieldDefinition};

/// SHA-256 fingerprint of an arbitrary JSON value in canonical form
pub fn fingerprint_value(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_string(value).as_bytes());
    hex::encode(hasher.finalize())
}

/// Fingerprint of one field definition
pub fn fingerprint_field(definition: &FieldDefinition) -> SpecResult<String> {
    let value = serde_json::to_value(definition)?;
    Ok(fingerprint_value(&value))
}

/// Fingerprint of a whole schema, excluding audit timestamps.
///
/// Two schemas that differ only in `created_at`/`updated_at` fingerprint
/// identically.
pub fn fingerprint_schema(schema: &CategorySchema) -> SpecResult<String> {
    let mut value = serde_json::to_value(schema)?;
    if let Value::Object(ref mut map) = value {
        map.remove("created_at");
        map.remove("updated_at");
    }
    Ok(fingerprint_value(&value))
}

/// Render a value with object keys in sorted order
fn canonical_string(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let entries: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", serde_json::to_string(k).unwrap_or_default(), canonical_string(&map[k])))
                .collect();
            format!("{{{}}}", entries.join(","))
        }
        Value::Array(items) => {
            let entries: Vec<String> = items.iter().map(canonical_string).collect();
            format!("[{}]", entries.join(","))
        }
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldConstraints, FieldType};
    use serde_json::json;

    #[test]
    fn test_key_order_does_not_matter() {
        let a = json!({"b": 1, "a": {"y": 2, "x": 3}});
        let b = json!({"a": {"x": 3, "y": 2}, "b": 1});
        assert_eq!(fingerprint_value(&a), fingerprint_value(&b));
    }

    #[test]
    fn test_content_changes_fingerprint() {
        let a = json!({"resolution": "2560x1440"});
        let b = json!({"resolution": "3840x2160"});
        assert_ne!(fingerprint_value(&a), fingerprint_value(&b));
    }

    #[test]
    fn test_array_order_matters() {
        let a = json!(["ips", "va"]);
        let b = json!(["va", "ips"]);
        assert_ne!(fingerprint_value(&a), fingerprint_value(&b));
    }

    #[test]
    fn test_field_fingerprint_stable() {
        let field = FieldDefinition::new(FieldType::Number, "Refresh Rate").with_constraints(
            FieldConstraints {
                min: Some(30.0),
                max: Some(360.0),
                ..Default::default()
            },
        );
        let first = fingerprint_field(&field).unwrap();
        let second = fingerprint_field(&field.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_field_fingerprint_detects_changes() {
        let base = FieldDefinition::new(FieldType::Number, "Refresh Rate");
        let changed = base.clone().with_unit("Hz");
        assert_ne!(
            fingerprint_field(&base).unwrap(),
            fingerprint_field(&changed).unwrap()
        );
    }

    #[test]
    fn test_schema_fingerprint_ignores_timestamps() {
        let schema = crate::types::CategorySchema::new("monitor", "Monitor", "1.0.0")
            .with_field("size", FieldDefinition::new(FieldType::Number, "Size"));
        let mut later = schema.clone();
        later.updated_at = chrono::Utc::now() + chrono::Duration::seconds(30);
        assert_eq!(
            fingerprint_schema(&schema).unwrap(),
            fingerprint_schema(&later).unwrap()
        );
    }
}
