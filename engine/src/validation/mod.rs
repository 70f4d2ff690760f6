//! Mapping schema validation.
//!
//! Two document shapes are accepted and kept apart as variants of
//! [`MappingSchema`]:
//!
//! ## Flat
//! ```json
//! { "mappings": [ { "from": "Name", "to": "profile.name", "type": "string" } ] }
//! ```
//! Every entry needs `from`, `to` and `type`. Entries are named by index.
//!
//! ## Nested
//! ```json
//! { "collections": { "users": { "source": "users.csv",
//!     "mappings": { "email": { "from": "Email", "type": "string" } } } } }
//! ```
//! The target is the key under `mappings`. Every entry needs `from` and
//! `type`. Entries are named by collection and field.
//!
//! Validation stops at the first problem. Defaults are not checked against
//! the declared type; that is left to coercion.

use serde_json::{json, Map, Value};

use crate::error::{LoadResult, SchemaError, SchemaResult};
use crate::models::{CollectionMapping, FieldMapping, MappingSchema, TargetType};

/// Validate a parsed JSON document and build a [`MappingSchema`].
///
/// # Example
/// ```
/// use serde_json::json;
///
/// let schema = docmap::validate(&json!({
///     "mappings": [{ "from": "age", "to": "age", "type": "number" }]
/// })).unwrap();
/// assert_eq!(schema.mapping_count(), 1);
///
/// let err = docmap::validate(&json!({ "mappings": [{ "from": "age", "type": "number" }] }))
///     .unwrap_err();
/// assert_eq!(err.to_string(), "Invalid schema: mapping 0 missing to property");
/// ```
pub fn validate(document: &Value) -> SchemaResult<MappingSchema> {
    if let Some(mappings) = document.get("mappings").and_then(Value::as_array) {
        return validate_flat(mappings);
    }

    match document.get("collections") {
        Some(Value::Object(collections)) => validate_nested(collections),
        Some(_) => Err(SchemaError::MissingContainer("collections object")),
        None => Err(SchemaError::MissingContainer("mappings array")),
    }
}

/// Parse schema text as JSON, then validate it.
///
/// Malformed JSON is reported as [`crate::error::LoadError::Json`], structural
/// problems as [`crate::error::LoadError::Schema`].
pub fn load_schema(text: &str) -> LoadResult<MappingSchema> {
    let document: Value = serde_json::from_str(text)?;
    Ok(validate(&document)?)
}

fn validate_flat(entries: &[Value]) -> SchemaResult<MappingSchema> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_entry(&format!("mapping {}", index), entry, true))
        .collect::<SchemaResult<Vec<_>>>()
        .map(MappingSchema::Flat)
}

fn validate_nested(collections: &Map<String, Value>) -> SchemaResult<MappingSchema> {
    let mut validated = Vec::with_capacity(collections.len());

    for (name, collection) in collections {
        let collection = collection.as_object().ok_or_else(|| SchemaError::InvalidEntry {
            entry: format!("collection '{}'", name),
            message: "is not an object".to_string(),
        })?;

        let fields = collection
            .get("mappings")
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::MissingMappings(name.clone()))?;

        let mut mappings = Vec::with_capacity(fields.len());
        for (target, entry) in fields {
            let entry_name = format!("collection '{}' field '{}'", name, target);
            mappings.push((target.clone(), parse_entry(&entry_name, entry, false)?));
        }

        let source = optional_str(collection, "source", &format!("collection '{}'", name))?;
        validated.push((name.clone(), CollectionMapping { source, mappings }));
    }

    Ok(MappingSchema::Nested(validated))
}

fn parse_entry(entry_name: &str, entry: &Value, require_to: bool) -> SchemaResult<FieldMapping> {
    let obj = entry.as_object().ok_or_else(|| SchemaError::InvalidEntry {
        entry: entry_name.to_string(),
        message: "is not an object".to_string(),
    })?;

    let from = required_str(obj, "from", entry_name)?;
    let to = if require_to {
        required_str(obj, "to", entry_name)?
    } else {
        String::new()
    };
    let tag = required_str(obj, "type", entry_name)?;

    let kind = TargetType::parse(&tag);
    if !kind.is_known() {
        return Err(SchemaError::UnknownType {
            entry: entry_name.to_string(),
            kind: tag,
        });
    }

    let default = obj.get("default").filter(|v| !v.is_null()).cloned();
    let transform = optional_str(obj, "transform", entry_name)?;

    Ok(FieldMapping {
        from,
        to,
        kind,
        default,
        transform,
    })
}

/// A property that must be a non-empty string.
fn required_str(
    obj: &Map<String, Value>,
    property: &'static str,
    entry_name: &str,
) -> SchemaResult<String> {
    match obj.get(property) {
        None | Some(Value::Null) => Err(missing(entry_name, property)),
        Some(Value::String(s)) if s.is_empty() => Err(missing(entry_name, property)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(SchemaError::InvalidEntry {
            entry: entry_name.to_string(),
            message: format!("{} must be a string", property),
        }),
    }
}

fn optional_str(
    obj: &Map<String, Value>,
    property: &'static str,
    entry_name: &str,
) -> SchemaResult<Option<String>> {
    match obj.get(property) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SchemaError::InvalidEntry {
            entry: entry_name.to_string(),
            message: format!("{} must be a string", property),
        }),
    }
}

fn missing(entry_name: &str, property: &'static str) -> SchemaError {
    SchemaError::MissingProperty {
        entry: entry_name.to_string(),
        property,
    }
}

// =============================================================================
// Examples
// =============================================================================

/// An example flat schema, covering every target type.
pub fn example_schema() -> MappingSchema {
    MappingSchema::Flat(vec![
        FieldMapping::new("Name", "profile.name", TargetType::String),
        FieldMapping::new("Age", "profile.age", TargetType::Number).with_default(json!(0)),
        FieldMapping::new("Active", "active", TargetType::Boolean).with_default(json!(false)),
        FieldMapping::new("Joined", "joinedAt", TargetType::Date),
        FieldMapping::new("Tags", "tags", TargetType::Array).with_default(json!([])),
        FieldMapping::new("Settings", "settings", TargetType::Object).with_default(json!({})),
    ])
}

/// The same mappings in the nested (collections) shape.
pub fn example_nested_schema() -> MappingSchema {
    let mappings = vec![
        ("name".to_string(), FieldMapping::new("Name", "", TargetType::String)),
        (
            "age".to_string(),
            FieldMapping::new("Age", "", TargetType::Number).with_default(json!(0)),
        ),
        (
            "active".to_string(),
            FieldMapping::new("Active", "", TargetType::Boolean).with_default(json!(false)),
        ),
        ("joinedAt".to_string(), FieldMapping::new("Joined", "", TargetType::Date)),
        (
            "tags".to_string(),
            FieldMapping::new("Tags", "", TargetType::Array).with_default(json!([])),
        ),
    ];

    MappingSchema::Nested(vec![(
        "users".to_string(),
        CollectionMapping {
            source: Some("users.csv".to_string()),
            mappings,
        },
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::models::SchemaShape;

    #[test]
    fn test_valid_flat() {
        let schema = validate(&json!({
            "mappings": [
                { "from": "Name", "to": "name", "type": "string" },
                { "from": "Age", "to": "age", "type": "number", "default": 0, "transform": "round" }
            ]
        }))
        .unwrap();

        assert_eq!(schema.shape(), SchemaShape::Flat);
        let mappings = schema.active_mappings();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[1].1.default, Some(json!(0)));
        assert_eq!(mappings[1].1.transform.as_deref(), Some("round"));
    }

    #[test]
    fn test_empty_flat_is_valid() {
        let schema = validate(&json!({ "mappings": [] })).unwrap();
        assert!(schema.is_empty());
    }

    #[test]
    fn test_missing_container() {
        let err = validate(&json!({ "fields": [] })).unwrap_err();
        assert_eq!(err, SchemaError::MissingContainer("mappings array"));

        let err = validate(&json!({ "mappings": {} })).unwrap_err();
        assert_eq!(err.to_string(), "Invalid schema: missing mappings array");

        let err = validate(&json!({ "collections": [] })).unwrap_err();
        assert_eq!(err, SchemaError::MissingContainer("collections object"));

        assert!(validate(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_flat_missing_to_names_index() {
        let err = validate(&json!({
            "mappings": [
                { "from": "a", "to": "a", "type": "string" },
                { "from": "b", "type": "string" }
            ]
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid schema: mapping 1 missing to property");
    }

    #[test]
    fn test_flat_fails_fast_on_first_entry() {
        let err = validate(&json!({
            "mappings": [
                { "to": "a", "type": "string" },
                { "from": "b", "type": "string" }
            ]
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid schema: mapping 0 missing from property");
    }

    #[test]
    fn test_empty_strings_count_as_missing() {
        let err = validate(&json!({ "mappings": [{ "from": "", "to": "a", "type": "string" }] }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingProperty { property: "from", .. }));

        let err = validate(&json!({ "mappings": [{ "from": "a", "to": "a", "type": "" }] }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingProperty { property: "type", .. }));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = validate(&json!({ "mappings": [{ "from": "a", "to": "a", "type": "uuid" }] }))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid schema: mapping 0 has unknown type 'uuid'");
    }

    #[test]
    fn test_non_object_entry() {
        let err = validate(&json!({ "mappings": ["from"] })).unwrap_err();
        assert_eq!(err.to_string(), "Invalid schema: mapping 0 is not an object");

        let err = validate(&json!({ "mappings": [{ "from": 3, "to": "a", "type": "string" }] }))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid schema: mapping 0 from must be a string");
    }

    #[test]
    fn test_default_not_checked_against_type() {
        let schema = validate(&json!({
            "mappings": [{ "from": "a", "to": "a", "type": "number", "default": "N/A" }]
        }))
        .unwrap();
        assert_eq!(schema.active_mappings()[0].1.default, Some(json!("N/A")));
    }

    #[test]
    fn test_valid_nested_keeps_declaration_order() {
        let schema = validate(&json!({
            "collections": {
                "users": {
                    "source": "users.csv",
                    "mappings": {
                        "zeta": { "from": "Z", "type": "string" },
                        "alpha": { "from": "A", "type": "number" }
                    }
                },
                "audit": { "mappings": {} }
            }
        }))
        .unwrap();

        assert_eq!(schema.shape(), SchemaShape::Nested);
        assert_eq!(schema.collection_names(), vec!["users", "audit"]);
        assert_eq!(schema.target_fields(), vec!["zeta", "alpha"]);
        assert_eq!(schema.collection("users").unwrap().source.as_deref(), Some("users.csv"));
    }

    #[test]
    fn test_nested_missing_mappings_names_collection() {
        let err = validate(&json!({
            "collections": { "users": { "source": "users.csv" } }
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid schema: collection 'users' missing mappings");
    }

    #[test]
    fn test_nested_entry_errors_name_collection_and_field() {
        let err = validate(&json!({
            "collections": { "users": { "mappings": { "email": { "type": "string" } } } }
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid schema: collection 'users' field 'email' missing from property"
        );

        let err = validate(&json!({
            "collections": { "users": { "mappings": { "email": { "from": "Email" } } } }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::MissingProperty { property: "type", .. }));
    }

    #[test]
    fn test_load_schema_distinguishes_json_errors() {
        assert!(matches!(load_schema("{ not json"), Err(LoadError::Json(_))));
        assert!(matches!(load_schema("{}"), Err(LoadError::Schema(_))));
        assert!(load_schema(r#"{"mappings": []}"#).is_ok());
    }

    #[test]
    fn test_examples_revalidate() {
        for schema in [example_schema(), example_nested_schema()] {
            let reloaded = validate(&schema.to_value()).unwrap();
            assert_eq!(reloaded, schema);
        }
    }
}
