//! Row transformer
//!
//! Applies a validated [`MappingSchema`] to parsed rows. One document per row,
//! in input order. Per-field coercion failures fall back to the mapping
//! default and are reported as [`Diagnostic`]s; they never abort the batch.
//!
//! When two mappings write the same target, the later one wins.

use serde::Serialize;
use serde_json::{Map, Value};

use super::coerce::{coerce, fallback};
use crate::models::{
    Diagnostic, Diagnostics, FieldMapping, MappingSchema, RowRecord, SchemaShape,
    TransformedDocument,
};

/// Result of transforming a batch of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformOutput {
    /// One document per input row, same order
    pub documents: Vec<TransformedDocument>,
    /// Coercion failures, in row then mapping order
    pub diagnostics: Diagnostics,
}

impl TransformOutput {
    /// Get summary statistics
    pub fn summary(&self) -> String {
        format!(
            "Transformed: {} documents, {} diagnostics",
            self.documents.len(),
            self.diagnostics.len()
        )
    }
}

/// Transform every row with the schema's active mappings.
///
/// For the nested shape this is the first declared collection. Flat-shape
/// targets containing dots (`profile.name`) are written as nested objects.
///
/// # Example
/// ```
/// use docmap::{parse, transform_all, validate};
/// use serde_json::json;
///
/// let rows = parse("id,age\n1,42\n2,abc");
/// let schema = validate(&json!({
///     "mappings": [{ "from": "age", "to": "age", "type": "number" }]
/// })).unwrap();
///
/// let out = transform_all(&rows, &schema);
/// assert_eq!(out.documents[0]["age"], json!(42));
/// assert_eq!(out.documents[1]["age"], json!(null));
/// assert_eq!(out.diagnostics.len(), 1);
/// ```
pub fn transform_all(rows: &[RowRecord], schema: &MappingSchema) -> TransformOutput {
    let dotted = schema.shape() == SchemaShape::Flat;
    execute(rows, &schema.active_mappings(), dotted)
}

/// Transform every row with the mappings of a named collection.
///
/// Returns `None` if the schema has no collection with that name.
pub fn transform_collection(
    rows: &[RowRecord],
    schema: &MappingSchema,
    name: &str,
) -> Option<TransformOutput> {
    let collection = schema.collection(name)?;
    let mappings: Vec<(&str, &FieldMapping)> = collection
        .mappings
        .iter()
        .map(|(target, m)| (target.as_str(), m))
        .collect();
    Some(execute(rows, &mappings, false))
}

fn execute(rows: &[RowRecord], mappings: &[(&str, &FieldMapping)], dotted: bool) -> TransformOutput {
    let mut output = TransformOutput::default();
    if rows.is_empty() || mappings.is_empty() {
        return output;
    }

    output.documents.reserve(rows.len());
    for (row_idx, row) in rows.iter().enumerate() {
        let document = transform_row(row, row_idx, mappings, dotted, &mut output.diagnostics);
        output.documents.push(document);
    }

    output
}

fn transform_row(
    row: &RowRecord,
    row_idx: usize,
    mappings: &[(&str, &FieldMapping)],
    dotted: bool,
    diagnostics: &mut Diagnostics,
) -> TransformedDocument {
    let mut document = Map::new();

    for (target, mapping) in mappings {
        let value = match coerce(row.get(&mapping.from), mapping) {
            Ok(value) => value,
            Err(err) => {
                diagnostics.push(Diagnostic {
                    row: row_idx,
                    source: mapping.from.clone(),
                    target: target.to_string(),
                    reason: err.to_string(),
                });
                fallback(mapping)
            }
        };

        if dotted {
            write_path(&mut document, target, value);
        } else {
            document.insert(target.to_string(), value);
        }
    }

    document
}

/// Write `value` at a dotted path, creating intermediate objects.
///
/// A non-object value sitting on the path is replaced.
fn write_path(document: &mut Map<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = document;
    for segment in parents {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot {
            Value::Object(map) => current = map,
            _ => return,
        }
    }

    current.insert(last.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectionMapping, TargetType};
    use crate::parser::parse;
    use serde_json::json;

    fn flat(mappings: Vec<FieldMapping>) -> MappingSchema {
        MappingSchema::Flat(mappings)
    }

    #[test]
    fn test_empty_inputs_yield_nothing() {
        let rows = parse("a\n1");
        let empty_schema = flat(vec![]);
        let out = transform_all(&rows, &empty_schema);
        assert!(out.documents.is_empty());
        assert!(out.diagnostics.is_empty());

        let schema = flat(vec![FieldMapping::new("a", "a", TargetType::Number)]);
        let out = transform_all(&[], &schema);
        assert_eq!(out, TransformOutput::default());
    }

    #[test]
    fn test_one_document_per_row_in_order() {
        let rows = parse("id\n3\n1\n2\n1");
        let schema = flat(vec![FieldMapping::new("id", "id", TargetType::Number)]);
        let out = transform_all(&rows, &schema);
        let ids: Vec<Value> = out.documents.iter().map(|d| d["id"].clone()).collect();
        assert_eq!(ids, vec![json!(3), json!(1), json!(2), json!(1)]);
    }

    #[test]
    fn test_failure_uses_default_and_records_diagnostic() {
        let rows = parse("name,age,active\nAda,abc,maybe");
        let schema = flat(vec![
            FieldMapping::new("name", "name", TargetType::String),
            FieldMapping::new("age", "age", TargetType::Number).with_default(json!(-1)),
            FieldMapping::new("active", "active", TargetType::Boolean),
        ]);

        let out = transform_all(&rows, &schema);
        assert_eq!(
            Value::Object(out.documents[0].clone()),
            json!({"name": "Ada", "age": -1, "active": null})
        );
        assert_eq!(
            out.diagnostics.messages(),
            vec![
                "Failed to convert age to age: Cannot convert \"abc\" to number".to_string(),
                "Failed to convert active to active: Cannot convert \"maybe\" to boolean".to_string(),
            ]
        );
        assert_eq!(out.diagnostics.iter().next().unwrap().row, 0);
    }

    #[test]
    fn test_missing_column_behaves_like_empty() {
        let rows = parse("a\n1");
        let schema = flat(vec![
            FieldMapping::new("nope", "x", TargetType::Number).with_default(json!("N/A")),
            FieldMapping::new("nope", "y", TargetType::Date),
        ]);
        let out = transform_all(&rows, &schema);
        assert_eq!(out.documents[0]["x"], json!("N/A"));
        assert_eq!(out.documents[0]["y"], Value::Null);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_duplicate_target_last_write_wins() {
        let rows = parse("a,b\n1,2");
        let schema = flat(vec![
            FieldMapping::new("a", "value", TargetType::Number),
            FieldMapping::new("b", "value", TargetType::String),
        ]);
        let out = transform_all(&rows, &schema);
        assert_eq!(out.documents[0].len(), 1);
        assert_eq!(out.documents[0]["value"], json!("2"));
    }

    #[test]
    fn test_dotted_targets_build_nested_objects() {
        let rows = parse("first,last,age\nAda,Lovelace,36");
        let schema = flat(vec![
            FieldMapping::new("first", "profile.name.first", TargetType::String),
            FieldMapping::new("last", "profile.name.last", TargetType::String),
            FieldMapping::new("age", "profile.age", TargetType::Number),
        ]);
        let out = transform_all(&rows, &schema);
        assert_eq!(
            Value::Object(out.documents[0].clone()),
            json!({"profile": {"name": {"first": "Ada", "last": "Lovelace"}, "age": 36}})
        );
    }

    #[test]
    fn test_dotted_target_replaces_scalar() {
        let rows = parse("a,b\nx,y");
        let schema = flat(vec![
            FieldMapping::new("a", "meta", TargetType::String),
            FieldMapping::new("b", "meta.b", TargetType::String),
        ]);
        let out = transform_all(&rows, &schema);
        assert_eq!(Value::Object(out.documents[0].clone()), json!({"meta": {"b": "y"}}));
    }

    #[test]
    fn test_nested_shape_writes_keys_literally() {
        let rows = parse("Email,Total\na@b.c,9.5");
        let schema = MappingSchema::Nested(vec![
            (
                "users".into(),
                CollectionMapping {
                    source: None,
                    mappings: vec![("contact.email".into(), FieldMapping::new("Email", "", TargetType::String))],
                },
            ),
            (
                "orders".into(),
                CollectionMapping {
                    source: None,
                    mappings: vec![("total".into(), FieldMapping::new("Total", "", TargetType::Number))],
                },
            ),
        ]);

        let out = transform_all(&rows, &schema);
        assert_eq!(out.documents[0]["contact.email"], json!("a@b.c"));

        let orders = transform_collection(&rows, &schema, "orders").unwrap();
        assert_eq!(orders.documents[0]["total"], json!(9.5));
        assert!(transform_collection(&rows, &schema, "missing").is_none());
    }

    #[test]
    fn test_idempotent() {
        let rows = parse("n,d\n1,x\n2,2024-01-01");
        let schema = flat(vec![
            FieldMapping::new("n", "n", TargetType::Number),
            FieldMapping::new("d", "d", TargetType::Date),
        ]);
        let first = transform_all(&rows, &schema);
        let second = transform_all(&rows, &schema);
        assert_eq!(first, second);
        assert_eq!(first.diagnostics.len(), 1);
    }

    #[test]
    fn test_write_path_single_segment() {
        let mut doc = Map::new();
        write_path(&mut doc, "plain", json!(1));
        assert_eq!(doc["plain"], json!(1));
    }
}
