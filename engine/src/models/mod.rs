//! Domain models for the Docmap transformation engine.
//!
//! - [`RowRecord`] - One parsed CSV data line, keyed by header name
//! - [`TargetType`] - The kind a raw cell is coerced to
//! - [`FieldMapping`] - One coercion rule (source field, target, type, default)
//! - [`MappingSchema`] - Flat list of mappings or named collections of mappings
//! - [`TransformedDocument`] - One output document per input row
//! - [`Diagnostic`] / [`Diagnostics`] - Recoverable coercion failures

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// =============================================================================
// Row Records
// =============================================================================

/// One data line of a CSV file, keyed by header name in header order.
///
/// Values are raw trimmed cell text. Rows are never mutated after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowRecord {
    cells: Map<String, Value>,
}

impl RowRecord {
    /// Build a record from header names and cell values.
    ///
    /// Missing trailing cells become empty strings, extra cells are ignored.
    /// If a header name repeats, the later column wins and the key keeps
    /// its first position.
    pub fn from_cells(headers: &[String], cells: &[String]) -> Self {
        let mut map = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let value = cells.get(i).cloned().unwrap_or_default();
            map.insert(header.clone(), Value::String(value));
        }
        Self { cells: map }
    }

    /// Raw value for a header, `None` if the header is not present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.cells.get(field).and_then(Value::as_str)
    }

    /// Header names in header order.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// (header, value) pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str().unwrap_or("")))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RowRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let cells = iter
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Self { cells }
    }
}

// =============================================================================
// Target Types
// =============================================================================

/// The kind a raw cell value is coerced to.
///
/// `Other` only exists so that hand-built mappings with an unrecognised tag
/// still transform (the value is passed through). The schema validator never
/// produces it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetType {
    String,
    Number,
    Boolean,
    Date,
    Array,
    Object,
    Other(String),
}

impl TargetType {
    /// All recognised kinds, in documentation order.
    pub const KNOWN: [TargetType; 6] = [
        TargetType::String,
        TargetType::Number,
        TargetType::Boolean,
        TargetType::Date,
        TargetType::Array,
        TargetType::Object,
    ];

    /// Parse a type tag. Unrecognised tags map to [`TargetType::Other`].
    pub fn parse(tag: &str) -> Self {
        match tag {
            "string" => TargetType::String,
            "number" => TargetType::Number,
            "boolean" => TargetType::Boolean,
            "date" => TargetType::Date,
            "array" => TargetType::Array,
            "object" => TargetType::Object,
            other => TargetType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TargetType::String => "string",
            TargetType::Number => "number",
            TargetType::Boolean => "boolean",
            TargetType::Date => "date",
            TargetType::Array => "array",
            TargetType::Object => "object",
            TargetType::Other(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TargetType::Other(_))
    }

    /// One-line description used by `docmap types`.
    pub fn description(&self) -> &'static str {
        match self {
            TargetType::String => "Value copied unchanged",
            TargetType::Number => "Finite number (decimal, exponent, 0x/0o/0b integers)",
            TargetType::Boolean => "true/1/yes or false/0/no, case-insensitive",
            TargetType::Date => "Calendar date/time, emitted as UTC ISO-8601 with milliseconds",
            TargetType::Array => "JSON value if it parses, otherwise comma-split list of strings",
            TargetType::Object => "JSON value; unparseable text is a failure",
            TargetType::Other(_) => "Value passed through unchanged",
        }
    }
}

impl From<String> for TargetType {
    fn from(tag: String) -> Self {
        TargetType::parse(&tag)
    }
}

impl From<TargetType> for String {
    fn from(kind: TargetType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Field Mappings
// =============================================================================

/// One coercion rule: where a value comes from, where it goes, and its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Source column (header name) in the CSV.
    pub from: String,

    /// Target field or dotted path. Empty in the nested shape, where the
    /// target is the key the mapping is stored under.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,

    /// Target type.
    #[serde(rename = "type")]
    pub kind: TargetType,

    /// Value used when the source is empty or coercion fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Named transform; reserved, not applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

impl FieldMapping {
    /// Create a mapping from a source column to a target field.
    pub fn new(from: &str, to: &str, kind: TargetType) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            default: None,
            transform: None,
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Set the reserved transform identifier.
    pub fn with_transform(mut self, transform: &str) -> Self {
        self.transform = Some(transform.to_string());
        self
    }
}

/// A named target collection in the nested schema shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionMapping {
    /// Identifier of the source the collection is fed from (informational).
    pub source: Option<String>,

    /// Target field name -> mapping, in declaration order.
    pub mappings: Vec<(String, FieldMapping)>,
}

// =============================================================================
// Mapping Schemas
// =============================================================================

/// Which of the two schema shapes a document uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaShape {
    Flat,
    Nested,
}

impl fmt::Display for SchemaShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaShape::Flat => f.write_str("flat"),
            SchemaShape::Nested => f.write_str("nested"),
        }
    }
}

/// A validated mapping schema.
///
/// Schemas are immutable values: the authoring helpers return a new schema
/// and the engine only ever reads them.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingSchema {
    /// `{"mappings": [{"from", "to", "type", "default"?}, ...]}`
    Flat(Vec<FieldMapping>),
    /// `{"collections": {"<name>": {"source"?, "mappings": {"<target>": {...}}}}}`
    Nested(Vec<(String, CollectionMapping)>),
}

impl Default for MappingSchema {
    fn default() -> Self {
        MappingSchema::Flat(Vec::new())
    }
}

impl MappingSchema {
    pub fn shape(&self) -> SchemaShape {
        match self {
            MappingSchema::Flat(_) => SchemaShape::Flat,
            MappingSchema::Nested(_) => SchemaShape::Nested,
        }
    }

    /// Name of the first declared collection (nested shape only).
    pub fn primary_collection(&self) -> Option<&str> {
        match self {
            MappingSchema::Flat(_) => None,
            MappingSchema::Nested(collections) => collections.first().map(|(n, _)| n.as_str()),
        }
    }

    /// Look up a collection by name (nested shape only).
    pub fn collection(&self, name: &str) -> Option<&CollectionMapping> {
        match self {
            MappingSchema::Flat(_) => None,
            MappingSchema::Nested(collections) => collections
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, c)| c),
        }
    }

    /// Collection names in declaration order.
    pub fn collection_names(&self) -> Vec<&str> {
        match self {
            MappingSchema::Flat(_) => Vec::new(),
            MappingSchema::Nested(collections) => {
                collections.iter().map(|(n, _)| n.as_str()).collect()
            }
        }
    }

    /// (target, mapping) pairs the transformer applies, in declaration order.
    ///
    /// For the nested shape this is the first collection.
    pub fn active_mappings(&self) -> Vec<(&str, &FieldMapping)> {
        match self {
            MappingSchema::Flat(mappings) => {
                mappings.iter().map(|m| (m.to.as_str(), m)).collect()
            }
            MappingSchema::Nested(collections) => collections
                .first()
                .map(|(_, c)| c.mappings.iter().map(|(t, m)| (t.as_str(), m)).collect())
                .unwrap_or_default(),
        }
    }

    /// Number of mappings the transformer would apply.
    pub fn mapping_count(&self) -> usize {
        self.active_mappings().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping_count() == 0
    }

    /// Distinct source columns referenced by the active mappings.
    pub fn source_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for (_, m) in self.active_mappings() {
            if !fields.contains(&m.from) {
                fields.push(m.from.clone());
            }
        }
        fields
    }

    /// Target fields of the active mappings, duplicates included.
    pub fn target_fields(&self) -> Vec<String> {
        self.active_mappings()
            .into_iter()
            .map(|(t, _)| t.to_string())
            .collect()
    }

    /// Source columns referenced by the schema that are absent from `headers`.
    pub fn missing_sources(&self, headers: &[String]) -> Vec<String> {
        self.source_fields()
            .into_iter()
            .filter(|s| !headers.contains(s))
            .collect()
    }

    /// Append a mapping (flat shape). Nested schemas are returned unchanged.
    pub fn with_mapping(&self, mapping: FieldMapping) -> Self {
        match self {
            MappingSchema::Flat(mappings) => {
                let mut next = mappings.clone();
                next.push(mapping);
                MappingSchema::Flat(next)
            }
            nested => nested.clone(),
        }
    }

    /// Remove the mapping at `index` (flat shape). Out-of-range is a no-op.
    pub fn without_mapping(&self, index: usize) -> Self {
        match self {
            MappingSchema::Flat(mappings) => MappingSchema::Flat(
                mappings
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, m)| m.clone())
                    .collect(),
            ),
            nested => nested.clone(),
        }
    }

    /// Replace the mapping at `index` (flat shape). Out-of-range is a no-op.
    pub fn with_replaced_mapping(&self, index: usize, mapping: FieldMapping) -> Self {
        match self {
            MappingSchema::Flat(mappings) => MappingSchema::Flat(
                mappings
                    .iter()
                    .enumerate()
                    .map(|(i, m)| if i == index { mapping.clone() } else { m.clone() })
                    .collect(),
            ),
            nested => nested.clone(),
        }
    }

    /// JSON form of the schema, in the shape it was loaded from.
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        match self {
            MappingSchema::Flat(mappings) => {
                let entries = mappings
                    .iter()
                    .map(|m| serde_json::to_value(m).unwrap_or(Value::Null))
                    .collect();
                root.insert("mappings".to_string(), Value::Array(entries));
            }
            MappingSchema::Nested(collections) => {
                let mut out = Map::new();
                for (name, collection) in collections {
                    let mut entry = Map::new();
                    if let Some(source) = &collection.source {
                        entry.insert("source".to_string(), Value::String(source.clone()));
                    }
                    let fields: Map<String, Value> = collection
                        .mappings
                        .iter()
                        .map(|(target, m)| {
                            (target.clone(), serde_json::to_value(m).unwrap_or(Value::Null))
                        })
                        .collect();
                    entry.insert("mappings".to_string(), Value::Object(fields));
                    out.insert(name.clone(), Value::Object(entry));
                }
                root.insert("collections".to_string(), Value::Object(out));
            }
        }
        Value::Object(root)
    }

    /// Pretty-printed JSON, as written by schema export.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_value())
    }
}

// =============================================================================
// Output
// =============================================================================

/// One output document: target field -> coerced value, in mapping order.
pub type TransformedDocument = Map<String, Value>;

/// A recoverable coercion failure for one (row, mapping) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Zero-based index of the row in the input sequence.
    pub row: usize,
    /// Source column the value came from.
    pub source: String,
    /// Target field the value was written to.
    pub target: String,
    /// Why coercion failed.
    pub reason: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to convert {} to {}: {}",
            self.source, self.target, self.reason
        )
    }
}

/// Ordered, append-only list of diagnostics from one transform run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Append another run's diagnostics, keeping order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// Human-readable messages, in order.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    /// The first `limit` messages, followed by `... and K more` if truncated.
    pub fn summary(&self, limit: usize) -> Vec<String> {
        let mut lines: Vec<String> = self.0.iter().take(limit).map(ToString::to_string).collect();
        if self.0.len() > limit {
            lines.push(format!("... and {} more", self.0.len() - limit));
        }
        lines
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
