//! High-level pipeline API: raw CSV + schema text to documents.
//!
//! Combines parsing, schema loading, transformation and export helpers, and
//! reports progress through [`crate::logs`]. Schema problems abort;
//! coercion failures are only warnings.
//!
//! # Example
//!
//! ```rust,no_run
//! use docmap::pipeline::{transform_files, TransformOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let output = transform_files(
//!         Path::new("users.csv"),
//!         Path::new("mapping.json"),
//!         &TransformOptions::default(),
//!     )?;
//!
//!     println!("{}", output.documents_json(true)?);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::executor::{transform_all, transform_collection, TransformOutput};
use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning, log_warning_indent};
use crate::models::{Diagnostics, MappingSchema, SchemaShape, TransformedDocument};
use crate::parser::{parse_bytes_auto, ParseResult};
use crate::validation::load_schema;

/// Number of documents shown in the preview table.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Number of diagnostics shown before collapsing into "... and K more".
pub const DEFAULT_DIAGNOSTIC_LIMIT: usize = 10;

/// Options for the transformation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Cell separator; `None` detects it from the header line
    pub delimiter: Option<char>,

    /// Collection to transform (nested schemas); `None` uses the first one
    pub collection: Option<String>,

    /// Number of documents kept for preview
    pub preview_rows: usize,

    /// Number of diagnostics listed before summarising the rest
    pub diagnostic_limit: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            delimiter: Some(crate::parser::DEFAULT_DELIMITER),
            collection: None,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            diagnostic_limit: DEFAULT_DIAGNOSTIC_LIMIT,
        }
    }
}

impl TransformOptions {
    /// Defaults overlaid with `DOCMAP_*` environment variables.
    ///
    /// - `DOCMAP_DELIMITER`: a single character, `tab`, or `auto`
    /// - `DOCMAP_PREVIEW_ROWS`: number
    /// - `DOCMAP_DIAGNOSTIC_LIMIT`: number
    ///
    /// Unusable values are skipped with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(raw) = lookup("DOCMAP_DELIMITER") {
            match parse_delimiter(&raw) {
                Some(delimiter) => options.delimiter = delimiter,
                None => log_warning(format!("Ignoring DOCMAP_DELIMITER='{}'", raw)),
            }
        }
        if let Some(raw) = lookup("DOCMAP_PREVIEW_ROWS") {
            match raw.trim().parse() {
                Ok(n) => options.preview_rows = n,
                Err(_) => log_warning(format!("Ignoring DOCMAP_PREVIEW_ROWS='{}'", raw)),
            }
        }
        if let Some(raw) = lookup("DOCMAP_DIAGNOSTIC_LIMIT") {
            match raw.trim().parse() {
                Ok(n) => options.diagnostic_limit = n,
                Err(_) => log_warning(format!("Ignoring DOCMAP_DIAGNOSTIC_LIMIT='{}'", raw)),
            }
        }

        options
    }
}

/// Parse a delimiter setting: `auto` -> `Some(None)`, `tab`/`\t` -> tab,
/// any single character -> itself. Anything else is `None`.
pub fn parse_delimiter(raw: &str) -> Option<Option<char>> {
    match raw {
        "auto" => Some(None),
        "tab" | "\\t" | "\t" => Some(Some('\t')),
        _ => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(Some(c)),
                _ => None,
            }
        }
    }
}

/// CSV input information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    /// One document per data row
    pub documents: Vec<TransformedDocument>,

    /// Coercion failures of this run
    pub diagnostics: Diagnostics,

    /// CSV parsing metadata
    pub csv_info: CsvInfo,

    /// Shape of the schema that was applied
    pub schema_shape: SchemaShape,

    /// Collection that was transformed (nested schemas)
    pub collection: Option<String>,

    /// Source columns referenced by the schema but absent from the CSV
    pub missing_sources: Vec<String>,

    /// Number of documents returned by [`PipelineOutput::head`]
    pub preview_rows: usize,
}

impl PipelineOutput {
    /// The first `n` documents.
    pub fn preview(&self, n: usize) -> &[TransformedDocument] {
        &self.documents[..n.min(self.documents.len())]
    }

    /// The first documents, as many as the run's `preview_rows` option.
    pub fn head(&self) -> &[TransformedDocument] {
        self.preview(self.preview_rows)
    }

    /// All documents as one JSON array.
    pub fn documents_json(&self, pretty: bool) -> PipelineResult<String> {
        documents_json(&self.documents, pretty)
    }

    /// The first `n` documents as pretty JSON, with `... and more` appended
    /// when there are more documents than shown.
    pub fn export_preview(&self, n: usize) -> PipelineResult<String> {
        let mut text = documents_json(self.preview(n), true)?;
        if self.documents.len() > n {
            text.push_str("\n\n... and more");
        }
        Ok(text)
    }
}

/// Serialize documents as a JSON array.
pub fn documents_json(documents: &[TransformedDocument], pretty: bool) -> PipelineResult<String> {
    let result = if pretty {
        serde_json::to_string_pretty(documents)
    } else {
        serde_json::to_string(documents)
    };
    result.map_err(PipelineError::Output)
}

/// Suggested download name: `<collection>-mongodb.json`.
///
/// Flat schemas have no collection name and use `export`.
pub fn export_file_name(schema: &MappingSchema) -> String {
    format!("{}-mongodb.json", schema.primary_collection().unwrap_or("export"))
}

/// Transform CSV and schema files.
pub fn transform_files(
    csv_path: &Path,
    schema_path: &Path,
    options: &TransformOptions,
) -> PipelineResult<PipelineOutput> {
    log_info(format!("Reading CSV file: {}", csv_path.display()));
    let bytes = std::fs::read(csv_path)?;

    log_info(format!("Reading schema: {}", schema_path.display()));
    let schema_text = std::fs::read_to_string(schema_path)?;

    transform_bytes(&bytes, &schema_text, options)
}

/// Transform raw CSV bytes (encoding detected) with schema text.
pub fn transform_bytes(
    bytes: &[u8],
    schema_text: &str,
    options: &TransformOptions,
) -> PipelineResult<PipelineOutput> {
    let schema = load_schema(schema_text)?;
    log_success(format!(
        "Schema loaded: {} shape, {} mappings",
        schema.shape(),
        schema.mapping_count()
    ));

    let parsed = parse_bytes_auto(bytes, options.delimiter)?;
    transform_parsed(parsed, &schema, options)
}

/// Transform CSV text with schema text.
pub fn transform_text(
    csv_text: &str,
    schema_text: &str,
    options: &TransformOptions,
) -> PipelineResult<PipelineOutput> {
    transform_bytes(csv_text.as_bytes(), schema_text, options)
}

/// Transform already-parsed rows with an already-validated schema.
pub fn transform_parsed(
    parsed: ParseResult,
    schema: &MappingSchema,
    options: &TransformOptions,
) -> PipelineResult<PipelineOutput> {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows", parsed.rows.len()));

    if parsed.rows.is_empty() {
        log_warning("No data rows (a header line and at least one data line are needed)");
    } else {
        log_info(format!("CSV has {} columns:", parsed.headers.len()));
        for (i, col) in parsed.headers.iter().enumerate() {
            log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
        }
    }

    // Without data rows there are no headers to check against
    let missing_sources = if parsed.rows.is_empty() {
        Vec::new()
    } else {
        schema.missing_sources(&parsed.headers)
    };
    if !missing_sources.is_empty() {
        log_warning(format!(
            "Columns referenced by the schema but not in the CSV: {}",
            missing_sources.join(", ")
        ));
    }

    let (collection, result) = match &options.collection {
        Some(name) => {
            let result = transform_collection(&parsed.rows, schema, name)
                .ok_or_else(|| PipelineError::UnknownCollection(name.clone()))?;
            (Some(name.clone()), result)
        }
        None => (
            schema.primary_collection().map(str::to_string),
            transform_all(&parsed.rows, schema),
        ),
    };

    report(&result, options.diagnostic_limit);

    let TransformOutput { documents, diagnostics } = result;
    Ok(PipelineOutput {
        documents,
        diagnostics,
        csv_info: CsvInfo {
            encoding: parsed.encoding,
            delimiter: parsed.delimiter,
            headers: parsed.headers,
            row_count: parsed.rows.len(),
        },
        schema_shape: schema.shape(),
        collection,
        missing_sources,
        preview_rows: options.preview_rows,
    })
}

fn report(result: &TransformOutput, diagnostic_limit: usize) {
    log_info(result.summary());
    if result.diagnostics.is_empty() {
        log_success("All values converted");
        return;
    }

    log_warning(format!("{} values fell back to their default", result.diagnostics.len()));
    for line in result.diagnostics.summary(diagnostic_limit) {
        log_warning_indent(line, 1);
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::io::Write;

    const CSV: &str = "Name,Age,Active\nAda,36,yes\nAlan,unknown,no\n";
    const SCHEMA: &str = r#"{
        "mappings": [
            { "from": "Name", "to": "profile.name", "type": "string" },
            { "from": "Age", "to": "profile.age", "type": "number", "default": 0 },
            { "from": "Active", "to": "active", "type": "boolean" }
        ]
    }"#;

    fn quiet() {
        crate::logs::LOG_BROADCASTER.set_echo(false);
    }

    #[test]
    fn test_default_options() {
        let opts = TransformOptions::default();
        assert_eq!(opts.delimiter, Some(','));
        assert_eq!(opts.preview_rows, 5);
        assert_eq!(opts.diagnostic_limit, 10);
        assert!(opts.collection.is_none());
    }

    #[test]
    fn test_options_from_lookup() {
        quiet();
        let env: HashMap<&str, &str> = [
            ("DOCMAP_DELIMITER", "auto"),
            ("DOCMAP_PREVIEW_ROWS", "3"),
            ("DOCMAP_DIAGNOSTIC_LIMIT", "lots"),
        ]
        .into_iter()
        .collect();

        let opts = TransformOptions::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(opts.delimiter, None);
        assert_eq!(opts.preview_rows, 3);
        assert_eq!(opts.diagnostic_limit, DEFAULT_DIAGNOSTIC_LIMIT);
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter("auto"), Some(None));
        assert_eq!(parse_delimiter("tab"), Some(Some('\t')));
        assert_eq!(parse_delimiter(";"), Some(Some(';')));
        assert_eq!(parse_delimiter(";;"), None);
        assert_eq!(parse_delimiter(""), None);
    }

    #[test]
    fn test_transform_text() {
        quiet();
        let output = transform_text(CSV, SCHEMA, &TransformOptions::default()).unwrap();

        assert_eq!(output.csv_info.row_count, 2);
        assert_eq!(output.csv_info.headers, vec!["Name", "Age", "Active"]);
        assert_eq!(output.schema_shape, SchemaShape::Flat);
        assert_eq!(
            Value::Object(output.documents[0].clone()),
            json!({"profile": {"name": "Ada", "age": 36}, "active": true})
        );
        assert_eq!(output.documents[1]["profile"]["age"], json!(0));
        assert_eq!(output.diagnostics.len(), 1);
    }

    #[test]
    fn test_schema_errors_abort() {
        quiet();
        let err = transform_text(CSV, r#"{"mappings": [{"from": "Name"}]}"#, &TransformOptions::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid schema: mapping 0 missing to property");

        let err = transform_text(CSV, "not json", &TransformOptions::default()).unwrap_err();
        assert!(err.to_string().starts_with("Malformed JSON"));
    }

    #[test]
    fn test_header_only_csv_yields_no_documents() {
        quiet();
        let output = transform_text("Name,Age\n", SCHEMA, &TransformOptions::default()).unwrap();
        assert!(output.documents.is_empty());
        assert!(output.diagnostics.is_empty());
        assert!(output.missing_sources.is_empty());
    }

    #[test]
    fn test_missing_sources_reported() {
        quiet();
        let output = transform_text("Name,Active
Ada,yes", SCHEMA, &TransformOptions::default()).unwrap();
        assert_eq!(output.missing_sources, vec!["Age"]);
        assert_eq!(output.documents[0]["profile"]["age"], json!(0));
    }

    #[test]
    fn test_preview_rows_from_env_limits_head() {
        quiet();
        let env: HashMap<&str, &str> = [("DOCMAP_PREVIEW_ROWS", "1")].into_iter().collect();
        let options = TransformOptions::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        let output = transform_text(CSV, SCHEMA, &options).unwrap();
        assert_eq!(output.documents.len(), 2);
        assert_eq!(output.head().len(), 1);
        assert_eq!(output.head()[0]["profile"]["name"], json!("Ada"));

        let output = transform_text(CSV, SCHEMA, &TransformOptions::default()).unwrap();
        assert_eq!(output.head().len(), 2);
    }

    #[test]
    fn test_named_collection() {
        quiet();
        let schema = r#"{"collections": {
            "users": {"mappings": {"name": {"from": "Name", "type": "string"}}},
            "ages": {"mappings": {"age": {"from": "Age", "type": "number"}}}
        }}"#;
        let options = TransformOptions {
            collection: Some("ages".to_string()),
            ..TransformOptions::default()
        };
        let output = transform_text(CSV, schema, &options).unwrap();
        assert_eq!(output.collection.as_deref(), Some("ages"));
        assert_eq!(output.documents[0]["age"], json!(36));

        let options = TransformOptions {
            collection: Some("nope".to_string()),
            ..TransformOptions::default()
        };
        assert!(matches!(
            transform_text(CSV, schema, &options),
            Err(PipelineError::UnknownCollection(_))
        ));
    }

    #[test]
    fn test_auto_delimiter() {
        quiet();
        let options = TransformOptions {
            delimiter: None,
            ..TransformOptions::default()
        };
        let output = transform_text("Name;Age;Active\nAda;36;1", SCHEMA, &options).unwrap();
        assert_eq!(output.csv_info.delimiter, ';');
        assert_eq!(output.documents[0]["active"], json!(true));
    }

    #[test]
    fn test_export_helpers() {
        quiet();
        let output = transform_text(CSV, SCHEMA, &TransformOptions::default()).unwrap();
        assert_eq!(output.preview(1).len(), 1);
        assert_eq!(output.preview(50).len(), 2);
        assert!(output.export_preview(1).unwrap().ends_with("... and more"));
        assert!(!output.export_preview(2).unwrap().contains("... and more"));

        let compact = output.documents_json(false).unwrap();
        let parsed: Value = serde_json::from_str(&compact).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);

        assert_eq!(export_file_name(&MappingSchema::default()), "export-mongodb.json");
        assert_eq!(
            export_file_name(&crate::validation::example_nested_schema()),
            "users-mongodb.json"
        );
    }

    #[test]
    fn test_transform_files() {
        quiet();
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("people.csv");
        let schema_path = dir.path().join("schema.json");

        let mut csv = std::fs::File::create(&csv_path).unwrap();
        csv.write_all("Name,Age,Active\nSociété,12,0\n".as_bytes()).unwrap();
        std::fs::write(&schema_path, SCHEMA).unwrap();

        let output = transform_files(&csv_path, &schema_path, &TransformOptions::default()).unwrap();
        assert_eq!(output.documents.len(), 1);
        assert_eq!(output.documents[0]["profile"]["name"], json!("Société"));
        assert_eq!(output.documents[0]["active"], json!(false));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        quiet();
        let err = transform_files(
            Path::new("/definitely/not/here.csv"),
            Path::new("/nor/here.json"),
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Failed to read file"));
    }
}
