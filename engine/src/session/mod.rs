//! Session state for interactive front-ends.
//!
//! Holds the currently loaded CSV rows and schema, and recomputes the
//! documents on request. Every recompute is a full, fresh run of
//! [`transform_all`]; the session only decides which diagnostics to keep.

use crate::error::LoadResult;
use crate::logs::{log_info, log_success, log_warning};
use crate::models::{Diagnostics, MappingSchema, RowRecord, TransformedDocument};
use crate::parser::{self, DEFAULT_DELIMITER};
use crate::transform::executor::{transform_all, TransformOutput};
use crate::transform::pipeline::DEFAULT_PREVIEW_ROWS;
use crate::validation::load_schema;

/// Loaded inputs plus retained diagnostics history.
#[derive(Debug, Clone)]
pub struct Session {
    rows: Vec<RowRecord>,
    headers: Vec<String>,
    file_name: Option<String>,
    schema: MappingSchema,
    history: Diagnostics,
    delimiter: char,
    preview_rows: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            headers: Vec::new(),
            file_name: None,
            schema: MappingSchema::default(),
            history: Diagnostics::new(),
            delimiter: DEFAULT_DELIMITER,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }

    /// Use another cell separator for subsequent CSV loads.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Number of documents returned by [`Session::preview`].
    pub fn with_preview_rows(mut self, preview_rows: usize) -> Self {
        self.preview_rows = preview_rows;
        self
    }

    /// Parse CSV text and make it the current data.
    ///
    /// Text without data rows leaves the current data in place. Returns the
    /// number of rows parsed.
    pub fn load_csv_text(&mut self, file_name: &str, text: &str) -> usize {
        let rows = parser::parse_with_delimiter(text, self.delimiter);
        if rows.is_empty() {
            log_warning(format!("{}: no data rows, keeping current data", file_name));
            return 0;
        }

        self.headers = rows[0].headers().map(str::to_string).collect();
        self.file_name = Some(file_name.to_string());
        self.rows = rows;
        log_success(format!("{}: {} rows, {} columns", file_name, self.rows.len(), self.headers.len()));
        self.rows.len()
    }

    /// Load schema text. On any error the current schema is left untouched.
    pub fn load_schema_text(&mut self, text: &str) -> LoadResult<()> {
        let schema = load_schema(text)?;
        log_success(format!("Schema loaded: {} mappings", schema.mapping_count()));
        self.schema = schema;
        Ok(())
    }

    /// Replace the schema wholesale (e.g. after editing).
    pub fn set_schema(&mut self, schema: MappingSchema) {
        self.schema = schema;
    }

    pub fn schema(&self) -> &MappingSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Diagnostics retained across recomputes, oldest first.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.history
    }

    /// Run the transform on the current inputs.
    ///
    /// The run's diagnostics are appended to the retained history.
    pub fn recompute(&mut self) -> TransformOutput {
        let output = transform_all(&self.rows, &self.schema);
        if !output.documents.is_empty() {
            log_info(output.summary());
        }
        self.history.extend(output.diagnostics.clone());
        output
    }

    /// The first documents of a fresh run, without touching the history.
    pub fn preview(&self) -> Vec<TransformedDocument> {
        let mut output = transform_all(&self.rows, &self.schema);
        output.documents.truncate(self.preview_rows);
        output.documents
    }

    pub fn clear_csv(&mut self) {
        self.rows.clear();
        self.headers.clear();
        self.file_name = None;
    }

    pub fn clear_schema(&mut self) {
        self.schema = MappingSchema::default();
    }

    pub fn clear_diagnostics(&mut self) {
        self.history = Diagnostics::new();
    }
}
