//! # Docmap - CSV rows to typed JSON documents
//!
//! Docmap turns delimited text into documents for a document store, driven by
//! a user-supplied field-mapping schema.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │  CSV text   │────▶│   Parser    │──── rows ────┐
//! └─────────────┘     └─────────────┘              ▼
//!                                           ┌─────────────┐     ┌──────────────────┐
//!                                           │ Transformer │────▶│ documents +      │
//!                                           └─────────────┘     │ diagnostics      │
//! ┌─────────────┐     ┌─────────────┐              ▲            └──────────────────┘
//! │ schema JSON │────▶│  Validator  │─── schema ───┘
//! └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use docmap::{load_schema, parse, transform_all};
//!
//! let rows = parse("name,age\nAda,36\nAlan,?\n");
//! let schema = load_schema(r#"{"mappings": [
//!     {"from": "name", "to": "name", "type": "string"},
//!     {"from": "age", "to": "age", "type": "number", "default": 0}
//! ]}"#).unwrap();
//!
//! let output = transform_all(&rows, &schema);
//! assert_eq!(output.documents.len(), 2);
//! assert_eq!(output.diagnostics.len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Rows, mappings, schemas, diagnostics
//! - [`parser`] - Quote-aware CSV parsing and byte decoding
//! - [`validation`] - Mapping schema validation
//! - [`transform`] - Coercion, row transformation and pipeline
//! - [`session`] - Loaded inputs for interactive front-ends
//! - [`logs`] - Progress log broadcasting

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Front-end state
pub mod session;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CoercionError,
    LoadError,
    PipelineError,
    SchemaError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CollectionMapping,
    Diagnostic,
    Diagnostics,
    FieldMapping,
    MappingSchema,
    RowRecord,
    SchemaShape,
    TargetType,
    TransformedDocument,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    parse,
    parse_with_delimiter,
    parse_bytes_auto,
    split_cells,
    detect_encoding,
    detect_delimiter,
    decode_content,
    ParseResult,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    validate,
    load_schema,
    example_schema,
    example_nested_schema,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    coerce,
    transform_all,
    transform_collection,
    TransformOutput,
};

// Pipeline
pub mod pipeline {
    pub use crate::transform::pipeline::*;
}

pub use session::Session;
