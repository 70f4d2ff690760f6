//! Error types for the Docmap transformation engine.
//!
//! Errors are split by the stage that discovers them:
//!
//! - [`SchemaError`] - Structurally invalid mapping schema (fail fast)
//! - [`LoadError`] - Reading or decoding schema/CSV input (includes malformed JSON)
//! - [`CoercionError`] - A single value could not be converted to its target type
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Coercion errors never leave the row transformer: they are turned into
//! diagnostics. Everything else aborts the operation that raised it.
//! Conversion is automatic via `From` implementations, so `?` works across
//! error boundaries.

use thiserror::Error;

// =============================================================================
// Schema Errors
// =============================================================================

/// Structural violations found while validating a mapping schema.
///
/// `entry` identifies the offending mapping: `mapping 3` for the flat shape,
/// `collection 'users' field 'email'` for the nested shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The root does not contain the expected container.
    #[error("Invalid schema: missing {0}")]
    MissingContainer(&'static str),

    /// A collection of the nested shape has no `mappings` object.
    #[error("Invalid schema: collection '{0}' missing mappings")]
    MissingMappings(String),

    /// A required property of a mapping entry is absent or empty.
    #[error("Invalid schema: {entry} missing {property} property")]
    MissingProperty {
        entry: String,
        property: &'static str,
    },

    /// The entry is not a JSON object or a property has the wrong JSON type.
    #[error("Invalid schema: {entry} {message}")]
    InvalidEntry { entry: String, message: String },

    /// The target type is not one of the recognised kinds.
    #[error("Invalid schema: {entry} has unknown type '{kind}'")]
    UnknownType { entry: String, kind: String },
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors raised while turning raw text or bytes into engine input.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not well-formed JSON.
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON is well-formed but is not a valid mapping schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The bytes could not be decoded to text.
    #[error("Failed to decode content: {0}")]
    Encoding(String),
}

// =============================================================================
// Coercion Errors
// =============================================================================

/// A present value that cannot be converted to the declared target type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("Cannot convert \"{0}\" to number")]
    Number(String),

    #[error("Cannot convert \"{0}\" to boolean")]
    Boolean(String),

    #[error("Cannot convert \"{0}\" to date")]
    Date(String),

    #[error("Cannot parse \"{0}\" as JSON object")]
    Object(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors, returned by [`crate::transform::pipeline`]
/// and the CLI.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading or validating input failed.
    #[error("{0}")]
    Load(#[from] LoadError),

    /// The requested collection is not declared in the schema.
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Output serialization failed.
    #[error("Failed to serialize output: {0}")]
    Output(#[source] serde_json::Error),
}

impl From<SchemaError> for PipelineError {
    fn from(err: SchemaError) -> Self {
        PipelineError::Load(LoadError::Schema(err))
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Load(LoadError::Io(err))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for schema validation.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
