//! Transformation module.
//!
//! - Coerce: raw cell text to typed values
//! - Executor: rows + schema to documents and diagnostics
//! - Pipeline: text/file level orchestration and export helpers

pub mod coerce;
pub mod executor;
pub mod pipeline;

pub use coerce::coerce;
pub use executor::{transform_all, transform_collection, TransformOutput};
pub use pipeline::*;
