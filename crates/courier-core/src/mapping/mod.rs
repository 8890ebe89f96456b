//! Declarative field-mapping engine
//!
//! Converts canonical message data to and from provider-specific JSON
//! shapes using data-only mapping configuration. Pure: no network or
//! persistence side effects.

mod engine;
mod spec;

pub use engine::{build_payload, lookup_path, parse_response};
pub use engine::parse_date as parse_provider_date;
pub use spec::{
    validate_spec, ArrayMapping, ExtractionMode, FieldMapping, MappingNode, MappingSpec,
    MessageExtraction, ObjectMapping, ResponseMapping, ScalarType,
};

use thiserror::Error;

/// Mapping configuration or coercion failure. Fatal to the single
/// operation that used the mapping, never to the whole batch.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("mapping node \"{key}\" requires a nested mapping")]
    MissingNestedMapping { key: String },

    #[error("value at \"{field}\" is not a valid {expected}: {value}")]
    Unparsable {
        field: String,
        expected: &'static str,
        value: String,
    },

    #[error("invalid mapping spec: {0}")]
    InvalidSpec(String),

    #[error("response did not produce a well-formed outcome: {0}")]
    MalformedOutcome(String),
}
