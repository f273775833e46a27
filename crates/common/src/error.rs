//! Common error types

use thiserror::Error;

/// Two records cannot be compared because their schemas differ
///
/// Always fatal to the comparison; never reported as a diff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaMismatch {
    #[error("object type mismatch: {left:?} != {right:?}")]
    ObjectType { left: String, right: String },

    #[error("field count mismatch: {left} != {right}")]
    FieldCount { left: usize, right: usize },

    #[error("field name mismatch at position {position}: {left:?} != {right:?}")]
    FieldName {
        position: usize,
        left: String,
        right: String,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(#[from] SchemaMismatch),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("XML serialization error: {0}")]
    Xml(#[from] quick_xml::errors::serialize::SeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
