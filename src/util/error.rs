//! Error types for the points engine.

use std::path::PathBuf;
use thiserror::Error;

use super::{Chrono, DataType};

/// Main error type.
///
/// Only failures that make a whole export/import call meaningless surface
/// here. Per-property trouble is reported through frame warnings instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Object not found by identifier
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Object exists but carries another schema
    #[error("Schema mismatch for {object}: expected {expected}, got {actual}")]
    SchemaMismatch { object: String, expected: String, actual: String },

    /// Property not found by name
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    /// Type mismatch when reading or appending data
    #[error("Type mismatch for {name}: expected {expected}, got {actual}")]
    TypeMismatch { name: String, expected: DataType, actual: DataType },

    /// Sample index out of bounds
    #[error("Sample index {index} out of bounds (count: {count})")]
    SampleOutOfBounds { index: usize, count: usize },

    /// Array length does not match the store's element count
    #[error("Attribute {name} has {actual} elements, store holds {expected}")]
    ElementCountMismatch { name: String, expected: usize, actual: usize },

    /// Host attribute missing from the store
    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    /// Host attribute declared with a different storage type
    #[error("Attribute {name} is {actual}, expected {expected}")]
    AttributeType { name: String, expected: &'static str, actual: &'static str },

    /// Sample times must increase
    #[error("Sample time {time} is not after previous sample time {previous}")]
    NonMonotonicTime { time: Chrono, previous: Chrono },

    /// Schema or property holds no samples to read
    #[error("{0} has no samples")]
    NoSamples(String),

    /// Raw sample bytes do not form whole elements
    #[error("Invalid sample data: {0}")]
    InvalidSample(String),

    /// Config file could not be parsed
    #[error("Invalid config {path}: {source}")]
    Config { path: PathBuf, #[source] source: serde_json::Error },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid sample error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidSample(msg.into())
    }
}

/// Result type alias for points operations.
pub type Result<T> = std::result::Result<T, Error>;
