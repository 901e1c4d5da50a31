//! View definition loading and validation errors

use thiserror::Error;

/// Result type for view definition operations
pub type ViewDefinitionResult<T> = Result<T, ViewDefinitionError>;

/// Errors found while loading or validating a view definition
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ViewDefinitionError {
    /// The document is not a well-formed view definition
    #[error("Malformed view definition: {message}")]
    Malformed { message: String },

    /// `resource` is missing or empty
    #[error("View definition has no resource type")]
    MissingResource,

    /// The view has no `select`
    #[error("View definition for {resource} has no select")]
    NoSelect { resource: String },

    /// Both `forEach` and `forEachOrNull` set on one select
    #[error("Select cannot have both forEach '{for_each}' and forEachOrNull '{for_each_or_null}'")]
    ConflictingIteration {
        for_each: String,
        for_each_or_null: String,
    },

    /// Column name that cannot be used as an output column
    #[error("Invalid column name '{name}'")]
    InvalidColumnName { name: String },

    /// Two columns of the view output share a name
    #[error("Duplicate column name '{name}'")]
    DuplicateColumn { name: String },

    /// A path that does not parse as FHIRPath
    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// FHIR version without an evaluator
    #[error("Unsupported FHIR version: {version}")]
    UnsupportedVersion { version: String },

    /// A `constant` entry that cannot be used
    #[error("Invalid constant '{name}': {message}")]
    InvalidConstant { name: String, message: String },

    /// `unionAll` branches with different output columns
    #[error("unionAll branches disagree on columns: {expected:?} vs {found:?}")]
    UnionSchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

impl ViewDefinitionError {
    /// Create a malformed definition error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid constant error
    pub fn invalid_constant(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConstant {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ViewDefinitionError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}
