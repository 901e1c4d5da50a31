//! View application errors

use octofhir_sof_fhirpath::PathError;
use octofhir_sof_view::ViewDefinitionError;
use thiserror::Error;

/// Result type for view application
pub type ViewResult<T> = Result<T, ViewApplicationError>;

/// Errors that abort applying a view to a resource
///
/// None of these are transient: each one points at a mismatch between the
/// view definition and the data.
#[derive(Debug, Error, Clone)]
pub enum ViewApplicationError {
    /// The resource is not of the type the view applies to
    #[error("Resource type mismatch: view applies to {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A `where` path did not yield exactly one boolean
    #[error("Invalid where clause '{path}': {message}")]
    WhereClause { path: String, message: String },

    /// The view definition itself is invalid
    #[error("Invalid view definition: {0}")]
    Configuration(#[from] ViewDefinitionError),

    /// `getResourceKey()` off the root, or `getReferenceKey()` on a non-reference
    #[error("Invalid use of '{path}': {message}")]
    SpecialPathMisuse { path: String, message: String },

    /// Cross join of row sets sharing a column name
    #[error("Duplicate column '{name}' in cross join")]
    DuplicateColumn { name: String },

    /// A row whose columns differ from the row list's schema
    #[error("Row columns {found:?} do not match schema {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// The path evaluator failed
    #[error("Failed to evaluate '{path}': {source}")]
    PathEvaluation { path: String, source: PathError },
}

impl ViewApplicationError {
    /// Create a where clause error
    pub fn where_clause(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WhereClause {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a special path misuse error
    pub fn special_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SpecialPathMisuse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap an evaluator failure with the offending path
    pub fn path_evaluation(path: impl Into<String>, source: PathError) -> Self {
        Self::PathEvaluation {
            path: path.into(),
            source,
        }
    }
}
