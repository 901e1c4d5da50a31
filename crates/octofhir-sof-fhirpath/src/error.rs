//! FHIRPath parse and evaluation errors

use thiserror::Error;

/// Result type for FHIRPath operations
pub type PathResult<T> = Result<T, PathError>;

/// Errors raised while parsing or evaluating a FHIRPath expression
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PathError {
    /// The expression text is not valid FHIRPath (or uses unsupported syntax)
    #[error("Invalid FHIRPath '{expression}': {message}")]
    Parse { expression: String, message: String },

    /// Function name not known to the engine
    #[error("Unknown function: {name}()")]
    UnknownFunction { name: String },

    /// Function called with the wrong number of arguments
    #[error("Function {name}() expects {expected} argument(s), found {found}")]
    WrongArity {
        name: String,
        expected: String,
        found: usize,
    },

    /// Reference to an environment variable the engine does not provide
    #[error("Undefined variable: %{name}")]
    UndefinedVariable { name: String },

    /// Operation needs a singleton but got a larger collection
    #[error("{operation} requires a single item, found {count}")]
    NotSingleton { operation: String, count: usize },

    /// Operand of the wrong type for an operator or function
    #[error("Invalid operand for {operator}: {message}")]
    InvalidOperand { operator: String, message: String },

    /// FHIR version string that no evaluator exists for
    #[error("Unsupported FHIR version: {version}")]
    UnsupportedVersion { version: String },
}

impl PathError {
    /// Create a parse error
    pub fn parse(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Create an unknown function error
    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self::UnknownFunction { name: name.into() }
    }

    /// Create a wrong arity error
    pub fn wrong_arity(name: impl Into<String>, expected: impl Into<String>, found: usize) -> Self {
        Self::WrongArity {
            name: name.into(),
            expected: expected.into(),
            found,
        }
    }

    /// Create a singleton violation error
    pub fn not_singleton(operation: impl Into<String>, count: usize) -> Self {
        Self::NotSingleton {
            operation: operation.into(),
            count,
        }
    }

    /// Create an invalid operand error
    pub fn invalid_operand(operator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOperand {
            operator: operator.into(),
            message: message.into(),
        }
    }
}
