//! FHIRPath for SQL-on-FHIR
//!
//! This crate evaluates the FHIRPath subset that view definitions use
//! against JSON FHIR resources held in memory:
//!
//! - **Navigation**: member access, choice elements (`value.ofType(Quantity)`), indexers
//! - **Filtering**: `where`, `select`, `ofType`, `extension`, `first`, `exists`
//! - **Operators**: equality, comparison, arithmetic, string concatenation, union, membership
//! - **Logic**: `and`, `or`, `xor`, `implies`, `not()` with three-valued semantics
//! - **Strings**: `join`, `startsWith`, `endsWith`, `contains`, `lower`, `upper`
//!
//! # Example
//!
//! ```
//! use octofhir_sof_fhirpath::{FhirPathEngine, Node, PathEvaluator};
//! use serde_json::json;
//!
//! let patient = json!({
//!     "resourceType": "Patient",
//!     "name": [{"use": "official", "family": "Smith"}]
//! });
//!
//! let engine = FhirPathEngine::default();
//! let family = engine
//!     .evaluate(&Node::borrowed(&patient), "name.where(use = 'official').family")
//!     .unwrap();
//! assert_eq!(family[0].as_str(), Some("Smith"));
//! ```
//!
//! # Architecture
//!
//! - [`PathEvaluator`]: the seam view application evaluates paths through
//! - [`FhirPathEngine`]: the built-in evaluator, caching parsed expressions
//! - [`Node`]: one collection item, borrowing from the source document
//! - [`parse`]: winnow-based parser producing an [`Expression`]

pub mod ast;
pub mod engine;
pub mod error;
pub mod node;
pub mod parser;
pub mod version;

mod evaluator;
mod functions;
mod operators;

pub use ast::{BinaryOp, Expression, Literal, TypeOp, UnaryOp};
pub use engine::{FhirPathEngine, PathEvaluator};
pub use error::{PathError, PathResult};
pub use node::Node;
pub use parser::parse;
pub use version::FhirVersion;
