//! SQL-on-FHIR ViewDefinition implementation for Rust
//!
//! This crate bundles everything needed to flatten FHIR resources into rows:
//! - FHIRPath evaluation over JSON resources
//! - ViewDefinition loading and validation
//! - View application (where, forEach/forEachOrNull, unionAll, key extraction)
//! - The `sof` command-line tool (with the `cli` feature)
//!
//! # Example
//!
//! ```
//! use octofhir_sof::ViewApplicator;
//! use serde_json::json;
//!
//! let applicator = ViewApplicator::from_json(r#"{
//!     "resourceType": "ViewDefinition",
//!     "resource": "Observation",
//!     "select": [{"column": [
//!         {"name": "id", "path": "getResourceKey()"},
//!         {"name": "patient", "path": "subject.getReferenceKey(Patient)"}
//!     ]}]
//! }"#).unwrap();
//!
//! let observation = json!({
//!     "resourceType": "Observation",
//!     "id": "o1",
//!     "subject": {"reference": "Patient/p1"}
//! });
//!
//! let rows = applicator.apply(&observation).unwrap();
//! assert_eq!(rows.to_records()[0]["patient"], json!("p1"));
//! ```

// Re-export all public APIs from internal crates
pub use octofhir_sof_eval as eval;
pub use octofhir_sof_fhirpath as fhirpath;
pub use octofhir_sof_view as view;

// Convenience re-exports
pub use octofhir_sof_eval::{RowList, ViewApplicationError, ViewApplicator, ViewResult};
pub use octofhir_sof_fhirpath::{FhirPathEngine, FhirVersion, PathEvaluator};
pub use octofhir_sof_view::{ViewDefinition, ViewDefinitionError};

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
