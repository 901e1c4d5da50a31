//! SQL-on-FHIR View Application
//!
//! This crate turns one FHIR resource into flat rows according to a
//! ViewDefinition:
//!
//! - **Where**: every filter must yield a single boolean; a false one drops the resource
//! - **Select**: columns, nested selects and `unionAll` branches, cross-joined
//! - **forEach / forEachOrNull**: iteration, with a null row kept for `forEachOrNull`
//! - **Keys**: `getResourceKey()` and `getReferenceKey([type])` extract resource ids
//!
//! # Example
//!
//! ```
//! use octofhir_sof_eval::ViewApplicator;
//! use serde_json::json;
//!
//! let applicator = ViewApplicator::from_json(r#"{
//!     "resource": "Patient",
//!     "select": [
//!         {"column": [{"name": "id", "path": "getResourceKey()"}]},
//!         {"forEach": "name", "column": [{"name": "family", "path": "family"}]}
//!     ]
//! }"#).unwrap();
//!
//! let patient = json!({
//!     "resourceType": "Patient",
//!     "id": "p1",
//!     "name": [{"family": "Smith"}, {"family": "Doe"}]
//! });
//!
//! let rows = applicator.apply(&patient).unwrap();
//! assert_eq!(rows.column_names(), vec!["id", "family"]);
//! assert_eq!(rows.len(), 2);
//! ```
//!
//! # Architecture
//!
//! - `ViewApplicator`: walks the select tree of one view against a resource
//! - `RowList` / `FlatRow` / `RowElement`: immutable rows borrowing from the resource
//! - `RowListBuilder`: accumulates rows under one schema
//! - `ResourceKey`: resource and reference identity
//!
//! # Empty Results
//!
//! The empty row list (no columns, no rows) is only produced by a false
//! `where` filter or by a missing match; errors are never turned into empty
//! results.

pub mod applicator;
pub mod error;
pub mod key;
pub mod row;

pub use applicator::ViewApplicator;
pub use error::{ViewApplicationError, ViewResult};
pub use key::ResourceKey;
pub use row::{FlatRow, RowElement, RowList, RowListBuilder, RowValue, cross_join_all};
