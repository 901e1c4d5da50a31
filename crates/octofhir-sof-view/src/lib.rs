//! SQL-on-FHIR view definitions
//!
//! This crate provides:
//! - The immutable ViewDefinition model (`Select`, `Column`, `Where`)
//! - Column path classification into plain paths and key extractions
//! - Loading from SQL-on-FHIR JSON with `constant` substitution
//! - Load-time validation of names, paths and `unionAll` schemas

pub mod error;
mod json;
pub mod model;
pub mod validate;

pub use error::{ViewDefinitionError, ViewDefinitionResult};
pub use model::{Column, ColumnPath, ID_TYPE, Iteration, Select, ViewDefinition, Where};
pub use validate::validate;
