//! CLI functionality for the `sof` tool
//!
//! - Reading resources (NDJSON, Bundle, array or single resource)
//! - Running a view over resources
//! - Validating view definitions
//! - Output formatting

pub mod input;
pub mod output;
pub mod run;
pub mod validate;
