//! Load-time checks of a view definition

use crate::error::{ViewDefinitionError, ViewDefinitionResult};
use crate::model::{ColumnPath, Select, ViewDefinition};
use octofhir_sof_fhirpath::parse;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static COLUMN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid regex"));

/// Validate a view definition
///
/// Checks that the view names a resource and has output, that every path
/// parses, that column names are usable and unique across the output, and
/// that all `unionAll` branches expose the same columns in the same order.
pub fn validate(view: &ViewDefinition) -> ViewDefinitionResult<()> {
    if view.resource.trim().is_empty() {
        return Err(ViewDefinitionError::MissingResource);
    }
    if view.select.is_empty() {
        return Err(ViewDefinitionError::NoSelect {
            resource: view.resource.clone(),
        });
    }

    for filter in &view.where_clauses {
        check_path(&filter.path)?;
    }
    for select in &view.select {
        validate_select(select)?;
    }

    let mut seen = HashSet::new();
    for name in view.column_names() {
        if !seen.insert(name) {
            return Err(ViewDefinitionError::DuplicateColumn {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_select(select: &Select) -> ViewDefinitionResult<()> {
    if let Some(iteration) = &select.iteration {
        check_path(iteration.path())?;
    }

    for column in &select.columns {
        if !COLUMN_NAME.is_match(&column.name) {
            return Err(ViewDefinitionError::InvalidColumnName {
                name: column.name.clone(),
            });
        }
        match &column.kind {
            ColumnPath::Plain(path) => check_path(path)?,
            ColumnPath::ReferenceKey {
                prefix: Some(prefix),
                ..
            } => check_path(prefix)?,
            _ => {}
        }
    }

    for nested in &select.select {
        validate_select(nested)?;
    }

    if let Some((first, rest)) = select.union_all.split_first() {
        let expected = first.column_names();
        for branch in rest {
            let found = branch.column_names();
            if found != expected {
                return Err(ViewDefinitionError::UnionSchemaMismatch {
                    expected: expected.iter().map(|s| s.to_string()).collect(),
                    found: found.iter().map(|s| s.to_string()).collect(),
                });
            }
        }
        for branch in &select.union_all {
            validate_select(branch)?;
        }
    }
    Ok(())
}

fn check_path(path: &str) -> ViewDefinitionResult<()> {
    parse(path)
        .map(|_| ())
        .map_err(|e| ViewDefinitionError::invalid_path(path, e.to_string()))
}
