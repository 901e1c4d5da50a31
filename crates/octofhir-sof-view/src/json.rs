//! Loading view definitions from SQL-on-FHIR JSON
//!
//! The JSON is read into serde shapes first, then converted into the
//! model: constants are substituted into every path, column paths are
//! classified, and the result is validated.

use crate::error::{ViewDefinitionError, ViewDefinitionResult};
use crate::model::{Column, Iteration, Select, ViewDefinition, Where};
use crate::validate::validate;
use log::debug;
use octofhir_sof_fhirpath::FhirVersion;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// `%name`, or a quoted span matched whole so references inside it stay untouched
static CONSTANT_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'(?:[^'\\]|\\.)*'|`(?:[^`\\]|\\.)*`|%(?P<name>[A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid regex")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawViewDefinition {
    resource_type: Option<String>,
    url: Option<String>,
    name: Option<String>,
    title: Option<String>,
    status: Option<String>,
    description: Option<String>,
    resource: Option<String>,
    resource_version: Option<String>,
    #[serde(default)]
    fhir_version: Vec<String>,
    #[serde(default)]
    constant: Vec<RawConstant>,
    #[serde(default)]
    select: Vec<RawSelect>,
    #[serde(default, rename = "where")]
    where_clauses: Vec<RawWhere>,
}

#[derive(Debug, Deserialize)]
struct RawConstant {
    name: String,
    #[serde(flatten)]
    value: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSelect {
    #[serde(default)]
    column: Vec<RawColumn>,
    #[serde(default)]
    select: Vec<RawSelect>,
    #[serde(default)]
    union_all: Vec<RawSelect>,
    for_each: Option<String>,
    for_each_or_null: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawColumn {
    name: String,
    path: String,
    description: Option<String>,
    #[serde(rename = "type")]
    type_name: Option<String>,
    #[serde(default)]
    collection: bool,
}

#[derive(Debug, Deserialize)]
struct RawWhere {
    path: String,
    description: Option<String>,
}

impl ViewDefinition {
    /// Parse and validate a view definition from JSON text
    pub fn from_json(json: &str) -> ViewDefinitionResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Convert and validate a view definition from a JSON value
    pub fn from_value(value: Value) -> ViewDefinitionResult<Self> {
        let raw: RawViewDefinition = serde_json::from_value(value)?;

        if let Some(resource_type) = &raw.resource_type {
            if resource_type != "ViewDefinition" {
                return Err(ViewDefinitionError::malformed(format!(
                    "expected resourceType ViewDefinition, found {}",
                    resource_type
                )));
            }
        }

        let resource = raw
            .resource
            .filter(|r| !r.trim().is_empty())
            .ok_or(ViewDefinitionError::MissingResource)?;

        let fhir_version = match raw.resource_version.or_else(|| raw.fhir_version.into_iter().next()) {
            Some(version) => version.parse::<FhirVersion>().map_err(|_| {
                ViewDefinitionError::UnsupportedVersion { version: version.clone() }
            })?,
            None => FhirVersion::default(),
        };

        let constants = Constants::new(raw.constant)?;

        let view = ViewDefinition {
            url: raw.url,
            name: raw.name,
            title: raw.title,
            status: raw.status,
            description: raw.description,
            resource,
            fhir_version,
            select: raw
                .select
                .into_iter()
                .map(|select| convert_select(select, &constants))
                .collect::<ViewDefinitionResult<_>>()?,
            where_clauses: raw
                .where_clauses
                .into_iter()
                .map(|w| Where {
                    path: constants.substitute(&w.path),
                    description: w.description,
                })
                .collect(),
        };

        validate(&view)?;
        debug!(
            "Loaded view {} over {} ({} output columns)",
            view.name.as_deref().unwrap_or("<unnamed>"),
            view.resource,
            view.column_names().len()
        );
        Ok(view)
    }
}

fn convert_select(raw: RawSelect, constants: &Constants) -> ViewDefinitionResult<Select> {
    let iteration = match (raw.for_each, raw.for_each_or_null) {
        (Some(for_each), Some(for_each_or_null)) => {
            return Err(ViewDefinitionError::ConflictingIteration {
                for_each,
                for_each_or_null,
            });
        }
        (Some(path), None) => Some(Iteration::ForEach(constants.substitute(&path))),
        (None, Some(path)) => Some(Iteration::ForEachOrNull(constants.substitute(&path))),
        (None, None) => None,
    };

    let columns = raw
        .column
        .into_iter()
        .map(|c| {
            let mut column = Column::new(c.name, constants.substitute(&c.path));
            column.description = c.description;
            column.declared_type = c.type_name;
            column.collection = c.collection;
            column
        })
        .collect();

    Ok(Select {
        iteration,
        columns,
        select: raw
            .select
            .into_iter()
            .map(|s| convert_select(s, constants))
            .collect::<ViewDefinitionResult<_>>()?,
        union_all: raw
            .union_all
            .into_iter()
            .map(|s| convert_select(s, constants))
            .collect::<ViewDefinitionResult<_>>()?,
    })
}

/// `constant` entries rendered as FHIRPath literals
struct Constants {
    literals: HashMap<String, String>,
}

impl Constants {
    fn new(raw: Vec<RawConstant>) -> ViewDefinitionResult<Self> {
        let mut literals = HashMap::new();
        for constant in raw {
            let mut values = constant
                .value
                .iter()
                .filter_map(|(key, value)| key.strip_prefix("value").map(|t| (t, value)));

            let (Some((value_type, value)), None) = (values.next(), values.next()) else {
                return Err(ViewDefinitionError::invalid_constant(
                    &constant.name,
                    "expected exactly one value[x]",
                ));
            };
            let literal = to_literal(value_type, value)
                .ok_or_else(|| {
                    ViewDefinitionError::invalid_constant(
                        &constant.name,
                        format!("unsupported value{}: {}", value_type, value),
                    )
                })?;

            if literals.insert(constant.name.clone(), literal).is_some() {
                return Err(ViewDefinitionError::invalid_constant(
                    &constant.name,
                    "defined more than once",
                ));
            }
        }
        Ok(Self { literals })
    }

    /// Replace `%name` references to constants; other variables are kept
    fn substitute(&self, path: &str) -> String {
        if self.literals.is_empty() {
            return path.to_string();
        }
        CONSTANT_REF
            .replace_all(path, |caps: &Captures| {
                match caps.name("name").and_then(|name| self.literals.get(name.as_str())) {
                    Some(literal) => literal.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// FHIRPath literal for a constant value
fn to_literal(value_type: &str, value: &Value) -> Option<String> {
    match (value_type, value) {
        ("Boolean", Value::Bool(b)) => Some(b.to_string()),
        ("Integer" | "PositiveInt" | "UnsignedInt" | "Decimal" | "Integer64", Value::Number(n)) => {
            Some(n.to_string())
        }
        ("Integer64", Value::String(s)) if s.parse::<i64>().is_ok() => Some(s.clone()),
        ("Date" | "DateTime" | "Instant", Value::String(s)) => Some(format!("@{}", s)),
        ("Time", Value::String(s)) => Some(format!("@T{}", s)),
        (
            "String" | "Code" | "Id" | "Uri" | "Url" | "Canonical" | "Oid" | "Uuid" | "Markdown"
            | "Base64Binary",
            Value::String(s),
        ) => Some(quote(s)),
        _ => None,
    }
}

fn quote(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}
