//! Resource input
//!
//! Input is either one JSON document (a resource, a Bundle whose entries are
//! unwrapped, or an array of resources) or NDJSON with one resource per line.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Read resources from a file, or from stdin when no file is given
pub fn read_resources(path: Option<&Path>) -> Result<Vec<Value>> {
    let content = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?,
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read resources from stdin")?;
            content
        }
    };
    parse_resources(&content)
}

/// Parse resources from JSON or NDJSON text
pub fn parse_resources(content: &str) -> Result<Vec<Value>> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(value) = serde_json::from_str::<Value>(content) {
        return Ok(unwrap_document(value));
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Failed to parse NDJSON line {}", index + 1))
        })
        .collect()
}

fn unwrap_document(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(ref object)
            if object.get("resourceType").and_then(Value::as_str) == Some("Bundle") =>
        {
            object
                .get("entry")
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| entry.get("resource").cloned())
                        .collect()
                })
                .unwrap_or_default()
        }
        other => vec![other],
    }
}
