//! Run command implementation

use super::{input, output};
use crate::{ViewApplicator, ViewDefinition};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for run command
pub struct RunConfig {
    pub view: PathBuf,
    pub input: Option<PathBuf>,
    pub skip_errors: bool,
    pub output_format: Option<String>,
    pub output_file: Option<PathBuf>,
}

/// Rows produced from a batch of resources
#[derive(Debug, Default)]
pub struct RunSummary {
    pub records: Vec<Map<String, Value>>,
    /// Resources the view was applied to
    pub applied: usize,
    /// Resources of another type, never applied
    pub filtered: usize,
    /// Resources skipped after an application error
    pub failed: usize,
}

/// Apply a view definition file to resources and write the rows
pub fn run(config: RunConfig) -> Result<()> {
    let format = config
        .output_format
        .as_deref()
        .map(str::parse::<output::OutputFormat>)
        .transpose()?
        .unwrap_or_default();

    let applicator = load_view(&config.view)?;
    let resources = input::read_resources(config.input.as_deref())?;
    info!(
        "Applying view '{}' to {} resource(s)",
        applicator.view().name.as_deref().unwrap_or(&applicator.view().resource),
        resources.len()
    );

    let summary = apply_view(&applicator, &resources, config.skip_errors)?;
    if summary.failed > 0 {
        eprintln!(
            "{}",
            output::format_warning(&format!("Skipped {} resource(s) with errors", summary.failed))
        );
    }

    let columns = applicator.view().column_names();
    let content = output::format_records(&columns, &summary.records, format)?;
    output::write_output(&content, config.output_file.as_deref())
}

/// Load and validate a view definition file
pub fn load_view(path: &Path) -> Result<ViewApplicator> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read view definition: {}", path.display()))?;
    let view = ViewDefinition::from_json(&json)
        .with_context(|| format!("Invalid view definition: {}", path.display()))?;
    Ok(ViewApplicator::new(view))
}

/// Apply a view to every resource of its type
///
/// Resources of other types are counted and left out. An application error
/// stops the run unless `skip_errors` is set, in which case the resource is
/// logged and skipped.
pub fn apply_view(
    applicator: &ViewApplicator,
    resources: &[Value],
    skip_errors: bool,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    for (index, resource) in resources.iter().enumerate() {
        let resource_type = resource.get("resourceType").and_then(Value::as_str);
        if resource_type != Some(applicator.view().resource.as_str()) {
            debug!(
                "Skipping resource #{} of type {}",
                index,
                resource_type.unwrap_or("(none)")
            );
            summary.filtered += 1;
            continue;
        }

        match applicator.apply(resource) {
            Ok(rows) => {
                summary.applied += 1;
                summary.records.extend(rows.to_records());
            }
            Err(e) if skip_errors => {
                warn!("Skipping resource #{}: {}", index, e);
                summary.failed += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to apply view to resource #{}", index));
            }
        }
    }

    debug!(
        "{} row(s) from {} resource(s), {} filtered, {} failed",
        summary.records.len(),
        summary.applied,
        summary.filtered,
        summary.failed
    );
    Ok(summary)
}
