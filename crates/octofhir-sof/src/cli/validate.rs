//! Validate command implementation

use super::output;
use crate::ViewDefinition;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for validate command
pub struct ValidateConfig {
    pub files: Vec<PathBuf>,
    pub verbose: bool,
}

/// Validate view definition files
pub fn validate(config: ValidateConfig) -> Result<()> {
    if config.files.is_empty() {
        bail!("No files specified for validation");
    }

    let mut failed = 0;
    for file in &config.files {
        match validate_file(file) {
            Ok(view) => {
                println!("{} {}", "✓".green().bold(), file.display());
                if config.verbose {
                    println!(
                        "    {} -> {}",
                        view.resource,
                        view.column_names().join(", ")
                    );
                }
            }
            Err(e) => {
                failed += 1;
                println!("{} {}: {:#}", "✗".red().bold(), file.display(), e);
            }
        }
    }

    println!();
    if failed > 0 {
        bail!(
            "{} of {} view definition(s) failed validation",
            failed,
            config.files.len()
        );
    }

    println!(
        "{}",
        output::format_success(&format!(
            "All {} view definition(s) validated successfully",
            config.files.len()
        ))
    );
    Ok(())
}

/// Load and validate one view definition file
pub fn validate_file(file: &Path) -> Result<ViewDefinition> {
    let json = fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    Ok(ViewDefinition::from_json(&json)?)
}
