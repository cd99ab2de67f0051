//! Semantic validation for parsed pipeline configuration values.

use std::collections::HashSet;

use anyhow::{bail, Result};
use loadstone_types::identifier::validate_identifier;
use loadstone_types::FieldRule;

use crate::config::types::{PipelineConfig, SourceConfig};

/// Container and dataset names become artifact path components.
fn validate_flat_name(name: &str, context: &str, errors: &mut Vec<String>) {
    if name.trim().is_empty() {
        errors.push(format!("{context} must not be empty"));
    } else if name.starts_with('.') || name.contains(['/', '\\']) {
        errors.push(format!(
            "{context} '{name}' must be a plain name without path separators"
        ));
    }
}

fn validate_fields(fields: &[FieldRule], context: &str, errors: &mut Vec<String>) {
    if fields.is_empty() {
        errors.push(format!("{context} must declare at least one field"));
        return;
    }
    let mut seen = HashSet::new();
    for field in fields {
        if let Err(reason) = validate_identifier(&field.name) {
            errors.push(format!("{context}: invalid field name: {reason}"));
        }
        if !seen.insert(field.name.as_str()) {
            errors.push(format!("{context}: duplicate field '{}'", field.name));
        }
    }
}

/// Validate a parsed pipeline configuration.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing all validation failures found in the config.
pub fn validate_pipeline(config: &PipelineConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported pipeline version '{}', expected '1.0'",
            config.version
        ));
    }

    if config.batch_size == 0 {
        errors.push("batch_size must be at least 1".to_string());
    }

    match &config.source {
        SourceConfig::Local { path } if path.as_os_str().is_empty() => {
            errors.push("Local source path must not be empty".to_string());
        }
        SourceConfig::Artifact { container } => {
            validate_flat_name(container, "Source container", &mut errors);
        }
        SourceConfig::Local { .. } => {}
    }

    if config.destination.path.as_os_str().is_empty() {
        errors.push("Destination path must not be empty".to_string());
    }

    validate_flat_name(
        &config.artifacts.rejects_container,
        "Rejects container",
        &mut errors,
    );
    validate_flat_name(
        &config.artifacts.backups_container,
        "Backups container",
        &mut errors,
    );
    validate_flat_name(
        &config.artifacts.validated_container,
        "Validated container",
        &mut errors,
    );
    if config.artifacts.rejects_container == config.artifacts.backups_container {
        errors.push("Rejects and backups containers must differ".to_string());
    }

    let mut names = HashSet::new();
    let mut tables = HashSet::new();
    for (i, dataset) in config.datasets.iter().enumerate() {
        let name = dataset.dataset_name();
        let context = format!("Dataset '{name}'");
        if name.trim().is_empty() {
            errors.push(format!("Dataset {i} has an empty name"));
        } else {
            validate_flat_name(name, "Dataset name", &mut errors);
            if !names.insert(name) {
                errors.push(format!("{context} is declared more than once"));
            }
        }
        if dataset.source.trim().is_empty() {
            errors.push(format!("{context} has an empty source"));
        }
        if let Err(reason) = validate_identifier(&dataset.table) {
            errors.push(format!("{context}: invalid table name: {reason}"));
        } else if !tables.insert(dataset.table.as_str()) {
            errors.push(format!(
                "{context}: table '{}' is loaded by more than one dataset",
                dataset.table
            ));
        }
        validate_fields(&dataset.fields, &context, &mut errors);
    }

    for (table, fields) in &config.backup_schemas {
        let context = format!("Backup schema '{table}'");
        if let Err(reason) = validate_identifier(table) {
            errors.push(format!("{context}: invalid table name: {reason}"));
        }
        validate_fields(fields, &context, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Pipeline validation failed:\n  - {}", errors.join("\n  - "));
    }
}
