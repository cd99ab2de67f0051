use std::path::Path;

use anyhow::Result;
use loadstone_engine::pipeline::resolve_datasets;

use super::load_config;

/// Execute the `datasets` command: print each dataset with its schema.
pub fn execute(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let (registry, datasets) = resolve_datasets(&config);

    for dataset in &datasets {
        let schema = registry.schema_for(&dataset.name)?;
        let fields: Vec<String> = schema
            .fields()
            .iter()
            .map(|f| format!("{}:{}", f.name, f.field_type))
            .collect();
        let backup = if registry.backup_schema_for(&dataset.table).is_ok() {
            "backed up"
        } else {
            "no backup"
        };
        println!(
            "{} ({} -> {}, {backup})\n  {}",
            dataset.name,
            dataset.source,
            dataset.table,
            fields.join(", ")
        );
    }
    Ok(())
}
