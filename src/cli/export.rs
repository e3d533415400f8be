use anyhow::Result;
use serde::Serialize;

use crate::config::KitchenConfig;
use crate::memory::sqlite::list_memories;
use crate::memory::types::ObjectMemory;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportData {
    exported_at: chrono::DateTime<chrono::Utc>,
    memories: Vec<ObjectMemory>,
}

/// Export every record, images included, as JSON to stdout.
pub fn export(config: &KitchenConfig) -> Result<()> {
    let conn = super::open_existing(config)?;

    let data = ExportData {
        exported_at: chrono::Utc::now(),
        memories: list_memories(&conn, None)?,
    };

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!("Exported {} memories.", data.memories.len());

    Ok(())
}
