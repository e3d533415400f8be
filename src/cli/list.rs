//! CLI `list` command.

use anyhow::Result;

use crate::config::KitchenConfig;
use crate::memory::sqlite::list_memories;

/// Print one line per record, most recently updated first.
pub fn list(config: &KitchenConfig, session: Option<&str>) -> Result<()> {
    let conn = super::open_existing(config)?;
    let memories = list_memories(&conn, session)?;

    if memories.is_empty() {
        println!("No memories found.");
        return Ok(());
    }

    for m in &memories {
        let status = if m.is_pending() { "pending" } else { "ready" };
        let summary = m
            .object_description
            .as_deref()
            .map(|d| super::preview(d, 60))
            .unwrap_or_else(|| "(no description)".into());
        println!(
            "{}  {:<8} {}  [{}] {}",
            m.id,
            status,
            m.last_updated.format("%Y-%m-%d %H:%M"),
            m.session_id,
            summary
        );
    }
    eprintln!("{} memories", memories.len());

    Ok(())
}
