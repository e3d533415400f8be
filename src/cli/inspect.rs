//! CLI `inspect` command: display full details for a single memory.

use anyhow::Result;

use crate::config::KitchenConfig;
use crate::memory::sqlite::get_memory;

fn image_summary(image: Option<&str>) -> String {
    match image {
        Some(data) => format!("{} base64 chars", data.len()),
        None => "(none)".into(),
    }
}

/// Inspect a single memory by ID. Images are summarized, not printed.
pub fn inspect(config: &KitchenConfig, id: &str) -> Result<()> {
    let conn = super::open_existing(config)?;

    let Some(m) = get_memory(&conn, id)? else {
        anyhow::bail!("memory not found: {id}");
    };

    println!("Memory: {}", m.id);
    println!("{}", "=".repeat(50));
    println!("  Session:        {}", m.session_id);
    println!("  Created:        {}", m.created_at.to_rfc3339());
    println!("  Last updated:   {}", m.last_updated.to_rfc3339());
    println!("  User image:     {}", image_summary(m.user_image_base64.as_deref()));
    println!("  Illustration:   {}", image_summary(m.object_image_base64.as_deref()));
    println!();
    println!("Description:");
    println!("  {}", m.object_description.as_deref().unwrap_or("(pending)"));
    println!();
    println!("Memory:");
    println!("  {}", m.object_memory.as_deref().unwrap_or("(pending)"));

    Ok(())
}
