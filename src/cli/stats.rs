use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use crate::config::KitchenConfig;
use crate::db::{self, HealthReport};
use crate::memory::sqlite::list_memories;
use crate::memory::stats::{memory_stats, StatsResponse};

/// Everything `stats` reports, as emitted by `stats --json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsReport {
    #[serde(flatten)]
    stats: StatsResponse,
    database: HealthReport,
    db_size_bytes: u64,
}

fn collect(conn: &Connection, db_size_bytes: u64) -> Result<StatsReport> {
    Ok(StatsReport {
        stats: memory_stats(&list_memories(conn, None)?),
        database: db::check_database_health(conn)?,
        db_size_bytes,
    })
}

/// Display record statistics and database health, as a table or JSON.
pub fn stats(config: &KitchenConfig, json: bool) -> Result<()> {
    let conn = super::open_existing(config)?;
    let size = std::fs::metadata(config.resolved_db_path())
        .map(|m| m.len())
        .unwrap_or(0);
    let report = collect(&conn, size)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report);
    }
    Ok(())
}

fn print_table(report: &StatsReport) {
    let stats = &report.stats;
    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", stats.total_memories);
    println!("  Pending generation:  {}", stats.pending);
    println!("  With user photo:     {}", stats.with_user_image);
    println!("  With illustration:   {}", stats.with_illustration);
    println!("  Sessions:            {}", stats.sessions);
    println!();

    if let Some(ref oldest) = stats.oldest_memory {
        println!("Oldest memory:         {}", oldest.to_rfc3339());
    }
    if let Some(ref newest) = stats.last_updated {
        println!("Last updated:          {}", newest.to_rfc3339());
    }

    println!("Database size:         {} bytes", report.db_size_bytes);
    println!("Schema version:        {}", report.database.schema_version);
    println!(
        "Integrity:             {}",
        if report.database.integrity_ok { "ok" } else { "FAILED" }
    );
}
