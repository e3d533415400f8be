//! Offline commands that read the configured SQLite database directly.
//!
//! These do not talk to a running server; WAL mode lets them read while one is
//! writing.

pub mod export;
pub mod inspect;
pub mod list;
pub mod stats;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::config::KitchenConfig;

/// Open the configured database, refusing to create one that does not exist.
fn open_existing(config: &KitchenConfig) -> Result<Connection> {
    let db_path = config.resolved_db_path();
    anyhow::ensure!(
        db_path.exists(),
        "no database at {} (start the server with the sqlite backend first)",
        db_path.display()
    );
    crate::db::open_database(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))
}

/// First `max` characters of `text`, with an ellipsis when cut.
fn preview(text: &str, max: usize) -> String {
    let text = text.trim().replace('\n', " ");
    if text.chars().count() <= max {
        return text;
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}
