//! Durable store on a single SQLite table.
//!
//! The free functions take a plain `Connection` so the CLI can use them
//! synchronously; [`SqliteStore`] wraps them for async callers by running each
//! one on the blocking pool behind a shared mutex.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::store::{new_record, MemoryStore};
use super::types::{GuardedUpdate, MemoryPatch, NewObjectMemory, ObjectMemory};

const SELECT_COLUMNS: &str = "SELECT id, session_id, created_at, last_updated, \
     user_image_base64, object_image_base64, object_description, object_memory \
     FROM object_memories";

/// Fixed-width UTC text so lexical order matches chronological order.
fn to_sql_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_memory(row: &Row<'_>) -> rusqlite::Result<ObjectMemory> {
    Ok(ObjectMemory {
        id: row.get(0)?,
        session_id: row.get(1)?,
        created_at: time_column(row, 2)?,
        last_updated: time_column(row, 3)?,
        user_image_base64: row.get(4)?,
        object_image_base64: row.get(5)?,
        object_description: row.get(6)?,
        object_memory: row.get(7)?,
    })
}

/// Insert a new record with store-assigned id and timestamps.
pub fn insert_memory(conn: &Connection, input: NewObjectMemory) -> Result<ObjectMemory> {
    let memory = new_record(input);
    conn.execute(
        "INSERT INTO object_memories (id, session_id, created_at, last_updated, \
         user_image_base64, object_image_base64, object_description, object_memory) \
         VALUES (?1, ?2, ?3, ?3, ?4, NULL, NULL, NULL)",
        params![
            memory.id,
            memory.session_id,
            to_sql_time(&memory.created_at),
            memory.user_image_base64,
        ],
    )?;
    Ok(memory)
}

pub fn get_memory(conn: &Connection, id: &str) -> Result<Option<ObjectMemory>> {
    let memory = conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            params![id],
            row_to_memory,
        )
        .optional()?;
    Ok(memory)
}

/// List records, newest update first, optionally restricted to one session.
pub fn list_memories(conn: &Connection, session_id: Option<&str>) -> Result<Vec<ObjectMemory>> {
    let sql = match session_id {
        Some(_) => format!("{SELECT_COLUMNS} WHERE session_id = ?1 ORDER BY last_updated DESC, id DESC"),
        None => format!("{SELECT_COLUMNS} ORDER BY last_updated DESC, id DESC"),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = match session_id {
        Some(session) => stmt.query_map(params![session], row_to_memory)?,
        None => stmt.query_map([], row_to_memory)?,
    };
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Read-modify-write inside one transaction. Returns `None` for unknown ids.
pub fn update_memory(
    conn: &mut Connection,
    id: &str,
    patch: MemoryPatch,
) -> Result<Option<ObjectMemory>> {
    let tx = conn.transaction()?;

    let Some(mut memory) = get_memory(&tx, id)? else {
        return Ok(None);
    };
    patch.apply_to(&mut memory);

    write_memory(&tx, &memory)?;
    tx.commit()?;

    Ok(Some(memory))
}

/// [`update_memory`] guarded on the stored user photo, checked in the same transaction.
pub fn update_memory_if_image(
    conn: &mut Connection,
    id: &str,
    expected_image: Option<&str>,
    patch: MemoryPatch,
) -> Result<GuardedUpdate> {
    let tx = conn.transaction()?;

    let Some(mut memory) = get_memory(&tx, id)? else {
        return Ok(GuardedUpdate::NotFound);
    };
    if !patch.apply_if_image(&mut memory, expected_image) {
        return Ok(GuardedUpdate::Stale(memory));
    }

    write_memory(&tx, &memory)?;
    tx.commit()?;

    Ok(GuardedUpdate::Applied(memory))
}

fn write_memory(conn: &Connection, memory: &ObjectMemory) -> Result<()> {
    conn.execute(
        "UPDATE object_memories SET last_updated = ?1, user_image_base64 = ?2, \
         object_image_base64 = ?3, object_description = ?4, object_memory = ?5 \
         WHERE id = ?6",
        params![
            to_sql_time(&memory.last_updated),
            memory.user_image_base64,
            memory.object_image_base64,
            memory.object_description,
            memory.object_memory,
            memory.id,
        ],
    )?;
    Ok(())
}

pub fn count_memories(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM object_memories", [], |row| {
        row.get(0)
    })?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// [`MemoryStore`] backed by one SQLite connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_connection(crate::db::open_database(path)?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| anyhow!("db lock poisoned: {e}"))?;
            f(&mut guard)
        })
        .await
        .context("db task failed")?
    }
}

#[async_trait]
impl MemoryStore for SqliteStore {
    async fn create(&self, input: NewObjectMemory) -> Result<ObjectMemory> {
        let memory = self.with_conn(move |conn| insert_memory(conn, input)).await?;
        tracing::debug!(id = %memory.id, session = %memory.session_id, "memory created");
        Ok(memory)
    }

    async fn get(&self, id: &str) -> Result<Option<ObjectMemory>> {
        let id = id.to_string();
        self.with_conn(move |conn| get_memory(conn, &id)).await
    }

    async fn list_all(&self) -> Result<Vec<ObjectMemory>> {
        self.with_conn(|conn| list_memories(conn, None)).await
    }

    async fn list_by_session(&self, session_id: &str) -> Result<Vec<ObjectMemory>> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| list_memories(conn, Some(&session_id)))
            .await
    }

    async fn update(&self, id: &str, patch: MemoryPatch) -> Result<Option<ObjectMemory>> {
        let id = id.to_string();
        self.with_conn(move |conn| update_memory(conn, &id, patch))
            .await
    }

    async fn update_if_image(
        &self,
        id: &str,
        expected_image: Option<&str>,
        patch: MemoryPatch,
    ) -> Result<GuardedUpdate> {
        let id = id.to_string();
        let expected_image = expected_image.map(str::to_string);
        self.with_conn(move |conn| {
            update_memory_if_image(conn, &id, expected_image.as_deref(), patch)
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| count_memories(conn)).await
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
