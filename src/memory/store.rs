//! The record store contract.
//!
//! [`MemoryStore`] is implemented by [`InMemoryStore`](super::in_memory::InMemoryStore)
//! and [`SqliteStore`](super::sqlite::SqliteStore). Both own record identity and
//! timestamps; callers only ever supply content fields.

use anyhow::Result;
use async_trait::async_trait;

use super::types::{GuardedUpdate, MemoryPatch, NewObjectMemory, ObjectMemory};

/// Key-value persistence for object memories.
///
/// Unknown ids are not errors: `get` and `update` return `None`. Errors are
/// reserved for backend failures.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Allocate an id and timestamps and store a record with empty content.
    async fn create(&self, input: NewObjectMemory) -> Result<ObjectMemory>;

    async fn get(&self, id: &str) -> Result<Option<ObjectMemory>>;

    /// All records, most-recently-updated first.
    async fn list_all(&self) -> Result<Vec<ObjectMemory>>;

    /// Records of one session, most-recently-updated first.
    async fn list_by_session(&self, session_id: &str) -> Result<Vec<ObjectMemory>>;

    /// Apply the fields present in `patch` and bump `last_updated`.
    /// Returns `None` without creating anything when `id` does not exist.
    async fn update(&self, id: &str, patch: MemoryPatch) -> Result<Option<ObjectMemory>>;

    /// Like [`update`](Self::update), but only if the stored user photo still
    /// equals `expected_image`. The check and the write happen under the same
    /// lock or transaction.
    async fn update_if_image(
        &self,
        id: &str,
        expected_image: Option<&str>,
        patch: MemoryPatch,
    ) -> Result<GuardedUpdate>;

    async fn count(&self) -> Result<usize>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Build the record a store persists for `input`.
pub(crate) fn new_record(input: NewObjectMemory) -> ObjectMemory {
    let now = super::types::timestamp();
    ObjectMemory {
        id: uuid::Uuid::now_v7().to_string(),
        session_id: input.session_id,
        created_at: now,
        last_updated: now,
        user_image_base64: input.user_image_base64,
        object_image_base64: None,
        object_description: None,
        object_memory: None,
    }
}
