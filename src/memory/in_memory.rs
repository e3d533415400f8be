//! Process-local store. Contents are lost on restart.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::store::{new_record, MemoryStore};
use super::types::{sort_by_recency, GuardedUpdate, MemoryPatch, NewObjectMemory, ObjectMemory};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    memories: RwLock<HashMap<String, ObjectMemory>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self, session_id: Option<&str>) -> Result<Vec<ObjectMemory>> {
        let map = self
            .memories
            .read()
            .map_err(|e| anyhow!("store lock poisoned: {e}"))?;
        let mut memories: Vec<ObjectMemory> = map
            .values()
            .filter(|m| session_id.is_none_or(|s| m.session_id == s))
            .cloned()
            .collect();
        sort_by_recency(&mut memories);
        Ok(memories)
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn create(&self, input: NewObjectMemory) -> Result<ObjectMemory> {
        let memory = new_record(input);
        self.memories
            .write()
            .map_err(|e| anyhow!("store lock poisoned: {e}"))?
            .insert(memory.id.clone(), memory.clone());
        tracing::debug!(id = %memory.id, session = %memory.session_id, "memory created");
        Ok(memory)
    }

    async fn get(&self, id: &str) -> Result<Option<ObjectMemory>> {
        let map = self
            .memories
            .read()
            .map_err(|e| anyhow!("store lock poisoned: {e}"))?;
        Ok(map.get(id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<ObjectMemory>> {
        self.snapshot(None)
    }

    async fn list_by_session(&self, session_id: &str) -> Result<Vec<ObjectMemory>> {
        self.snapshot(Some(session_id))
    }

    async fn update(&self, id: &str, patch: MemoryPatch) -> Result<Option<ObjectMemory>> {
        // The write lock spans the read-modify-write so updates never interleave.
        let mut map = self
            .memories
            .write()
            .map_err(|e| anyhow!("store lock poisoned: {e}"))?;
        let Some(existing) = map.get_mut(id) else {
            return Ok(None);
        };
        patch.apply_to(existing);
        Ok(Some(existing.clone()))
    }

    async fn update_if_image(
        &self,
        id: &str,
        expected_image: Option<&str>,
        patch: MemoryPatch,
    ) -> Result<GuardedUpdate> {
        let mut map = self
            .memories
            .write()
            .map_err(|e| anyhow!("store lock poisoned: {e}"))?;
        let Some(existing) = map.get_mut(id) else {
            return Ok(GuardedUpdate::NotFound);
        };
        if patch.apply_if_image(existing, expected_image) {
            Ok(GuardedUpdate::Applied(existing.clone()))
        } else {
            Ok(GuardedUpdate::Stale(existing.clone()))
        }
    }

    async fn count(&self) -> Result<usize> {
        let map = self
            .memories
            .read()
            .map_err(|e| anyhow!("store lock poisoned: {e}"))?;
        Ok(map.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
