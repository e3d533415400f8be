use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use super::types::ObjectMemory;

/// Summary counts over a set of records.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_memories: usize,
    /// Records with no generated content yet.
    pub pending: usize,
    pub with_user_image: usize,
    pub with_illustration: usize,
    pub sessions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

pub fn memory_stats(memories: &[ObjectMemory]) -> StatsResponse {
    let sessions: HashSet<&str> = memories.iter().map(|m| m.session_id.as_str()).collect();

    StatsResponse {
        total_memories: memories.len(),
        pending: memories.iter().filter(|m| m.is_pending()).count(),
        with_user_image: memories
            .iter()
            .filter(|m| m.user_image_base64.is_some())
            .count(),
        with_illustration: memories
            .iter()
            .filter(|m| m.object_image_base64.is_some())
            .count(),
        sessions: sessions.len(),
        oldest_memory: memories.iter().map(|m| m.created_at).min(),
        last_updated: memories.iter().map(|m| m.last_updated).max(),
    }
}
