//! Record type definitions.
//!
//! Defines [`ObjectMemory`] (a full record), [`NewObjectMemory`] (creation input),
//! [`MemoryPatch`] (partial update input), [`FieldUpdate`], the three-state
//! marker that keeps "leave unchanged" distinct from "set to null", and
//! [`GuardedUpdate`] for writes that must not land on a changed photo.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// A persisted object memory, matching the `object_memories` table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMemory {
    /// UUID v7 primary key, assigned by the store.
    pub id: String,
    /// Browser-persisted grouping key. Not unique.
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    /// Bumped on every mutation; never earlier than `created_at`.
    pub last_updated: DateTime<Utc>,
    /// Photo captured by the user, raw base64 or a `data:` URL.
    pub user_image_base64: Option<String>,
    /// Illustration produced by the image model.
    pub object_image_base64: Option<String>,
    pub object_description: Option<String>,
    /// The nostalgic narrative, generated or edited by the user.
    pub object_memory: Option<String>,
}

impl ObjectMemory {
    /// `true` while generation has not written any content yet.
    pub fn is_pending(&self) -> bool {
        self.object_description.is_none() && self.object_memory.is_none()
    }

    /// Description usable as a match candidate, if any.
    pub fn match_description(&self) -> Option<&str> {
        self.object_description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Caller-supplied fields for a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObjectMemory {
    pub session_id: String,
    pub user_image_base64: Option<String>,
}

/// How a partial update treats one field.
///
/// In JSON bodies an absent key deserializes to `Keep` (with `#[serde(default)]`),
/// `null` to `Clear`, and a value to `Set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::Keep
    }
}

impl<T> FieldUpdate<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, FieldUpdate::Keep)
    }

    pub fn apply(self, current: &mut Option<T>) {
        match self {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => *current = None,
            FieldUpdate::Set(value) => *current = Some(value),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Clear,
        })
    }
}

/// Partial update of a record's content fields. Identity and timestamps are
/// owned by the store and cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPatch {
    pub user_image_base64: FieldUpdate<String>,
    pub object_image_base64: FieldUpdate<String>,
    pub object_description: FieldUpdate<String>,
    pub object_memory: FieldUpdate<String>,
}

impl MemoryPatch {
    pub fn is_empty(&self) -> bool {
        self.user_image_base64.is_keep()
            && self.object_image_base64.is_keep()
            && self.object_description.is_keep()
            && self.object_memory.is_keep()
    }

    /// Apply every non-`Keep` field and bump `last_updated`.
    pub fn apply_to(self, memory: &mut ObjectMemory) {
        self.user_image_base64.apply(&mut memory.user_image_base64);
        self.object_image_base64.apply(&mut memory.object_image_base64);
        self.object_description.apply(&mut memory.object_description);
        self.object_memory.apply(&mut memory.object_memory);
        memory.last_updated = timestamp_after(memory.last_updated);
    }
}

/// Outcome of [`MemoryStore::update_if_image`](super::store::MemoryStore::update_if_image).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedUpdate {
    Applied(ObjectMemory),
    /// The stored user photo no longer matched; nothing was written.
    Stale(ObjectMemory),
    NotFound,
}

impl MemoryPatch {
    /// Apply only when the record's user photo still equals `expected_image`.
    pub fn apply_if_image(self, memory: &mut ObjectMemory, expected_image: Option<&str>) -> bool {
        if memory.user_image_base64.as_deref() != expected_image {
            return false;
        }
        self.apply_to(memory);
        true
    }
}

static LAST_TIMESTAMP_MICROS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Current UTC time at microsecond precision, strictly later than every
/// timestamp previously returned in this process.
pub fn timestamp() -> DateTime<Utc> {
    let wall = Utc::now().timestamp_micros();
    let mut issued = wall;
    let _ = LAST_TIMESTAMP_MICROS.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        issued = if wall > last { wall } else { last + 1 };
        Some(issued)
    });
    DateTime::from_timestamp_micros(issued).unwrap_or_else(Utc::now)
}

/// A fresh timestamp that is also strictly later than `previous`, which may
/// come from another process through the durable store.
pub fn timestamp_after(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = timestamp();
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}

/// Sort records most-recently-updated first. Ties fall back to the
/// time-ordered id so the order is total.
pub fn sort_by_recency(memories: &mut [ObjectMemory]) {
    memories.sort_by(|a, b| {
        b.last_updated
            .cmp(&a.last_updated)
            .then_with(|| b.id.cmp(&a.id))
    });
}
