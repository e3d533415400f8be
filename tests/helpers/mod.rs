#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use kitchen_memories::api::{self, AppState};
use kitchen_memories::generation::{GenerationError, GenerativeModel, InlineImage, MemoryGenerator};
use kitchen_memories::memory::in_memory::InMemoryStore;
use kitchen_memories::memory::sqlite::SqliteStore;
use kitchen_memories::memory::store::MemoryStore;
use kitchen_memories::memory::types::{FieldUpdate, MemoryPatch};

/// Base64 of "photo-bytes".
pub const PHOTO: &str = "cGhvdG8tYnl0ZXM=";
/// Base64 of "other-photo".
pub const OTHER_PHOTO: &str = "b3RoZXItcGhvdG8=";
/// Base64 of "illustration".
pub const ILLUSTRATION: &str = "aWxsdXN0cmF0aW9u";

/// A model that replays queued text replies and records every prompt.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    image: Option<InlineImage>,
    fail_images: bool,
    fail_text: bool,
    text_calls: AtomicUsize,
    image_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    /// Replaces a record's photo during the next text call, as a concurrent
    /// `PATCH /image` would.
    photo_swap: Mutex<Option<(Arc<dyn MemoryStore>, String, String)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            image: Some(InlineImage {
                mime_type: "image/png".into(),
                data: ILLUSTRATION.into(),
            }),
            ..Default::default()
        }
    }

    /// Queue text replies, served in order. An exhausted queue replies `""`.
    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies
            .lock()
            .unwrap()
            .extend(replies.into_iter().map(Into::into));
        self
    }

    pub fn failing_images(mut self) -> Self {
        self.fail_images = true;
        self
    }

    pub fn failing_text(mut self) -> Self {
        self.fail_text = true;
        self
    }

    pub fn without_image(mut self) -> Self {
        self.image = None;
        self
    }

    pub fn swapping_photo_mid_call(
        self,
        store: Arc<dyn MemoryStore>,
        id: &str,
        new_image: &str,
    ) -> Self {
        *self.photo_swap.lock().unwrap() = Some((store, id.to_string(), new_image.to_string()));
        self
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.text_calls() + self.image_calls()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate_text(
        &self,
        prompt: &str,
        _image: Option<&InlineImage>,
    ) -> Result<String, GenerationError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let swap = self.photo_swap.lock().unwrap().take();
        if let Some((store, id, image)) = swap {
            let patch = MemoryPatch {
                user_image_base64: FieldUpdate::Set(image),
                object_image_base64: FieldUpdate::Clear,
                object_description: FieldUpdate::Clear,
                object_memory: FieldUpdate::Clear,
            };
            store.update(&id, patch).await.unwrap();
        }
        if self.fail_text {
            return Err(GenerationError::Api {
                status: 503,
                body: "overloaded".into(),
            });
        }
        Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn generate_image(&self, prompt: &str) -> Result<InlineImage, GenerationError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail_images {
            return Err(GenerationError::Api {
                status: 500,
                body: "image model down".into(),
            });
        }
        self.image.clone().ok_or(GenerationError::MissingImage)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Both store backends, fresh and empty.
pub fn all_stores() -> Vec<Arc<dyn MemoryStore>> {
    let sqlite = SqliteStore::from_connection(
        kitchen_memories::db::open_memory_database().unwrap(),
    );
    vec![Arc::new(InMemoryStore::new()), Arc::new(sqlite)]
}

pub fn test_state(store: Arc<dyn MemoryStore>, model: Arc<ScriptedModel>) -> AppState {
    AppState::new(store, MemoryGenerator::new(model))
}

pub fn test_router(state: AppState) -> axum::Router {
    api::router(state)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
