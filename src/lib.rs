//! Kitchen Memories: photograph a kitchen object, get a story back.
//!
//! A browser client uploads a photo (or nothing at all), the server asks a
//! generative model to describe the object and write a short first-person
//! memory about it, and the result is stored as an *object memory*. Later, a
//! new photo of the same object can be matched against the stored
//! descriptions to bring the memory back.
//!
//! | Flow | Route | Model calls |
//! |------|-------|-------------|
//! | Create | `POST /api/memories` | none |
//! | Generate (photo) | `POST /api/memories/{id}/generate` | 1 vision |
//! | Generate (no photo) | `POST /api/memories/{id}/generate` | text + image, then vision |
//! | Remember | `POST /api/remember/match` | 1 vision, then 1 text if anything is stored |
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, and health checks
//! - [`memory`]: Record types and the in-memory and SQLite stores
//! - [`generation`]: Model client, prompts, and response interpretation
//! - [`api`]: axum handlers and router
//! - [`server`]: HTTP startup
//! - [`cli`]: Offline inspection commands

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod generation;
pub mod memory;
pub mod server;
