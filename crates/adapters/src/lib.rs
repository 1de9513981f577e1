//! alt-text-bot adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `x_api`: X (Twitter) API post repository and an in-memory stub
//! - `vision`: OCR and captioning providers (Google Vision, Azure) and stubs
//! - `locale`: Built-in reply string tables
//! - `outbox`: Dry-run repository that writes replies to a JSONL file

pub mod locale;
pub mod outbox;
pub mod vision;
pub mod x_api;

/// Re-exports for X API adapters
pub mod x {
    pub use crate::x_api::{StubPostRepository, XPostRepository};
}
