//! alt-text-bot domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `errors`: Classified error taxonomy
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: The activity-processing pipeline
//! - `policy`: Platform message length rules

pub mod errors;
pub mod model;
pub mod policy;
pub mod ports;
pub mod usecases;

pub use errors::BotError;
pub use model::*;
pub use ports::*;
