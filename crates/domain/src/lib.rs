//! trend-digest domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `analytics`: Hashtag, sentiment and engagement statistics
//! - `policy`: Format constraints for drafted reports
//! - `templates`: Prompt templates for the generation steps
//! - `usecases`: Application use cases / business logic

pub mod analytics;
pub mod model;
pub mod policy;
pub mod ports;
pub mod templates;
pub mod usecases;

pub use model::*;
pub use ports::*;
