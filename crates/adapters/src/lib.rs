//! trend-digest adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `state`: SQLite and in-memory state stores
//! - `llm`: LLM provider adapters (OpenAI, Anthropic, OpenAI-compatible)
//! - `x`: X (Twitter) API adapters

mod state_memory;
mod state_sqlite;

pub mod llm;
pub mod x_api;

/// Re-exports for state adapters
pub mod state {
    pub use crate::state_memory::InMemoryStateStore;
    pub use crate::state_sqlite::SqliteStateStore;
}

/// Re-exports for X API adapters
pub mod x {
    pub use crate::x_api::{StubPostSource, StubXPublisher, XPostSource, XPublisher};
}
