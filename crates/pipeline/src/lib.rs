//! Generation orchestrator: epoch management, the outline → description →
//! image task DAG, the bounded worker pool, retry scheduling, and
//! progress events.
//!
//! The orchestrator speaks to persistence through the [`DeckStore`]
//! trait and to the AI provider through
//! [`slidecraft_genai::GenerationClient`], so the whole pipeline can be
//! exercised in tests with an in-memory store and a scripted client.

pub mod events;
pub mod orchestrator;
pub mod postgres;
pub mod store;

pub use events::{DeckEvent, EventBus};
pub use orchestrator::{Orchestrator, OrchestratorConfig, StartGeneration};
pub use postgres::PgDeckStore;
pub use store::DeckStore;
