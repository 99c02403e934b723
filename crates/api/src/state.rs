use std::sync::Arc;

use slidecraft_pipeline::{EventBus, Orchestrator};
use slidecraft_storage::ArtifactStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: slidecraft_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Artifact store for page images, templates, and materials.
    pub artifacts: ArtifactStore,
    /// Generation orchestrator driving epochs and tasks.
    pub orchestrator: Arc<Orchestrator>,
    /// Broadcast bus carrying generation progress events.
    pub event_bus: Arc<EventBus>,
}
