//! Domain error taxonomy.
//!
//! Provider failures are pre-classified into transient vs. permanent by
//! the generation client; everything above the client only ever branches
//! on that classification, never on provider-specific detail.

use crate::types::EntityId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: EntityId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Export was requested but no page has a completed image.
    #[error("No content to export: {0}")]
    NoContent(String),

    /// Retryable provider failure (rate limit, timeout, 5xx-equivalent).
    #[error("Transient provider error: {0}")]
    TransientProvider(String),

    /// Non-retryable provider failure (invalid input, content policy,
    /// quota exhausted).
    #[error("Permanent provider error: {0}")]
    PermanentProvider(String),

    /// Artifact read/write failure. Treated as transient at the task
    /// level and retried like a provider error.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether a task that failed with this error may be re-enqueued
    /// under the retry policy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::TransientProvider(_) | CoreError::Storage(_)
        )
    }
}
