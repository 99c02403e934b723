//! Shared primitive type aliases.

/// All entity primary keys are UUIDv4.
pub type EntityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generation epoch counter. Monotonically increasing per project;
/// distinguishes successive generation attempts so stale in-flight
/// results can be discarded.
pub type Epoch = i64;
