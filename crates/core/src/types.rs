//! Workspace-wide primitive type aliases.

/// Identifier of a comparison task. Assigned at creation, immutable,
/// and used as the correlation id for the remote service.
pub type TaskId = uuid::Uuid;

/// UTC timestamp used across models.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
