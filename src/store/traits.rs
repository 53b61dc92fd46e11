//! `CheckpointStore` trait — async persistence seam for onboarding sessions.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::onboarding::SessionRecord;

/// Backend-agnostic storage for per-thread onboarding checkpoints.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the record for `thread_id`, if one was checkpointed.
    async fn load_session(&self, thread_id: &str) -> Result<Option<SessionRecord>, DatabaseError>;

    /// Insert or overwrite the record for `record.thread_id`.
    async fn save_session(&self, record: &SessionRecord) -> Result<(), DatabaseError>;

    /// Delete a record. Returns whether one existed.
    async fn delete_session(&self, thread_id: &str) -> Result<bool, DatabaseError>;

    /// All records, most recently updated first.
    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, DatabaseError>;
}
