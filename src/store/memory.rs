//! In-memory `CheckpointStore`, for tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::onboarding::SessionRecord;
use crate::store::traits::CheckpointStore;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryStore {
    async fn load_session(&self, thread_id: &str) -> Result<Option<SessionRecord>, DatabaseError> {
        Ok(self.sessions.read().await.get(thread_id).cloned())
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<(), DatabaseError> {
        self.sessions
            .write()
            .await
            .insert(record.thread_id.clone(), record.clone());
        Ok(())
    }

    async fn delete_session(&self, thread_id: &str) -> Result<bool, DatabaseError> {
        Ok(self.sessions.write().await.remove(thread_id).is_some())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut records: Vec<SessionRecord> =
            self.sessions.read().await.values().cloned().collect();
        records.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.thread_id.cmp(&b.thread_id))
        });
        Ok(records)
    }
}
