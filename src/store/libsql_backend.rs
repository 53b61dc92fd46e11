//! libSQL backend — async `CheckpointStore` implementation.
//!
//! Supports local file and in-memory databases. Each session is one row;
//! the full record is kept as a JSON blob next to a few indexed columns.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::onboarding::SessionRecord;
use crate::store::migrations;
use crate::store::traits::CheckpointStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn decode_record(json: &str) -> Result<SessionRecord, DatabaseError> {
    serde_json::from_str(json).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

#[async_trait]
impl CheckpointStore for LibSqlBackend {
    async fn load_session(&self, thread_id: &str) -> Result<Option<SessionRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT record FROM onboarding_sessions WHERE thread_id = ?1",
                params![thread_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load_session: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let json: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("load_session: {e}")))?;
                decode_record(&json).map(Some)
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("load_session: {e}"))),
        }
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(record)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO onboarding_sessions (thread_id, flavor, record, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (thread_id) DO UPDATE SET flavor = ?2, record = ?3, updated_at = ?5",
                params![
                    record.thread_id.as_str(),
                    record.flavor.as_str(),
                    json,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_session: {e}")))?;

        debug!(thread_id = %record.thread_id, "Saved onboarding checkpoint");
        Ok(())
    }

    async fn delete_session(&self, thread_id: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM onboarding_sessions WHERE thread_id = ?1",
                params![thread_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_session: {e}")))?;
        Ok(count > 0)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT record FROM onboarding_sessions ORDER BY updated_at DESC, thread_id ASC",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_sessions: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_sessions: {e}")))?
        {
            let json: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("list_sessions: {e}")))?;
            records.push(decode_record(&json)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::onboarding::{AgentFlavor, AwaitingInput, OnboardingPhase};

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn session_crud() {
        let db = test_db().await;
        let mut record = SessionRecord::new("thread-1", AgentFlavor::Gmx);

        db.save_session(&record).await.unwrap();
        let fetched = db.load_session("thread-1").await.unwrap().unwrap();
        assert_eq!(fetched, record);
        assert_eq!(fetched.phase(), OnboardingPhase::CollectPoolCatalog);

        // Upsert
        record.inputs.has_pool_catalog = true;
        record.task = AwaitingInput::new("Pick a market", "collect-setup-input");
        db.save_session(&record).await.unwrap();
        let fetched = db.load_session("thread-1").await.unwrap().unwrap();
        assert!(fetched.inputs.has_pool_catalog);
        assert!(fetched.task.is_awaiting());
        assert_eq!(fetched.phase(), OnboardingPhase::CollectSetupInput);

        assert!(db.delete_session("thread-1").await.unwrap());
        assert!(db.load_session("thread-1").await.unwrap().is_none());
        assert!(!db.delete_session("thread-1").await.unwrap());
    }

    #[tokio::test]
    async fn list_orders_by_most_recent_update() {
        let db = test_db().await;
        let mut older = SessionRecord::new("older", AgentFlavor::Clmm);
        older.updated_at = Utc::now() - Duration::minutes(5);
        let newer = SessionRecord::new("newer", AgentFlavor::Polymarket);

        db.save_session(&older).await.unwrap();
        db.save_session(&newer).await.unwrap();

        let ids: Vec<String> = db
            .list_sessions()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.thread_id)
            .collect();
        assert_eq!(ids, vec!["newer".to_string(), "older".to_string()]);
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.db");

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.save_session(&SessionRecord::new("durable", AgentFlavor::Pendle))
                .await
                .unwrap();
        }

        let db = LibSqlBackend::new_local(&path).await.unwrap();
        let record = db.load_session("durable").await.unwrap().unwrap();
        assert_eq!(record.flavor, AgentFlavor::Pendle);
    }
}
