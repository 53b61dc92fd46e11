//! OnboardingSessions — drives per-thread onboarding over a checkpoint store.
//!
//! Every operation loads the thread's persisted record, re-resolves its
//! phase, applies the change and writes it back. Operations on the same
//! thread are serialized; different threads run independently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::SessionError;
use crate::store::CheckpointStore;

use super::checkpoint::{AwaitingInput, TaskState, should_persist};
use super::flavor::AgentFlavor;
use super::inputs::OnboardingInputs;
use super::phase::OnboardingPhase;
use super::resolver::Resolution;

/// Persisted onboarding state for one thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub thread_id: String,
    pub flavor: AgentFlavor,
    /// Collected flags. Requirement flags are derived from `flavor` at
    /// resolution time, so whatever is stored here for them is ignored.
    pub inputs: OnboardingInputs,
    /// Last checkpointed task snapshot.
    #[serde(default)]
    pub task: AwaitingInput,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(thread_id: impl Into<String>, flavor: AgentFlavor) -> Self {
        let now = Utc::now();
        Self {
            thread_id: thread_id.into(),
            flavor,
            inputs: OnboardingInputs::default(),
            task: AwaitingInput {
                task_state: Some(TaskState::Submitted),
                ..Default::default()
            },
            created_at: now,
            updated_at: now,
        }
    }

    /// Collected flags with this flavor's requirements applied.
    pub fn effective_inputs(&self) -> OnboardingInputs {
        self.inputs.with_requirements(self.flavor.requirements())
    }

    pub fn resolution(&self) -> Resolution {
        self.flavor.resolver().explain(&self.effective_inputs())
    }

    pub fn phase(&self) -> OnboardingPhase {
        self.resolution().phase
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A completed setup step reported by a phase handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepUpdate {
    PoolCatalog,
    SetupInput,
    FundingToken,
    DelegationBundle,
    OperatorConfig,
    SetupComplete,
}

impl StepUpdate {
    pub fn apply(&self, inputs: &mut OnboardingInputs) {
        match self {
            Self::PoolCatalog => inputs.has_pool_catalog = true,
            Self::SetupInput => inputs.has_setup_input = true,
            Self::FundingToken => inputs.has_funding_token_input = true,
            Self::DelegationBundle => inputs.has_delegation_bundle = true,
            Self::OperatorConfig => inputs.has_operator_config = true,
            Self::SetupComplete => inputs.setup_complete = true,
        }
    }
}

/// Result of suspending a thread on external input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Suspension {
    /// Phase the thread is waiting in.
    pub phase: OnboardingPhase,
    /// Whether a checkpoint write was issued.
    pub persisted: bool,
}

/// Coordinates onboarding for many threads over one checkpoint store.
pub struct OnboardingSessions {
    store: Arc<dyn CheckpointStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OnboardingSessions {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Run `op` while holding the thread's lock.
    ///
    /// The lock entry is dropped from the map afterwards unless another
    /// caller is already queued on it, so the map only holds threads with
    /// an operation in flight.
    async fn with_thread<T, F, Fut>(&self, thread_id: &str, op: F) -> Result<T, SessionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SessionError>>,
    {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(thread_id.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;

        let result = op().await;

        let mut locks = self.locks.lock().await;
        // One reference from the map, one held by `guard`.
        if Arc::strong_count(OwnedMutexGuard::mutex(&guard)) == 2 {
            locks.remove(thread_id);
        }
        drop(guard);
        result
    }

    async fn load_required(&self, thread_id: &str) -> Result<SessionRecord, SessionError> {
        self.store
            .load_session(thread_id)
            .await?
            .ok_or_else(|| SessionError::NotFound {
                thread_id: thread_id.to_string(),
            })
    }

    async fn save(&self, record: &mut SessionRecord) -> Result<(), SessionError> {
        record.touch();
        if let Err(e) = self.store.save_session(record).await {
            tracing::warn!(thread_id = %record.thread_id, "Failed to persist onboarding session: {}", e);
            return Err(e.into());
        }
        Ok(())
    }

    /// Create the thread's record if it does not exist yet. An existing
    /// record is returned unchanged, whatever flavor is passed.
    pub async fn start(
        &self,
        thread_id: &str,
        flavor: AgentFlavor,
    ) -> Result<SessionRecord, SessionError> {
        self.with_thread(thread_id, || async move {
            if let Some(existing) = self.store.load_session(thread_id).await? {
                tracing::debug!(thread_id, flavor = %existing.flavor, "Onboarding session already exists");
                return Ok(existing);
            }

            let mut record = SessionRecord::new(thread_id, flavor);
            self.save(&mut record).await?;
            tracing::info!(
                thread_id,
                flavor = %flavor,
                phase = %record.phase(),
                "Started onboarding session"
            );
            Ok(record)
        })
        .await
    }

    /// Current persisted record.
    pub async fn status(&self, thread_id: &str) -> Result<SessionRecord, SessionError> {
        self.with_thread(thread_id, || self.load_required(thread_id))
            .await
    }

    /// Phase the thread must execute next.
    pub async fn resolve(&self, thread_id: &str) -> Result<OnboardingPhase, SessionError> {
        Ok(self.status(thread_id).await?.phase())
    }

    /// Record a completed step and return the updated record.
    pub async fn apply(
        &self,
        thread_id: &str,
        step: StepUpdate,
    ) -> Result<SessionRecord, SessionError> {
        self.with_thread(thread_id, || async move {
            let mut record = self.load_required(thread_id).await?;

            let before = record.phase();
            step.apply(&mut record.inputs);
            record.task = AwaitingInput {
                task_state: Some(TaskState::Working),
                ..Default::default()
            };
            self.save(&mut record).await?;

            let after = record.phase();
            if after != before {
                tracing::info!(thread_id, from = %before, to = %after, "Onboarding phase advanced");
            }
            Ok(record)
        })
        .await
    }

    /// Suspend the thread waiting for input in its current phase.
    ///
    /// The waiting snapshot is only written when it differs from the last
    /// checkpoint, so repeated re-entry into the same wait is free. A ready
    /// thread has nothing left to collect and cannot be suspended.
    pub async fn await_input(
        &self,
        thread_id: &str,
        message: &str,
    ) -> Result<Suspension, SessionError> {
        self.with_thread(thread_id, || async move {
            let mut record = self.load_required(thread_id).await?;

            let phase = record.phase();
            if phase.is_terminal() {
                tracing::warn!(thread_id, "Refusing to suspend a ready onboarding session");
                return Err(SessionError::AlreadyReady {
                    thread_id: thread_id.to_string(),
                });
            }

            let next = AwaitingInput::new(message, phase.as_str());
            let persisted = should_persist(&record.task, &next);
            if persisted {
                record.task = next;
                self.save(&mut record).await?;
            } else {
                tracing::debug!(thread_id, phase = %phase, "Checkpoint unchanged, skipping write");
            }

            Ok(Suspension { phase, persisted })
        })
        .await
    }

    /// Record a rejected or invalid response to the pending request.
    ///
    /// Only valid while the thread is `input-required`. The phase does not
    /// change; the task moves to `failed` so the next `await_input`
    /// re-checkpoints the retry.
    pub async fn reject_input(
        &self,
        thread_id: &str,
        reason: &str,
    ) -> Result<SessionRecord, SessionError> {
        self.with_thread(thread_id, || async move {
            let mut record = self.load_required(thread_id).await?;

            if !record.task.is_awaiting() {
                tracing::warn!(
                    thread_id,
                    state = ?record.task.task_state,
                    "Rejection received with no pending input request"
                );
                return Err(SessionError::NoPendingInput {
                    thread_id: thread_id.to_string(),
                });
            }

            let phase = record.phase();
            record.task = AwaitingInput {
                task_state: Some(TaskState::Failed),
                task_message: Some(reason.to_string()),
                onboarding_key: Some(phase.as_str().to_string()),
            };
            self.save(&mut record).await?;
            tracing::info!(thread_id, phase = %phase, reason, "Onboarding input rejected");
            Ok(record)
        })
        .await
    }

    /// Stop the agent: drop delegations and the derived operator config.
    /// Operator inputs are kept, so re-hiring resumes at delegations.
    pub async fn fire(&self, thread_id: &str) -> Result<SessionRecord, SessionError> {
        self.with_thread(thread_id, || async move {
            let mut record = self.load_required(thread_id).await?;

            record.inputs.has_delegation_bundle = false;
            record.inputs.has_operator_config = false;
            record.inputs.setup_complete = false;
            record.task = AwaitingInput {
                task_state: Some(TaskState::Canceled),
                ..Default::default()
            };
            self.save(&mut record).await?;
            tracing::info!(thread_id, phase = %record.phase(), "Agent fired");
            Ok(record)
        })
        .await
    }

    /// Delete the thread's record. Returns whether one existed.
    pub async fn remove(&self, thread_id: &str) -> Result<bool, SessionError> {
        self.with_thread(thread_id, || async move {
            Ok(self.store.delete_session(thread_id).await?)
        })
        .await
    }

    pub async fn list(&self) -> Result<Vec<SessionRecord>, SessionError> {
        Ok(self.store.list_sessions().await?)
    }
}
