//! Checkpoint persistence gate for sessions about to suspend on input.
//!
//! Re-entering the same waiting step must not rewrite an identical
//! checkpoint every time.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the interruptible task backing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    AuthRequired,
    Completed,
    Canceled,
    Failed,
    Rejected,
    Unknown,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::InputRequired => "input-required",
            Self::AuthRequired => "auth-required",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Task snapshot compared by the gate. On the "current" side every field
/// may be absent (nothing checkpointed yet).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwaitingInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_state: Option<TaskState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_key: Option<String>,
}

impl AwaitingInput {
    /// Proposed waiting snapshot: always `input-required`.
    pub fn new(message: impl Into<String>, onboarding_key: impl Into<String>) -> Self {
        Self {
            task_state: Some(TaskState::InputRequired),
            task_message: Some(message.into()),
            onboarding_key: Some(onboarding_key.into()),
        }
    }

    /// Whether this snapshot is already suspended waiting for input.
    pub fn is_awaiting(&self) -> bool {
        self.task_state == Some(TaskState::InputRequired)
    }
}

/// Whether `next` must be durably saved before suspending.
///
/// Skips the write only when `current` is already `input-required` with the
/// same message and onboarding key.
pub fn should_persist(current: &AwaitingInput, next: &AwaitingInput) -> bool {
    !current.is_awaiting()
        || current.task_message != next.task_message
        || current.onboarding_key != next.onboarding_key
}
