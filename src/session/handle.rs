use super::id::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a download job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Registered, waiting for a free job slot
    Pending,
    Downloading,
    Uploading,
    Ready,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// Snapshot of the job bound to a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHandle {
    pub session_id: SessionId,

    /// Provider stream handle being downloaded
    pub rendition_id: String,

    pub state: JobState,

    /// When the job was registered
    pub created_at: DateTime<Utc>,

    /// When `state` last changed
    pub updated_at: DateTime<Utc>,
}

impl JobHandle {
    pub fn new(session_id: SessionId, rendition_id: String) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            rendition_id,
            state: JobState::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
