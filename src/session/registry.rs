use super::handle::{JobHandle, JobState};
use super::id::SessionId;
use crate::events::{Broadcaster, ProgressEvent, Subscription};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session {0} already has an active job")]
    AlreadyActive(SessionId),
}

/// Owns every session's room membership and its in-flight job.
///
/// Jobs are registered through [`SessionRegistry::register`], which hands back
/// a [`JobLease`]; dropping the lease removes the job, so a job can never
/// outlive the task that runs it.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    jobs: Mutex<HashMap<SessionId, JobHandle>>,
    slots: Arc<Semaphore>,
    max_concurrent: usize,
    broadcaster: Broadcaster,
}

impl SessionRegistry {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            inner: Arc::new(RegistryInner {
                jobs: Mutex::new(HashMap::new()),
                slots: Arc::new(Semaphore::new(max_concurrent)),
                max_concurrent,
                broadcaster: Broadcaster::new(),
            }),
        }
    }

    /// Create the job record for `session_id`
    pub fn register(
        &self,
        session_id: SessionId,
        rendition_id: String,
    ) -> Result<JobLease, RegistryError> {
        let mut jobs = self.jobs();
        if jobs.contains_key(&session_id) {
            return Err(RegistryError::AlreadyActive(session_id));
        }
        jobs.insert(session_id, JobHandle::new(session_id, rendition_id));
        debug!("Registered job for session {} ({} active)", session_id, jobs.len());

        Ok(JobLease {
            registry: self.clone(),
            session_id,
        })
    }

    pub fn job(&self, session_id: SessionId) -> Option<JobHandle> {
        self.jobs().get(&session_id).cloned()
    }

    pub fn active_jobs(&self) -> usize {
        self.jobs().len()
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    pub fn subscribe(&self, session_id: SessionId) -> Subscription {
        self.inner.broadcaster.subscribe(session_id)
    }

    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.inner
            .broadcaster
            .unsubscribe(subscription.session_id, subscription.connection_id);
    }

    pub fn publish(&self, session_id: SessionId, event: ProgressEvent) -> usize {
        self.inner.broadcaster.publish(session_id, event)
    }

    /// Connections currently in `session_id`'s room
    pub fn subscriber_count(&self, session_id: SessionId) -> usize {
        self.inner.broadcaster.subscriber_count(session_id)
    }

    fn set_state(&self, session_id: SessionId, state: JobState) {
        if let Some(job) = self.jobs().get_mut(&session_id) {
            // Terminal states are final
            if job.state.is_terminal() {
                return;
            }
            debug!("Session {}: {:?} -> {:?}", session_id, job.state, state);
            job.state = state;
            job.updated_at = Utc::now();
        }
    }

    fn release(&self, session_id: SessionId) {
        if let Some(job) = self.jobs().remove(&session_id) {
            info!("Session {} finished in state {:?}", session_id, job.state);
        }
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<SessionId, JobHandle>> {
        self.inner.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Exclusive claim on a session's job record
pub struct JobLease {
    registry: SessionRegistry,
    session_id: SessionId,
}

impl JobLease {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Handle for updating state and publishing from other tasks
    pub fn reporter(&self) -> JobReporter {
        JobReporter {
            registry: self.registry.clone(),
            session_id: self.session_id,
        }
    }

    /// Wait for one of the registry's job slots
    pub async fn acquire_slot(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.registry.inner.slots).acquire_owned().await
    }
}

/// Reports a job's state and events without owning its record
#[derive(Clone)]
pub struct JobReporter {
    registry: SessionRegistry,
    session_id: SessionId,
}

impl JobReporter {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn set_state(&self, state: JobState) {
        self.registry.set_state(self.session_id, state);
    }

    pub fn state(&self) -> Option<JobState> {
        self.registry.job(self.session_id).map(|job| job.state)
    }

    pub fn publish(&self, event: ProgressEvent) -> usize {
        self.registry.publish(self.session_id, event)
    }
}

impl Drop for JobLease {
    fn drop(&mut self) {
        self.registry.release(self.session_id);
    }
}
