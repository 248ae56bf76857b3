//! Job store: id -> job state and result payload

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::models::{Job, JobId, JobKind, JobOutput, JobState, RequestId};

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: Job) -> StoreResult<()>;

    /// Point read; `None` for unknown ids
    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>>;

    /// `queued -> running`
    async fn mark_running(&self, id: &JobId) -> StoreResult<Job>;

    /// Move a non-terminal job to `succeeded` or `failed`. Terminal jobs are
    /// never touched again.
    async fn complete(&self, id: &JobId, outcome: Result<JobOutput, String>) -> StoreResult<Job>;

    /// Every job spawned by one pair submission, oldest first
    async fn list_by_request(&self, request_id: &RequestId) -> StoreResult<Vec<Job>>;
}

#[derive(Default)]
struct Jobs {
    by_id: HashMap<JobId, Job>,
    /// Terminal jobs in the order they finished
    finished: VecDeque<JobId>,
}

/// Keeps every live job; terminal jobs beyond the retention cap are dropped
/// oldest-finished first
pub struct InMemoryJobStore {
    jobs: RwLock<Jobs>,
    retain_terminal: Option<usize>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(Jobs::default()),
            retain_terminal: None,
        }
    }

    /// Keep at most `limit` terminal jobs
    pub fn with_retention(mut self, limit: usize) -> Self {
        self.retain_terminal = Some(limit);
        self
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) -> StoreResult<()> {
        self.jobs.write().by_id.insert(job.id.clone(), job);
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        Ok(self.jobs.read().by_id.get(id).cloned())
    }

    async fn mark_running(&self, id: &JobId) -> StoreResult<Job> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .by_id
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        match job.state {
            JobState::Queued => {
                job.state = JobState::Running;
                job.updated_at = Utc::now();
                Ok(job.clone())
            }
            state if state.is_terminal() => Err(StoreError::AlreadyTerminal(id.to_string())),
            state => Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: state.to_string(),
                to: JobState::Running.to_string(),
            }),
        }
    }

    async fn complete(&self, id: &JobId, outcome: Result<JobOutput, String>) -> StoreResult<Job> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .by_id
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if job.is_terminal() {
            return Err(StoreError::AlreadyTerminal(id.to_string()));
        }

        match outcome {
            Ok(output) => {
                job.state = JobState::Succeeded;
                job.output = Some(output);
                job.error = None;
            }
            Err(error) => {
                job.state = JobState::Failed;
                job.output = None;
                job.error = Some(error);
            }
        }
        job.updated_at = Utc::now();
        let done = job.clone();

        if let Some(limit) = self.retain_terminal {
            jobs.finished.push_back(id.clone());
            while jobs.finished.len() > limit {
                if let Some(expired) = jobs.finished.pop_front() {
                    jobs.by_id.remove(&expired);
                }
            }
        }
        Ok(done)
    }

    async fn list_by_request(&self, request_id: &RequestId) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .by_id
            .values()
            .filter(|job| &job.request_id == request_id)
            .cloned()
            .collect();
        jobs.sort_by_key(|job| (job.created_at, job.kind == JobKind::Aggregate));
        Ok(jobs)
    }
}
