//! Pluggable job execution
//!
//! The orchestrator only hands jobs to a [`JobExecutor`] and is called back
//! through [`JobRunner`]; where the work actually runs is up to the executor.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::models::Job;

/// Runs one job to a terminal state and reports it
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: Job);
}

/// Fire-and-forget submission; must not wait for the job to finish
pub trait JobExecutor: Send + Sync {
    fn submit(&self, job: Job, runner: Arc<dyn JobRunner>);
}

/// Spawns every job as a tokio task, optionally capping how many run at once
#[derive(Default)]
pub struct TokioExecutor {
    limit: Option<Arc<Semaphore>>,
}

impl TokioExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(max_running: usize) -> Self {
        Self {
            limit: Some(Arc::new(Semaphore::new(max_running.max(1)))),
        }
    }
}

impl JobExecutor for TokioExecutor {
    fn submit(&self, job: Job, runner: Arc<dyn JobRunner>) {
        let limit = self.limit.clone();
        debug!(job_id = %job.id, kind = %job.kind, "Executor: spawning {} job", job.kind);
        tokio::spawn(async move {
            let _permit = match limit {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            runner.run(job).await;
        });
    }
}
