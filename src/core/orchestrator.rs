//! Fan-out/fan-in orchestration of pair requests
//!
//! `submit_pair` creates two fetch jobs plus their join record and hands both
//! jobs to the executor. Each fetch completion is recorded on its job and
//! applied to the join; the completion that settles a successful join
//! dispatches the single aggregate job. Any fetch failure abandons the join.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::core::executor::{JobExecutor, JobRunner};
use crate::core::publisher::ResultPublisher;
use crate::error::{JobError, OrchestratorError, StoreError};
use crate::jobs::{HandlerOutput, JobContext, JobRegistry, JobStore, JoinDecision, JoinRecord, JoinTable};
use crate::metrics::Metrics;
use crate::models::{
    AggregateParams, DateRange, FetchParams, FetchResult, Job, JobId, JobKind, JobOutput,
    JobParams, JobState, PairKey, PairMetricsDocument, RequestId, StrategyParams,
};

/// One pair analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRequest {
    pub pair: PairKey,
    pub range: DateRange,
    #[serde(default)]
    pub strategy: StrategyParams,
}

/// Identifiers handed back to the caller right after submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairSubmission {
    pub request_id: RequestId,
    /// Fetch job ids in pair order
    pub fetch_jobs: [JobId; 2],
}

/// Outcome of applying one fetch completion to its join
#[derive(Debug, Clone, PartialEq)]
pub enum JoinProgress {
    /// The other leg is still outstanding
    Waiting,
    /// This completion settled the join and dispatched the aggregate job
    Dispatched(JobId),
    /// This completion failed and short-circuited the join
    Abandoned,
    /// The join was already consumed; nothing was dispatched
    Discarded,
    /// The job had already reached a terminal state
    Duplicate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobLookup {
    Found(Job),
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PairLookup {
    Found(PairMetricsDocument),
    NotComputed,
}

/// Aggregate jobs whose completion is being applied. Held from the terminal
/// check until the store records the outcome.
#[derive(Default)]
struct Finishing(Mutex<HashSet<JobId>>);

impl Finishing {
    fn claim(self: &Arc<Self>, job_id: &JobId) -> Option<FinishingGuard> {
        if !self.0.lock().insert(job_id.clone()) {
            return None;
        }
        Some(FinishingGuard {
            set: self.clone(),
            job_id: job_id.clone(),
        })
    }
}

struct FinishingGuard {
    set: Arc<Finishing>,
    job_id: JobId,
}

impl Drop for FinishingGuard {
    fn drop(&mut self) {
        self.set.0.lock().remove(&self.job_id);
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    jobs: Arc<dyn JobStore>,
    joins: Arc<JoinTable>,
    finishing: Arc<Finishing>,
    registry: Arc<JobRegistry>,
    executor: Arc<dyn JobExecutor>,
    context: Arc<JobContext>,
    publisher: ResultPublisher,
}

impl Orchestrator {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        executor: Arc<dyn JobExecutor>,
        context: Arc<JobContext>,
        publisher: ResultPublisher,
    ) -> Self {
        Self {
            jobs,
            joins: Arc::new(JoinTable::new()),
            finishing: Arc::new(Finishing::default()),
            registry: Arc::new(JobRegistry::default()),
            executor,
            context,
            publisher,
        }
    }

    pub fn with_registry(mut self, registry: JobRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn context(&self) -> &JobContext {
        &self.context
    }

    /// Pending joins, for supervision and tests
    pub fn pending_joins(&self) -> usize {
        self.joins.len()
    }

    fn metrics(&self) -> Option<&Metrics> {
        self.context.metrics.as_deref()
    }

    fn runner(&self) -> Arc<dyn JobRunner> {
        Arc::new(self.clone())
    }

    fn dispatch(&self, job: Job) {
        if let Some(metrics) = self.metrics() {
            metrics
                .jobs_submitted_total
                .with_label_values(&[job.kind.to_string().as_str()])
                .inc();
        }
        self.executor.submit(job, self.runner());
    }

    /// Create both fetch jobs and their join record, then enqueue the jobs.
    /// Returns without waiting for either job. Every call creates fresh jobs.
    pub async fn submit_pair(&self, request: PairRequest) -> Result<PairSubmission, OrchestratorError> {
        if !request.range.is_valid() {
            return Err(OrchestratorError::InvalidRange {
                start: request.range.start.to_string(),
                end: request.range.end.to_string(),
            });
        }

        let request_id = RequestId::new();
        let fetch_job = |symbol: &str| {
            Job::new(
                request_id.clone(),
                JobParams::Fetch(FetchParams {
                    symbol: symbol.to_string(),
                    range: request.range,
                    resolution: request.strategy.freq,
                }),
            )
        };
        let job_1 = fetch_job(&request.pair.symbol_1);
        let job_2 = fetch_job(&request.pair.symbol_2);
        let fetch_jobs = [job_1.id.clone(), job_2.id.clone()];

        // Jobs and join must both exist before either job can complete
        self.jobs.insert(job_1.clone()).await?;
        self.jobs.insert(job_2.clone()).await?;
        self.joins.insert(JoinRecord::new(
            request_id.clone(),
            request.pair.clone(),
            fetch_jobs.clone(),
            request.strategy.clone(),
        ));

        info!(
            request_id = %request_id,
            pair = %request.pair,
            start = %request.range.start,
            end = %request.range.end,
            "Orchestrator: queued fetch jobs for {}",
            request.pair
        );

        self.dispatch(job_1);
        self.dispatch(job_2);

        Ok(PairSubmission {
            request_id,
            fetch_jobs,
        })
    }

    /// Record a fetch job's terminal result and evaluate its join.
    ///
    /// Safe to call concurrently for both legs of one request; the join's
    /// lock guarantees at most one aggregate dispatch.
    pub async fn on_fetch_complete(
        &self,
        job_id: &JobId,
        result: FetchResult,
    ) -> Result<JoinProgress, OrchestratorError> {
        let job = self.expect_job(job_id, JobKind::Fetch).await?;

        let outcome = if result.is_success() {
            Ok(JobOutput::Fetch(result.clone()))
        } else {
            Err(result
                .error
                .clone()
                .unwrap_or_else(|| format!("fetch failed for {}", result.symbol)))
        };

        match self.jobs.complete(job_id, outcome).await {
            Ok(done) => self.record_completion(&done),
            Err(StoreError::AlreadyTerminal(_)) => {
                debug!(job_id = %job_id, "Orchestrator: ignoring repeated completion for {}", job_id);
                self.evict(result.series.iter());
                return Ok(JoinProgress::Duplicate);
            }
            Err(e) => return Err(e.into()),
        }

        let decision = self
            .joins
            .record(&job.request_id, job_id, result)
            .ok_or_else(|| OrchestratorError::OrphanJob(job_id.to_string()))?;

        let progress = match decision {
            JoinDecision::Waiting => {
                debug!(request_id = %job.request_id, job_id = %job_id, "Orchestrator: waiting on second leg");
                JoinProgress::Waiting
            }
            JoinDecision::Dispatch(params) => {
                let aggregate_id = self.dispatch_aggregate(&job.request_id, params).await?;
                JoinProgress::Dispatched(aggregate_id)
            }
            JoinDecision::Abandoned { stale } => {
                warn!(
                    request_id = %job.request_id,
                    job_id = %job_id,
                    symbol = %job.label(),
                    "Orchestrator: fetch for {} failed, pair request abandoned",
                    job.label()
                );
                if let Some(metrics) = self.metrics() {
                    metrics.joins_abandoned_total.inc();
                }
                self.evict(stale.iter());
                JoinProgress::Abandoned
            }
            JoinDecision::Discarded { stale } => {
                debug!(request_id = %job.request_id, job_id = %job_id, "Orchestrator: join already consumed");
                self.evict(stale.iter());
                JoinProgress::Discarded
            }
            JoinDecision::Duplicate => JoinProgress::Duplicate,
        };

        Ok(progress)
    }

    async fn dispatch_aggregate(
        &self,
        request_id: &RequestId,
        params: AggregateParams,
    ) -> Result<JobId, OrchestratorError> {
        let pair = params.pair.clone();
        let job = Job::new(request_id.clone(), JobParams::Aggregate(params));
        let job_id = job.id.clone();
        self.jobs.insert(job.clone()).await?;

        if let Some(metrics) = self.metrics() {
            metrics.aggregations_dispatched_total.inc();
        }
        info!(
            request_id = %request_id,
            job_id = %job_id,
            pair = %pair,
            "Orchestrator: both legs fetched, dispatching aggregation for {}",
            pair
        );

        self.dispatch(job);
        Ok(job_id)
    }

    /// Publish a successful aggregation, or record its error on the job.
    /// No retry is attempted.
    ///
    /// Only one completion per job is applied at a time; a completion that
    /// arrives while another is being published (including `abandon`) is
    /// ignored, so a published document always belongs to a succeeded job.
    pub async fn on_aggregate_complete(
        &self,
        job_id: &JobId,
        outcome: Result<PairMetricsDocument, JobError>,
    ) -> Result<(), OrchestratorError> {
        let Some(_claim) = self.finishing.claim(job_id) else {
            debug!(job_id = %job_id, "Orchestrator: completion already in flight for {}", job_id);
            return Ok(());
        };
        let job = self.expect_job(job_id, JobKind::Aggregate).await?;
        if job.is_terminal() {
            debug!(job_id = %job_id, "Orchestrator: ignoring repeated completion for {}", job_id);
            return Ok(());
        }

        let recorded = match outcome {
            Ok(document) => match self.publisher.publish(&document).await {
                Ok(()) => Ok(JobOutput::Aggregate(document.summary)),
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "Orchestrator: failed to publish {}", document.key());
                    Err(JobError::Publish(e.to_string()).to_string())
                }
            },
            Err(e) => {
                warn!(job_id = %job_id, pair = %job.label(), error = %e, "Orchestrator: aggregation failed for {}", job.label());
                Err(e.to_string())
            }
        };

        if let JobParams::Aggregate(params) = &job.params {
            self.evict(params.legs.iter().filter_map(|leg| leg.series.as_ref()));
        }

        match self.jobs.complete(job_id, recorded).await {
            Ok(done) => {
                self.record_completion(&done);
                Ok(())
            }
            Err(StoreError::AlreadyTerminal(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Let an external supervisor fail a job that will never report.
    /// Fetch jobs go through the normal join path.
    pub async fn abandon(&self, job_id: &JobId, reason: &str) -> Result<(), OrchestratorError> {
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        if job.is_terminal() {
            return Err(StoreError::AlreadyTerminal(job_id.to_string()).into());
        }

        warn!(job_id = %job_id, kind = %job.kind, reason = %reason, "Orchestrator: abandoning {} job {}", job.kind, job_id);
        let error = JobError::Abandoned(reason.to_string());
        match job.kind {
            JobKind::Fetch => {
                self.on_fetch_complete(job_id, FetchResult::failure(job.label(), error.to_string()))
                    .await?;
            }
            JobKind::Aggregate => {
                self.on_aggregate_complete(job_id, Err(error)).await?;
            }
        }
        Ok(())
    }

    /// Non-blocking point read
    pub async fn get_job_status(&self, job_id: &JobId) -> Result<JobLookup, OrchestratorError> {
        Ok(match self.jobs.get(job_id).await? {
            Some(job) => JobLookup::Found(job),
            None => JobLookup::NotFound,
        })
    }

    pub async fn get_request_jobs(&self, request_id: &RequestId) -> Result<Vec<Job>, OrchestratorError> {
        Ok(self.jobs.list_by_request(request_id).await?)
    }

    pub async fn get_pair_document(&self, pair: &PairKey) -> Result<PairLookup, OrchestratorError> {
        Ok(match self.publisher.fetch(pair).await? {
            Some(document) => PairLookup::Found(document),
            None => PairLookup::NotComputed,
        })
    }

    async fn expect_job(&self, job_id: &JobId, expected: JobKind) -> Result<Job, OrchestratorError> {
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        if job.kind != expected {
            return Err(OrchestratorError::WrongKind {
                id: job_id.to_string(),
                expected: expected.to_string(),
                actual: job.kind.to_string(),
            });
        }
        Ok(job)
    }

    fn record_completion(&self, job: &Job) {
        if let Some(metrics) = self.metrics() {
            metrics
                .jobs_completed_total
                .with_label_values(&[job.kind.to_string().as_str(), job.state.to_string().as_str()])
                .inc();
        }
        match job.state {
            JobState::Failed => debug!(job_id = %job.id, kind = %job.kind, error = ?job.error, "Orchestrator: job failed"),
            _ => debug!(job_id = %job.id, kind = %job.kind, state = %job.state, "Orchestrator: job finished"),
        }
    }

    fn evict<'a>(&self, locators: impl Iterator<Item = &'a String>) {
        for locator in locators {
            self.context.series.remove(locator);
        }
    }
}

#[async_trait]
impl JobRunner for Orchestrator {
    async fn run(&self, job: Job) {
        match self.jobs.mark_running(&job.id).await {
            Ok(_) => {}
            Err(StoreError::AlreadyTerminal(_)) => {
                debug!(job_id = %job.id, "Orchestrator: {} finished before it started", job.id);
                return;
            }
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Orchestrator: cannot start job {}", job.id);
                return;
            }
        }

        let started = Instant::now();
        let outcome = match self.registry.handler(job.kind) {
            Some(handler) => handler.handle(&job, &self.context).await,
            None => Err(JobError::UnknownKind(job.kind.to_string())),
        };
        if let Some(metrics) = self.metrics() {
            metrics
                .job_duration_seconds
                .with_label_values(&[job.kind.to_string().as_str()])
                .observe(started.elapsed().as_secs_f64());
        }

        let reported = match job.kind {
            JobKind::Fetch => {
                let result = match outcome {
                    Ok(HandlerOutput::Fetch(result)) => result,
                    Ok(_) => FetchResult::failure(job.label(), JobError::UnexpectedPayload(job.id.to_string()).to_string()),
                    Err(e) => FetchResult::failure(job.label(), e.to_string()),
                };
                self.on_fetch_complete(&job.id, result).await.map(|_| ())
            }
            JobKind::Aggregate => {
                let outcome = match outcome {
                    Ok(HandlerOutput::Aggregate(document)) => Ok(document),
                    Ok(_) => Err(JobError::UnexpectedPayload(job.id.to_string())),
                    Err(e) => Err(e),
                };
                self.on_aggregate_complete(&job.id, outcome).await
            }
        };

        if let Err(e) = reported {
            error!(job_id = %job.id, kind = %job.kind, error = %e, "Orchestrator: failed to record completion of {}", job.id);
        }
    }
}
