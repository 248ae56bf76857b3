use std::sync::Arc;

use async_trait::async_trait;
use pairflow::core::{JobLookup, JoinProgress, PairLookup, PairRequest};
use pairflow::db::{InMemoryDocumentStore, PairDocumentStore};
use pairflow::error::StoreResult;
use pairflow::models::{
    FetchResult, JobId, JobKind, JobOutput, JobState, PairKey, PairMetricsDocument,
    StrategyParams, TradeSignal,
};
use pairflow::stats::{compute_metrics, AnalysisConfig};
use pairflow::{MarketDataError, OrchestratorError};
use tokio::sync::{Barrier, Notify};

use crate::fixtures::{cointegrated_pair, constant_series, range_for};
use crate::test_utils::{
    eventually, pair_provider, recording_harness, recording_harness_with_store, running_harness,
    wait_for_request, wait_for_terminal,
};

fn request(n: usize) -> PairRequest {
    PairRequest {
        pair: PairKey::new("AAA", "BBB"),
        range: range_for(n),
        strategy: StrategyParams::default(),
    }
}

#[tokio::test]
async fn successful_pair_runs_exactly_one_aggregation() {
    let harness = running_harness(pair_provider(100));
    let orchestrator = &harness.orchestrator;

    let submission = orchestrator.submit_pair(request(100)).await.unwrap();
    let jobs = wait_for_request(orchestrator, &submission.request_id, 3).await;

    assert!(jobs.iter().all(|job| job.state == JobState::Succeeded));
    assert_eq!(jobs.iter().filter(|job| job.kind == JobKind::Fetch).count(), 2);
    let aggregate = jobs
        .iter()
        .find(|job| job.kind == JobKind::Aggregate)
        .expect("aggregate job");

    let Some(JobOutput::Aggregate(summary)) = &aggregate.output else {
        panic!("aggregate output missing");
    };
    assert_eq!(summary.symbol_1, "AAA");
    assert_eq!(summary.symbol_2, "BBB");
    assert_eq!(summary.observations, 100);

    match orchestrator
        .get_pair_document(&PairKey::new("AAA", "BBB"))
        .await
        .unwrap()
    {
        PairLookup::Found(doc) => {
            assert_eq!(&doc.summary, summary);
            assert_eq!(doc.rolling.len(), 71);
        }
        PairLookup::NotComputed => panic!("document not published"),
    }

    assert_eq!(harness.metrics.aggregations_dispatched_total.get(), 1);
    assert_eq!(orchestrator.pending_joins(), 0);
    assert!(orchestrator.context().series.is_empty());
}

#[tokio::test]
async fn submit_returns_queued_fetch_jobs_immediately() {
    let (harness, executor) = recording_harness();
    let submission = harness.orchestrator.submit_pair(request(10)).await.unwrap();

    for id in &submission.fetch_jobs {
        let JobLookup::Found(job) = harness.orchestrator.get_job_status(id).await.unwrap() else {
            panic!("job {} missing", id);
        };
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.kind, JobKind::Fetch);
        assert_eq!(job.request_id, submission.request_id);
    }
    assert_eq!(executor.count(JobKind::Fetch), 2);
    assert_eq!(executor.count(JobKind::Aggregate), 0);
    assert_eq!(harness.orchestrator.pending_joins(), 1);
}

#[tokio::test]
async fn identical_submissions_create_fresh_jobs() {
    let (harness, _) = recording_harness();
    let first = harness.orchestrator.submit_pair(request(10)).await.unwrap();
    let second = harness.orchestrator.submit_pair(request(10)).await.unwrap();

    assert_ne!(first.request_id, second.request_id);
    assert_ne!(first.fetch_jobs, second.fetch_jobs);
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let (harness, executor) = recording_harness();
    let range = range_for(10);
    let result = harness
        .orchestrator
        .submit_pair(PairRequest {
            pair: PairKey::new("AAA", "BBB"),
            range: pairflow::models::DateRange::new(range.end, range.start),
            strategy: StrategyParams::default(),
        })
        .await;

    assert!(matches!(result, Err(OrchestratorError::InvalidRange { .. })));
    assert!(executor.jobs().is_empty());
}

#[tokio::test]
async fn failed_leg_short_circuits_the_join() {
    let provider = pair_provider(100)
        .with_failure("BBB", MarketDataError::InvalidSymbol("BBB".to_string()));
    let harness = running_harness(provider);
    let orchestrator = &harness.orchestrator;

    let submission = orchestrator.submit_pair(request(100)).await.unwrap();
    let jobs = wait_for_request(orchestrator, &submission.request_id, 2).await;

    let failed = wait_for_terminal(orchestrator, &submission.fetch_jobs[1]).await;
    assert_eq!(failed.state, JobState::Failed);
    assert!(failed.error.as_deref().unwrap().contains("Invalid symbol"));
    assert!(jobs.iter().all(|job| job.kind == JobKind::Fetch));

    assert_eq!(
        orchestrator
            .get_pair_document(&PairKey::new("AAA", "BBB"))
            .await
            .unwrap(),
        PairLookup::NotComputed
    );
    eventually(|| orchestrator.pending_joins() == 0 && orchestrator.context().series.is_empty())
        .await;
    eventually(|| harness.metrics.joins_abandoned_total.get() == 1).await;
    assert_eq!(harness.metrics.aggregations_dispatched_total.get(), 0);
}

#[tokio::test]
async fn failure_then_success_never_dispatches() {
    let (harness, executor) = recording_harness();
    let orchestrator = &harness.orchestrator;
    let submission = orchestrator.submit_pair(request(10)).await.unwrap();
    let [a, b] = submission.fetch_jobs.clone();

    let first = orchestrator
        .on_fetch_complete(&a, FetchResult::failure("AAA", "Upstream unavailable: 503"))
        .await
        .unwrap();
    let second = orchestrator
        .on_fetch_complete(&b, FetchResult::success("BBB", "mem://b", 10))
        .await
        .unwrap();

    assert_eq!(first, JoinProgress::Abandoned);
    assert_eq!(second, JoinProgress::Discarded);
    assert_eq!(executor.count(JobKind::Aggregate), 0);

    let JobLookup::Found(job_b) = orchestrator.get_job_status(&b).await.unwrap() else {
        panic!("job missing");
    };
    assert_eq!(job_b.state, JobState::Succeeded);
}

#[tokio::test]
async fn sequential_successes_dispatch_once() {
    let (harness, executor) = recording_harness();
    let orchestrator = &harness.orchestrator;
    let submission = orchestrator.submit_pair(request(10)).await.unwrap();
    let [a, b] = submission.fetch_jobs.clone();

    assert_eq!(
        orchestrator
            .on_fetch_complete(&a, FetchResult::success("AAA", "mem://a", 10))
            .await
            .unwrap(),
        JoinProgress::Waiting
    );
    let progress = orchestrator
        .on_fetch_complete(&b, FetchResult::success("BBB", "mem://b", 10))
        .await
        .unwrap();
    assert!(matches!(progress, JoinProgress::Dispatched(_)));

    // A repeated callback changes nothing
    assert_eq!(
        orchestrator
            .on_fetch_complete(&b, FetchResult::success("BBB", "mem://b", 10))
            .await
            .unwrap(),
        JoinProgress::Duplicate
    );
    assert_eq!(executor.count(JobKind::Aggregate), 1);

    let aggregate = executor
        .jobs()
        .into_iter()
        .find(|job| job.kind == JobKind::Aggregate)
        .unwrap();
    assert_eq!(aggregate.request_id, submission.request_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_completions_dispatch_exactly_once() {
    for _ in 0..200 {
        let (harness, executor) = recording_harness();
        let orchestrator = harness.orchestrator.clone();
        let submission = orchestrator.submit_pair(request(10)).await.unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let legs: [(JobId, &str); 2] = [
            (submission.fetch_jobs[0].clone(), "AAA"),
            (submission.fetch_jobs[1].clone(), "BBB"),
        ];
        let handles: Vec<_> = legs
            .into_iter()
            .map(|(job_id, symbol)| {
                let orchestrator = orchestrator.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    orchestrator
                        .on_fetch_complete(
                            &job_id,
                            FetchResult::success(symbol, format!("mem://{}", job_id), 10),
                        )
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut dispatched = 0;
        for handle in handles {
            if let JoinProgress::Dispatched(_) = handle.await.unwrap() {
                dispatched += 1;
            }
        }

        assert_eq!(dispatched, 1);
        assert_eq!(executor.count(JobKind::Aggregate), 1);
        assert_eq!(harness.metrics.aggregations_dispatched_total.get(), 1);
    }
}

#[tokio::test]
async fn degenerate_input_fails_the_aggregate_job() {
    let provider = pairflow::services::StaticMarketDataProvider::new()
        .with_series("AAA", constant_series(60, 100.0))
        .with_series("BBB", constant_series(60, 50.0));
    let harness = running_harness(provider);
    let orchestrator = &harness.orchestrator;

    let submission = orchestrator.submit_pair(request(60)).await.unwrap();
    let jobs = wait_for_request(orchestrator, &submission.request_id, 3).await;
    let aggregate = jobs.iter().find(|job| job.kind == JobKind::Aggregate).unwrap();

    assert_eq!(aggregate.state, JobState::Failed);
    assert!(aggregate
        .error
        .as_deref()
        .unwrap()
        .contains("Degenerate regression"));
    assert!(aggregate.output.is_none());
    assert_eq!(
        orchestrator
            .get_pair_document(&PairKey::new("AAA", "BBB"))
            .await
            .unwrap(),
        PairLookup::NotComputed
    );
}

#[tokio::test]
async fn strategy_overrides_reach_the_summary() {
    let harness = running_harness(pair_provider(100));
    let orchestrator = &harness.orchestrator;

    let submission = orchestrator
        .submit_pair(PairRequest {
            pair: PairKey::new("AAA", "BBB"),
            range: range_for(100),
            strategy: StrategyParams {
                capital: Some(50_000.0),
                z_score: Some(0.0),
                freq: Some(15),
                window: Some(20),
            },
        })
        .await
        .unwrap();
    wait_for_request(orchestrator, &submission.request_id, 3).await;

    let PairLookup::Found(doc) = orchestrator
        .get_pair_document(&PairKey::new("AAA", "BBB"))
        .await
        .unwrap()
    else {
        panic!("document not published");
    };
    assert_eq!(doc.summary.window, 20);
    assert_eq!(doc.rolling.len(), 81);
    assert_eq!(doc.summary.allocation.as_ref().unwrap().capital, 50_000.0);
    // A zero threshold trades on any non-zero z-score
    if doc.summary.latest_z_score != 0.0 {
        assert_ne!(doc.summary.signal, TradeSignal::Hold);
    }
}

#[tokio::test]
async fn abandoning_a_fetch_fails_the_pair() {
    let (harness, executor) = recording_harness();
    let orchestrator = &harness.orchestrator;
    let submission = orchestrator.submit_pair(request(10)).await.unwrap();
    let [a, b] = submission.fetch_jobs.clone();

    orchestrator.abandon(&a, "worker lost").await.unwrap();
    let JobLookup::Found(job_a) = orchestrator.get_job_status(&a).await.unwrap() else {
        panic!("job missing");
    };
    assert_eq!(job_a.state, JobState::Failed);
    assert!(job_a.error.as_deref().unwrap().contains("worker lost"));

    assert_eq!(
        orchestrator
            .on_fetch_complete(&b, FetchResult::success("BBB", "mem://b", 10))
            .await
            .unwrap(),
        JoinProgress::Discarded
    );
    assert_eq!(executor.count(JobKind::Aggregate), 0);

    // Terminal jobs cannot be abandoned again
    assert!(orchestrator.abandon(&a, "again").await.is_err());
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let (harness, _) = recording_harness();
    assert_eq!(
        harness
            .orchestrator
            .get_job_status(&JobId::from("does-not-exist"))
            .await
            .unwrap(),
        JobLookup::NotFound
    );
}

/// Holds every `put` until released
#[derive(Default)]
struct GatedDocumentStore {
    inner: InMemoryDocumentStore,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl PairDocumentStore for GatedDocumentStore {
    async fn put(&self, document: &PairMetricsDocument) -> StoreResult<()> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.put(document).await
    }

    async fn get(&self, key: &PairKey) -> StoreResult<Option<PairMetricsDocument>> {
        self.inner.get(key).await
    }
}

#[tokio::test]
async fn abandon_during_publish_leaves_job_succeeded() {
    let documents = Arc::new(GatedDocumentStore::default());
    let (harness, _) = recording_harness_with_store(documents.clone());
    let orchestrator = harness.orchestrator.clone();
    let submission = orchestrator.submit_pair(request(100)).await.unwrap();
    let [a, b] = submission.fetch_jobs.clone();

    orchestrator
        .on_fetch_complete(&a, FetchResult::success("AAA", "mem://a", 100))
        .await
        .unwrap();
    let JoinProgress::Dispatched(aggregate_id) = orchestrator
        .on_fetch_complete(&b, FetchResult::success("BBB", "mem://b", 100))
        .await
        .unwrap()
    else {
        panic!("aggregate not dispatched");
    };

    let (s1, s2) = cointegrated_pair(100, 42);
    let document = compute_metrics(
        &PairKey::new("AAA", "BBB"),
        &s1,
        &s2,
        &AnalysisConfig::default(),
    )
    .unwrap();

    let completing = {
        let orchestrator = orchestrator.clone();
        let aggregate_id = aggregate_id.clone();
        tokio::spawn(async move {
            orchestrator
                .on_aggregate_complete(&aggregate_id, Ok(document))
                .await
        })
    };
    documents.entered.notified().await;

    // Publish is in flight; the abandon must not fail the job underneath it
    orchestrator.abandon(&aggregate_id, "supervisor timeout").await.unwrap();
    let JobLookup::Found(job) = orchestrator.get_job_status(&aggregate_id).await.unwrap() else {
        panic!("job missing");
    };
    assert!(!job.is_terminal());

    documents.release.notify_one();
    completing.await.unwrap().unwrap();

    let job = wait_for_terminal(&orchestrator, &aggregate_id).await;
    assert_eq!(job.state, JobState::Succeeded);
    assert!(matches!(
        orchestrator
            .get_pair_document(&PairKey::new("AAA", "BBB"))
            .await
            .unwrap(),
        PairLookup::Found(_)
    ));
}
