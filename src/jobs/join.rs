//! Join barrier between the two fetch jobs of a pair request.
//!
//! Each request owns one [`JoinRecord`] behind its own mutex. Recording a
//! completion, bumping the counter and the `dispatched` check-and-set all
//! happen under that lock, so two fetch completions racing on different
//! threads produce at most one aggregate dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::{AggregateParams, FetchResult, JobId, PairKey, RequestId, StrategyParams};

/// What the orchestrator must do after a fetch completion is recorded
#[derive(Debug, Clone, PartialEq)]
pub enum JoinDecision {
    /// The other leg has not reported yet
    Waiting,
    /// Both legs succeeded; submit exactly one aggregate job with these params
    Dispatch(AggregateParams),
    /// First failure for this request; aggregation will never run.
    /// `stale` lists series locators of legs that already succeeded.
    Abandoned { stale: Vec<String> },
    /// The join was already consumed (dispatched or abandoned) before this
    /// completion arrived
    Discarded { stale: Vec<String> },
    /// This leg had already reported; nothing changed
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct JoinRecord {
    pub request_id: RequestId,
    pub pair: PairKey,
    pub legs: [JobId; 2],
    pub strategy: StrategyParams,
    results: [Option<FetchResult>; 2],
    completed: u8,
    dispatched: bool,
    consumed: bool,
}

impl JoinRecord {
    pub fn new(
        request_id: RequestId,
        pair: PairKey,
        legs: [JobId; 2],
        strategy: StrategyParams,
    ) -> Self {
        Self {
            request_id,
            pair,
            legs,
            strategy,
            results: [None, None],
            completed: 0,
            dispatched: false,
            consumed: false,
        }
    }

    pub fn slot_of(&self, job_id: &JobId) -> Option<usize> {
        self.legs.iter().position(|leg| leg == job_id)
    }

    pub fn completed(&self) -> u8 {
        self.completed
    }

    pub fn is_dispatched(&self) -> bool {
        self.dispatched
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Both legs have reported
    pub fn is_settled(&self) -> bool {
        self.completed as usize == self.legs.len()
    }

    /// Record the terminal result of the leg in `slot`
    pub fn record(&mut self, slot: usize, result: FetchResult) -> JoinDecision {
        if self.results[slot].is_some() {
            return JoinDecision::Duplicate;
        }
        let succeeded = result.is_success();
        let own_series = result.series.clone();
        self.results[slot] = Some(result);
        self.completed += 1;

        if self.consumed {
            return JoinDecision::Discarded {
                stale: own_series.into_iter().collect(),
            };
        }

        if !succeeded {
            self.consumed = true;
            let stale = self
                .results
                .iter()
                .flatten()
                .filter(|r| r.is_success())
                .filter_map(|r| r.series.clone())
                .collect();
            return JoinDecision::Abandoned { stale };
        }

        if self.is_settled() && !self.dispatched {
            if let [Some(first), Some(second)] = &self.results {
                self.dispatched = true;
                self.consumed = true;
                return JoinDecision::Dispatch(AggregateParams {
                    pair: self.pair.clone(),
                    legs: [first.clone(), second.clone()],
                    strategy: self.strategy.clone(),
                });
            }
        }

        JoinDecision::Waiting
    }
}

/// Pending join records keyed by request
#[derive(Default)]
pub struct JoinTable {
    records: Mutex<HashMap<RequestId, Arc<Mutex<JoinRecord>>>>,
}

impl JoinTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: JoinRecord) {
        self.records
            .lock()
            .insert(record.request_id.clone(), Arc::new(Mutex::new(record)));
    }

    /// Apply one fetch completion under the record's lock. `None` when the
    /// request has no live join or `job_id` is not one of its legs.
    pub fn record(
        &self,
        request_id: &RequestId,
        job_id: &JobId,
        result: FetchResult,
    ) -> Option<JoinDecision> {
        let record = self.records.lock().get(request_id).cloned()?;

        let (decision, settled) = {
            let mut guard = record.lock();
            let slot = guard.slot_of(job_id)?;
            let decision = guard.record(slot, result);
            (decision, guard.is_settled())
        };

        if settled {
            self.records.lock().remove(request_id);
        }
        Some(decision)
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
