//! Shared data models spanning the engine layers.

pub mod candle;
pub mod job;
pub mod pair;

pub use candle::Candle;
pub use job::{
    AggregateParams, DateRange, FetchParams, FetchResult, FetchStatus, Job, JobId, JobKind,
    JobOutput, JobParams, JobState, RequestId, StrategyParams,
};
pub use pair::{LegAllocation, PairKey, PairMetricsDocument, PairSummary, RollingPoint, TradeSignal};
