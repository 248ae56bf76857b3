//! Prometheus metrics for the HTTP surface and the job pipeline

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,

    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: Gauge,

    /// Labelled by `kind`
    pub jobs_submitted_total: IntCounterVec,
    /// Labelled by `kind` and terminal `state`
    pub jobs_completed_total: IntCounterVec,
    pub job_duration_seconds: HistogramVec,
    pub aggregations_dispatched_total: IntCounter,
    pub joins_abandoned_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::with_opts(Opts::new("http_requests_total", "Total HTTP requests served"))?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;
        let http_requests_in_flight = Gauge::with_opts(Opts::new(
            "http_requests_in_flight",
            "HTTP requests currently being served",
        ))?;

        let jobs_submitted_total = IntCounterVec::new(
            Opts::new("jobs_submitted_total", "Jobs handed to the executor"),
            &["kind"],
        )?;
        let jobs_completed_total = IntCounterVec::new(
            Opts::new("jobs_completed_total", "Jobs that reached a terminal state"),
            &["kind", "state"],
        )?;
        let job_duration_seconds = HistogramVec::new(
            HistogramOpts::new("job_duration_seconds", "Handler run time in seconds").buckets(
                vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
            ),
            &["kind"],
        )?;
        let aggregations_dispatched_total = IntCounter::with_opts(Opts::new(
            "aggregations_dispatched_total",
            "Aggregate jobs dispatched after a completed join",
        ))?;
        let joins_abandoned_total = IntCounter::with_opts(Opts::new(
            "joins_abandoned_total",
            "Pair requests short-circuited by a failed fetch",
        ))?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(jobs_submitted_total.clone()))?;
        registry.register(Box::new(jobs_completed_total.clone()))?;
        registry.register(Box::new(job_duration_seconds.clone()))?;
        registry.register(Box::new(aggregations_dispatched_total.clone()))?;
        registry.register(Box::new(joins_abandoned_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            jobs_submitted_total,
            jobs_completed_total,
            job_duration_seconds,
            aggregations_dispatched_total,
            joins_abandoned_total,
        })
    }

    /// Render every registered family in the Prometheus text format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
