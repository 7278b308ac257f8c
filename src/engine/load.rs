use hdrhistogram::Histogram;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{AbortHandle, JoinHandle};

use crate::domain::{LatencySummary, LoadReport, LoadResult, RequestOutcome, Unexpected, status};
use crate::error::{CadError, Result};
use crate::http::{CadClient, CadQuery};
use crate::observe::Observer;

const MAX_LATENCY_US: u64 = 60_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub workers: usize,
    pub expected_success: u16,
    pub expected_failure: u16,
    /// Wall-clock bound for the whole batch. Workers still running when it
    /// expires are aborted and counted as `others`.
    pub timeout: Option<Duration>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            workers: 20,
            expected_success: status::OK,
            expected_failure: status::SERVICE_UNAVAILABLE,
            timeout: None,
        }
    }
}

impl LoadOptions {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(CadError::Config(
                "Load worker count must be greater than 0".to_string(),
            ));
        }
        if self.expected_success == self.expected_failure {
            return Err(CadError::Config(format!(
                "Expected success and failure codes must differ (both {})",
                self.expected_success
            )));
        }
        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(CadError::Config(
                "Load timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
struct RunningStats {
    count: u64,
    sum_ms: f64,
    min_ms: f64,
    max_ms: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min_ms = value;
            self.max_ms = value;
        } else {
            self.min_ms = self.min_ms.min(value);
            self.max_ms = self.max_ms.max(value);
        }
        self.count += 1;
        self.sum_ms += value;
    }
}

/// Single-writer fold over joined worker outcomes.
struct LoadAggregator {
    result: LoadResult,
    status_counts: BTreeMap<u16, u64>,
    stats: RunningStats,
    histogram: Histogram<u64>,
}

impl LoadAggregator {
    fn new() -> Result<Self> {
        let histogram = Histogram::<u64>::new_with_bounds(1, MAX_LATENCY_US, 3)
            .map_err(|err| CadError::Config(format!("Failed to initialize latency histogram: {err}")))?;
        Ok(Self {
            result: LoadResult::default(),
            status_counts: BTreeMap::new(),
            stats: RunningStats::default(),
            histogram,
        })
    }

    fn record(&mut self, outcome: &RequestOutcome, latency: Option<Duration>) {
        self.result.record(outcome);
        if let Some(status) = outcome.status() {
            *self.status_counts.entry(status).or_insert(0) += 1;
        }
        if let Some(latency) = latency {
            let latency_ms = latency.as_secs_f64() * 1000.0;
            self.stats.add(latency_ms);
            let latency_us = (latency.as_micros() as u64).clamp(1, MAX_LATENCY_US);
            let _ = self.histogram.record(latency_us);
        }
    }

    fn finish(self, workers: usize, elapsed: Duration) -> LoadReport {
        let latency = if self.stats.count == 0 {
            LatencySummary::default()
        } else {
            let quantile = |q: f64| round_to_3(self.histogram.value_at_quantile(q) as f64 / 1000.0);
            LatencySummary {
                samples: self.stats.count,
                min_ms: round_to_3(self.stats.min_ms),
                avg_ms: round_to_3(self.stats.sum_ms / self.stats.count as f64),
                max_ms: round_to_3(self.stats.max_ms),
                p50_ms: quantile(0.50),
                p90_ms: quantile(0.90),
                p95_ms: quantile(0.95),
                p99_ms: quantile(0.99),
            }
        };

        LoadReport {
            workers: workers as u64,
            result: self.result,
            status_counts: self.status_counts,
            latency,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Aborts every worker still running when the load future is dropped.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

fn round_to_3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Fires `options.workers` concurrent calls of `request_fn`, waits for all of
/// them, and classifies each returned status against the expected success and
/// failure codes.
///
/// Worker errors, panics and deadline overruns are counted as `others` and
/// reported to `observer`; they never abort sibling workers. The only error
/// this returns is an invalid `options`, detected before anything is spawned.
pub async fn simulate_load<F, Fut, E>(
    request_fn: F,
    options: &LoadOptions,
    observer: &dyn Observer,
) -> Result<LoadReport>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<u16, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    options.validate()?;
    let mut aggregator = LoadAggregator::new()?;

    let request_fn = Arc::new(request_fn);
    let started = Instant::now();
    let deadline = options
        .timeout
        .map(|timeout| tokio::time::Instant::now() + timeout);

    let mut handles = Vec::with_capacity(options.workers);
    for _ in 0..options.workers {
        let request_fn = request_fn.clone();
        handles.push(tokio::spawn(async move {
            let call_started = Instant::now();
            let result = request_fn().await.map_err(|err| err.to_string());
            (result, call_started.elapsed())
        }));
    }
    let _workers = AbortOnDrop(handles.iter().map(JoinHandle::abort_handle).collect());

    for (worker, mut handle) in handles.into_iter().enumerate() {
        let joined = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(joined) => Some(joined),
                Err(_) => {
                    handle.abort();
                    None
                }
            },
            None => Some(handle.await),
        };

        let (outcome, latency) = match joined {
            Some(Ok((Ok(status), latency))) => (
                RequestOutcome::classify(status, options.expected_success, options.expected_failure),
                Some(latency),
            ),
            Some(Ok((Err(message), latency))) => (
                RequestOutcome::Unexpected(Unexpected::Error(message)),
                Some(latency),
            ),
            Some(Err(join_err)) => (
                RequestOutcome::Unexpected(Unexpected::Panicked(join_err.to_string())),
                None,
            ),
            None => (RequestOutcome::Unexpected(Unexpected::TimedOut), None),
        };

        if let RequestOutcome::Unexpected(reason) = &outcome {
            observer.on_unexpected(worker, reason);
        }
        aggregator.record(&outcome, latency);
    }

    let report = aggregator.finish(options.workers, started.elapsed());
    observer.on_load_complete(&report);
    Ok(report)
}

/// Loads the close-approach endpoint with `options.workers` copies of `query`.
pub async fn simulate_cad_load(
    client: &CadClient,
    query: CadQuery,
    options: &LoadOptions,
    observer: &dyn Observer,
) -> Result<LoadReport> {
    query.validate()?;
    let client = client.clone();
    let query = Arc::new(query);

    simulate_load(
        move || {
            let client = client.clone();
            let query = query.clone();
            async move { client.get_status(&query).await }
        },
        options,
        observer,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{ObservedEvent, RecordingObserver};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn first_fifteen_succeed_remaining_five_are_rate_limited() {
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = counter.clone();

        let report = simulate_load(
            move || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<u16, String>(if call < 15 { 200 } else { 503 }) }
            },
            &LoadOptions::with_workers(20),
            &RecordingObserver::new(),
        )
        .await
        .expect("report");

        assert_eq!(report.result.as_tuple(), (15, 5, 0));
        assert_eq!(counter.load(Ordering::SeqCst), 20);
        assert_eq!(report.status_counts.get(&200), Some(&15));
        assert_eq!(report.status_counts.get(&503), Some(&5));
        assert_eq!(report.latency.samples, 20);
    }

    #[tokio::test]
    async fn errors_and_odd_statuses_land_in_others() {
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = counter.clone();
        let observer = RecordingObserver::new();

        let report = simulate_load(
            move || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    match call % 4 {
                        0 => Ok(200),
                        1 => Ok(503),
                        2 => Ok(500),
                        _ => Err("connection reset".to_string()),
                    }
                }
            },
            &LoadOptions::with_workers(12),
            &observer,
        )
        .await
        .expect("report");

        assert_eq!(report.result.as_tuple(), (3, 3, 6));
        assert_eq!(report.result.total(), 12);

        let unexpected = observer
            .events()
            .into_iter()
            .filter(|event| matches!(event, ObservedEvent::Unexpected { .. }))
            .count();
        assert_eq!(unexpected, 6);
        assert_eq!(
            observer.events().last(),
            Some(&ObservedEvent::LoadComplete { total: 12 })
        );
    }

    #[tokio::test]
    async fn panicking_worker_is_counted_not_propagated() {
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = counter.clone();

        let report = simulate_load(
            move || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        panic!("worker blew up");
                    }
                    Ok::<u16, String>(200)
                }
            },
            &LoadOptions::with_workers(5),
            &RecordingObserver::new(),
        )
        .await
        .expect("report");

        assert_eq!(report.result.as_tuple(), (4, 0, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn workers_past_the_deadline_count_as_others() {
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = counter.clone();
        let options = LoadOptions {
            timeout: Some(Duration::from_secs(1)),
            ..LoadOptions::with_workers(6)
        };
        let observer = RecordingObserver::new();

        let report = simulate_load(
            move || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call % 2 == 1 {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                    Ok::<u16, String>(200)
                }
            },
            &options,
            &observer,
        )
        .await
        .expect("report");

        assert_eq!(report.result.as_tuple(), (3, 0, 3));
        let timed_out = observer
            .events()
            .into_iter()
            .filter(|event| {
                matches!(
                    event,
                    ObservedEvent::Unexpected {
                        outcome: Unexpected::TimedOut,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(timed_out, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_load_future_aborts_running_workers() {
        let finished = Arc::new(AtomicUsize::new(0));
        let done = finished.clone();

        let cancelled = tokio::time::timeout(
            Duration::from_secs(1),
            simulate_load(
                move || {
                    let done = done.clone();
                    async move {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        done.fetch_add(1, Ordering::SeqCst);
                        Ok::<u16, String>(200)
                    }
                },
                &LoadOptions::with_workers(4),
                &RecordingObserver::new(),
            ),
        )
        .await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_options_fail_before_dispatch() {
        let counter = Arc::new(AtomicUsize::new(0));

        for options in [
            LoadOptions::with_workers(0),
            LoadOptions {
                expected_failure: 200,
                ..LoadOptions::default()
            },
        ] {
            let calls = counter.clone();
            let err = simulate_load(
                move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<u16, String>(200) }
                },
                &options,
                &RecordingObserver::new(),
            )
            .await
            .expect_err("invalid options");
            assert!(matches!(err, CadError::Config(_)));
        }

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn aggregator_summarizes_latencies() {
        let mut aggregator = LoadAggregator::new().expect("aggregator");
        for ms in [10, 20, 30, 40] {
            aggregator.record(&RequestOutcome::Success(200), Some(Duration::from_millis(ms)));
        }
        aggregator.record(&RequestOutcome::Unexpected(Unexpected::TimedOut), None);

        let report = aggregator.finish(5, Duration::from_millis(50));
        assert_eq!(report.result.as_tuple(), (4, 0, 1));
        assert_eq!(report.latency.samples, 4);
        assert_eq!(report.latency.min_ms, 10.0);
        assert_eq!(report.latency.max_ms, 40.0);
        assert_eq!(report.latency.avg_ms, 25.0);
        assert!((report.latency.p50_ms - 20.0).abs() < 0.1);
        assert!((report.latency.p99_ms - 40.0).abs() < 0.1);
    }
}
