//! Fixed-interval sampling loop.
//!
//! Each round fetches every catalog address, formats the values against the
//! stored baselines and emits one row. A timer for the polling interval is
//! started together with the round, and the next round begins only when both
//! are done. Short rounds therefore keep a steady cadence, while a round that
//! outlasts the interval (slow agent, retries) delays the next one. Lost time
//! is not caught up, so sustained slow polls drift the schedule.

use std::{sync::Arc, time::Duration};

use chrono::Local;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::{
    catalog::Catalog,
    emitter::{OutputRow, RowSink},
    fetch::{Fetcher, PollFailure, RawSample},
    formatter::{format_value, UNKNOWN_FORMAT_PLACEHOLDER},
    state::CounterStateStore,
};

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// A data row with one column per metric was written.
    Emitted,
    /// The poll failed; a timeout row was written and all baselines reset.
    TimedOut,
}

/// Drives polling rounds for one catalog against one fetcher.
pub struct Scheduler {
    catalog: Arc<Catalog>,
    addresses: Vec<String>,
    fetcher: Arc<dyn Fetcher>,
    sink: Box<dyn RowSink>,
    state: CounterStateStore,
    interval: Duration,
    rounds: u64,
}

impl Scheduler {
    /// Creates a scheduler with empty baselines.
    ///
    /// # Arguments
    /// * `catalog` - Metrics to poll, in column order
    /// * `fetcher` - Transport answering the per-round fetch
    /// * `sink` - Destination of the data and timeout rows
    /// * `interval_secs` - Polling interval; values below 1 are raised to 1
    pub fn new(
        catalog: Arc<Catalog>,
        fetcher: Arc<dyn Fetcher>,
        sink: Box<dyn RowSink>,
        interval_secs: u64,
    ) -> Self {
        Self {
            addresses: catalog.addresses(),
            state: CounterStateStore::new(catalog.len()),
            catalog,
            fetcher,
            sink,
            interval: Duration::from_secs(interval_secs.max(1)),
            rounds: 0,
        }
    }

    pub fn state(&self) -> &CounterStateStore {
        &self.state
    }

    /// Runs rounds until `shutdown` is cancelled.
    ///
    /// Cancellation is observed between await points only, and rows are
    /// written synchronously, so a partially written row is never left behind.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            "Polling {} metric(s) every {}s",
            self.catalog.len(),
            self.interval.as_secs()
        );

        while !shutdown.is_cancelled() {
            let timer = sleep(self.interval);
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = async { tokio::join!(timer, self.run_round()) } => {}
            }
        }

        info!("Polling stopped after {} round(s)", self.rounds);
    }

    /// Performs one fetch, format and emit cycle.
    pub async fn run_round(&mut self) -> RoundOutcome {
        self.rounds += 1;
        let round = self.rounds;
        let started = Instant::now();
        let timestamp = Local::now().naive_local();

        trace!(round, "Fetching {} value(s)", self.addresses.len());
        let fetched = self
            .fetcher
            .fetch(&self.addresses)
            .await
            .and_then(|samples| self.check_complete(samples));

        let (row, outcome) = match fetched {
            Ok(samples) => {
                let columns = self.format_round(&samples);
                (OutputRow::values(timestamp, columns), RoundOutcome::Emitted)
            }
            Err(failure) => {
                warn!(round, "Poll failed: {}; baselines reset", failure);
                self.state.reset_all();
                (OutputRow::timeout(timestamp), RoundOutcome::TimedOut)
            }
        };

        if let Err(e) = self.sink.write_line(&row.to_string()) {
            error!(round, "Failed to write row: {}", e);
        }
        debug!(round, "Round finished in {:?} ({:?})", started.elapsed(), outcome);
        outcome
    }

    /// A response without one sample per metric cannot be aligned to columns.
    fn check_complete(&self, samples: Vec<RawSample>) -> Result<Vec<RawSample>, PollFailure> {
        if samples.len() == self.catalog.len() {
            Ok(samples)
        } else {
            Err(PollFailure::PartialResponse {
                expected: self.catalog.len(),
                got: samples.len(),
            })
        }
    }

    fn format_round(&mut self, samples: &[RawSample]) -> Vec<String> {
        let interval_secs = self.interval.as_secs();
        let mut columns = Vec::with_capacity(samples.len());

        for (index, (metric, sample)) in self.catalog.iter().zip(samples).enumerate() {
            match format_value(&metric.format, sample, self.state.get(index), interval_secs) {
                Ok(formatted) => {
                    self.state.set(index, formatted.state);
                    columns.push(formatted.text);
                }
                Err(e) => {
                    error!(
                        "Metric '{}' ({}): {}, check the catalog",
                        metric.label, metric.address, e
                    );
                    columns.push(UNKNOWN_FORMAT_PLACEHOLDER.to_string());
                }
            }
        }

        columns
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        io,
        sync::{Arc, Mutex},
    };

    use tokio::time::{sleep, Duration, Instant};
    use tracing_test::traced_test;

    use super::*;
    use crate::core::{
        catalog::{DisplayFormat, MetricDescriptor},
        fetch::RawSample,
        formatter::{ABSENT_PLACEHOLDER, NO_BASELINE_PLACEHOLDER},
    };

    type Response = Result<Vec<RawSample>, PollFailure>;

    /// Replays scripted responses, then times out forever.
    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Response>>,
        delay: Duration,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Response>) -> Self {
            Self::with_delay(responses, Duration::ZERO)
        }

        fn with_delay(responses: Vec<Response>, delay: Duration) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                delay,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, addresses: &[String]) -> Result<Vec<RawSample>, PollFailure> {
            self.calls.lock().unwrap().push(Instant::now());
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(vec![RawSample::gauge(1); addresses.len()]))
        }
    }

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<String>>>);

    impl SharedSink {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        /// Columns of each line, timestamp dropped.
        fn columns(&self) -> Vec<Vec<String>> {
            self.lines()
                .iter()
                .map(|line| line.split(',').skip(1).map(str::to_string).collect())
                .collect()
        }
    }

    impl RowSink for SharedSink {
        fn write_line(&mut self, line: &str) -> io::Result<()> {
            self.0.lock().unwrap().push(line.to_string());
            Ok(())
        }
    }

    struct BrokenSink;

    impl RowSink for BrokenSink {
        fn write_line(&mut self, _line: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    fn metric(label: &str, format: DisplayFormat) -> MetricDescriptor {
        MetricDescriptor {
            label: label.into(),
            format,
            address: format!("1.3.6.1.2.1.2.2.1.10.{}", label.len()),
        }
    }

    fn build_scheduler(
        metrics: Vec<MetricDescriptor>,
        fetcher: Arc<ScriptedFetcher>,
        interval_secs: u64,
    ) -> (Scheduler, SharedSink) {
        let sink = SharedSink::default();
        let scheduler = Scheduler::new(
            Arc::new(Catalog::new(metrics)),
            fetcher,
            Box::new(sink.clone()),
            interval_secs,
        );
        (scheduler, sink)
    }

    fn cols(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn gauge_and_bps_scenario_survives_a_timeout() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(vec![RawSample::gauge(50), RawSample::counter32(1000)]),
            Ok(vec![RawSample::gauge(52), RawSample::counter32(2000)]),
            Err(PollFailure::Timeout { attempts: 1 }),
            Ok(vec![RawSample::gauge(10), RawSample::counter32(500)]),
        ]));
        let (mut scheduler, sink) = build_scheduler(
            vec![
                metric("load", DisplayFormat::Gauge),
                metric("in", DisplayFormat::BitRate),
            ],
            fetcher,
            10,
        );

        assert_eq!(scheduler.run_round().await, RoundOutcome::Emitted);
        assert_eq!(scheduler.run_round().await, RoundOutcome::Emitted);
        assert_eq!(scheduler.run_round().await, RoundOutcome::TimedOut);
        assert_eq!(scheduler.run_round().await, RoundOutcome::Emitted);

        let columns = sink.columns();
        assert_eq!(columns[0], cols(&["50", "^"]));
        assert_eq!(columns[1], cols(&["52", "800"]));
        assert_eq!(columns[2], cols(&["timeout"]));
        assert_eq!(columns[3], cols(&["10", "^"]));
    }

    #[tokio::test]
    async fn row_shapes_follow_outcome() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(vec![RawSample::gauge(1), RawSample::gauge(2), RawSample::gauge(3)]),
            Err(PollFailure::Transport("refused".into())),
        ]));
        let (mut scheduler, sink) = build_scheduler(
            vec![
                metric("a", DisplayFormat::Gauge),
                metric("bb", DisplayFormat::Mark),
                metric("ccc", DisplayFormat::Delta),
            ],
            fetcher,
            10,
        );

        scheduler.run_round().await;
        scheduler.run_round().await;

        let lines = sink.lines();
        assert_eq!(lines[0].split(',').count(), 4);
        assert_eq!(lines[1].split(',').count(), 2);
        assert!(lines[1].ends_with(",timeout"));
    }

    #[tokio::test]
    async fn poll_failure_clears_every_baseline() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(vec![RawSample::counter32(10), RawSample::counter64(20)]),
            Ok(vec![RawSample::counter32(15), RawSample::counter64(30)]),
            Err(PollFailure::Timeout { attempts: 2 }),
            Ok(vec![RawSample::counter32(99), RawSample::counter64(99)]),
        ]));
        let (mut scheduler, sink) = build_scheduler(
            vec![
                metric("d", DisplayFormat::Delta),
                metric("pp", DisplayFormat::PacketRate),
            ],
            fetcher,
            10,
        );

        for _ in 0..3 {
            scheduler.run_round().await;
        }
        assert!(scheduler.state().iter().all(|s| !s.has_baseline()));

        scheduler.run_round().await;
        let columns = sink.columns();
        assert_eq!(columns[1], cols(&["5", "1"]));
        assert_eq!(
            columns[3],
            cols(&[NO_BASELINE_PLACEHOLDER, NO_BASELINE_PLACEHOLDER])
        );
    }

    #[tokio::test]
    async fn absent_value_resets_only_its_metric() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(vec![RawSample::counter32(100), RawSample::counter32(100)]),
            Ok(vec![RawSample::Absent, RawSample::counter32(200)]),
            Ok(vec![RawSample::counter32(300), RawSample::counter32(300)]),
        ]));
        let (mut scheduler, sink) = build_scheduler(
            vec![
                metric("x", DisplayFormat::Delta),
                metric("yy", DisplayFormat::Delta),
            ],
            fetcher,
            10,
        );

        for _ in 0..3 {
            scheduler.run_round().await;
        }

        let columns = sink.columns();
        assert_eq!(columns[1], cols(&[ABSENT_PLACEHOLDER, "100"]));
        assert_eq!(columns[2], cols(&[NO_BASELINE_PLACEHOLDER, "100"]));
    }

    #[tokio::test]
    async fn short_response_is_treated_as_poll_failure() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(vec![RawSample::counter32(1), RawSample::counter32(1)]),
            Ok(vec![RawSample::counter32(2)]),
        ]));
        let (mut scheduler, sink) = build_scheduler(
            vec![
                metric("x", DisplayFormat::Delta),
                metric("yy", DisplayFormat::Delta),
            ],
            fetcher,
            10,
        );

        scheduler.run_round().await;
        assert_eq!(scheduler.run_round().await, RoundOutcome::TimedOut);
        assert!(sink.lines()[1].ends_with(",timeout"));
        assert!(scheduler.state().iter().all(|s| !s.has_baseline()));
    }

    #[tokio::test]
    #[traced_test]
    async fn unknown_format_keeps_row_shape_and_logs() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(vec![
            RawSample::gauge(5),
            RawSample::gauge(6),
        ])]));
        let (mut scheduler, sink) = build_scheduler(
            vec![
                metric("odd", DisplayFormat::Unknown("kbps".into())),
                metric("ok", DisplayFormat::Gauge),
            ],
            fetcher,
            10,
        );

        assert_eq!(scheduler.run_round().await, RoundOutcome::Emitted);
        assert_eq!(sink.columns()[0], cols(&["?", "6"]));
        assert!(logs_contain("unknown disp value 'kbps'"));
    }

    #[tokio::test]
    #[traced_test]
    async fn sink_errors_do_not_stop_rounds() {
        let fetcher = Arc::new(ScriptedFetcher::new(Vec::new()));
        let mut scheduler = Scheduler::new(
            Arc::new(Catalog::new(vec![metric("g", DisplayFormat::Gauge)])),
            fetcher,
            Box::new(BrokenSink),
            10,
        );

        assert_eq!(scheduler.run_round().await, RoundOutcome::Emitted);
        assert_eq!(scheduler.run_round().await, RoundOutcome::Emitted);
        assert!(logs_contain("Failed to write row"));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_rounds_keep_fixed_cadence() {
        let fetcher = Arc::new(ScriptedFetcher::new(Vec::new()));
        let (scheduler, sink) =
            build_scheduler(vec![metric("g", DisplayFormat::Gauge)], fetcher.clone(), 10);
        let start = Instant::now();

        let token = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(token.clone()));
        sleep(Duration::from_secs(25)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(sink.lines().len(), 3);
        let offsets: Vec<u64> = fetcher
            .call_times()
            .iter()
            .map(|t| (*t - start).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 10, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_rounds_delay_the_next_tick() {
        let fetcher = Arc::new(ScriptedFetcher::with_delay(
            Vec::new(),
            Duration::from_secs(15),
        ));
        let (scheduler, sink) =
            build_scheduler(vec![metric("g", DisplayFormat::Gauge)], fetcher.clone(), 10);
        let start = Instant::now();

        let token = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(token.clone()));
        sleep(Duration::from_secs(40)).await;
        token.cancel();
        handle.await.unwrap();

        let offsets: Vec<u64> = fetcher
            .call_times()
            .iter()
            .map(|t| (*t - start).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 15, 30]);
        // The third round was still fetching when cancelled: no partial row.
        assert_eq!(sink.lines().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_first_fetch_completes_writes_nothing() {
        let fetcher = Arc::new(ScriptedFetcher::with_delay(
            Vec::new(),
            Duration::from_secs(15),
        ));
        let (scheduler, sink) = build_scheduler(vec![metric("g", DisplayFormat::Gauge)], fetcher, 10);

        let token = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(token.clone()));
        sleep(Duration::from_secs(5)).await;
        token.cancel();
        handle.await.unwrap();

        assert!(sink.lines().is_empty());
    }
}
