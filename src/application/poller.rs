// Poller - Fetches the latest sample on a fixed schedule
use crate::application::telemetry_source::TelemetrySource;
use crate::domain::sample::Sample;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

type SampleSink = Box<dyn FnMut(Sample) + Send>;

/// Guards delivery so nothing reaches the sink once `stop` has returned.
struct DeliveryGate {
    open: bool,
    on_sample: SampleSink,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counters shared between the polling task and whoever reports on it
#[derive(Debug, Default)]
pub struct PollStats {
    cycles: AtomicU64,
    deliveries: AtomicU64,
    empty_cycles: AtomicU64,
    failures: AtomicU64,
    last_error: Mutex<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollStatsSnapshot {
    pub cycles: u64,
    pub deliveries: u64,
    pub empty_cycles: u64,
    pub failures: u64,
    pub last_error: Option<String>,
}

impl PollStats {
    pub fn snapshot(&self) -> PollStatsSnapshot {
        PollStatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            empty_cycles: self.empty_cycles.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_error: lock(&self.last_error).clone(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollerError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Clone)]
pub struct Poller {
    source: Arc<dyn TelemetrySource>,
    interval: Duration,
    stats: Arc<PollStats>,
}

impl Poller {
    pub fn new(source: Arc<dyn TelemetrySource>, interval: Duration) -> Result<Self, PollerError> {
        if interval.is_zero() {
            return Err(PollerError::ZeroInterval);
        }

        Ok(Self {
            source,
            interval,
            stats: Arc::new(PollStats::default()),
        })
    }

    pub fn stats(&self) -> Arc<PollStats> {
        self.stats.clone()
    }

    /// Fetch immediately, then once per interval, until the handle is stopped.
    ///
    /// A fetch that outlives the interval delays the next one instead of
    /// queueing more, so at most one request is ever outstanding.
    ///
    /// `on_sample` runs while the delivery gate is locked, so it must not
    /// stop or drop the returned handle itself; that deadlocks. Signal the
    /// owner of the handle instead (for example over a channel).
    pub fn start<F>(&self, on_sample: F) -> PollerHandle
    where
        F: FnMut(Sample) + Send + 'static,
    {
        let gate = Arc::new(Mutex::new(DeliveryGate {
            open: true,
            on_sample: Box::new(on_sample),
        }));

        let source = self.source.clone();
        let stats = self.stats.clone();
        let interval = self.interval;
        let task_gate = gate.clone();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut cycle: u64 = 0;
            loop {
                ticker.tick().await;
                cycle += 1;
                run_cycle(cycle, source.as_ref(), &stats, &task_gate).await;
            }
        });

        tracing::info!(?interval, "Poller started");

        PollerHandle {
            gate,
            task: Some(task),
        }
    }
}

async fn run_cycle(
    cycle: u64,
    source: &dyn TelemetrySource,
    stats: &PollStats,
    gate: &Mutex<DeliveryGate>,
) {
    stats.cycles.fetch_add(1, Ordering::Relaxed);
    let started_at = chrono::Utc::now();

    match source.fetch_latest().await {
        Ok(Some(sample)) => {
            let mut gate = lock(gate);
            if !gate.open {
                tracing::debug!(cycle, "Poller stopped, discarding late sample");
                return;
            }
            (gate.on_sample)(sample);
            stats.deliveries.fetch_add(1, Ordering::Relaxed);
        }
        Ok(None) => {
            stats.empty_cycles.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(cycle, "Telemetry source returned no samples");
        }
        Err(e) => {
            stats.failures.fetch_add(1, Ordering::Relaxed);
            *lock(&stats.last_error) = Some(e.to_string());
            tracing::warn!(
                cycle,
                at = %started_at.to_rfc3339(),
                error = %e,
                "Poll failed"
            );
        }
    }
}

/// Owns a running poller. Dropping it stops polling.
pub struct PollerHandle {
    gate: Arc<Mutex<DeliveryGate>>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Idempotent. Once this returns the sink is never called again, even if
    /// a request issued earlier completes afterwards.
    pub fn stop(&mut self) {
        lock(&self.gate).open = false;

        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("Poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::telemetry_source::PollError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    enum Step {
        Fail,
        Empty,
        Sample(i64),
        Slow(Duration, i64),
    }

    struct ScriptedSource {
        script: Mutex<VecDeque<Step>>,
        fetched_at: Mutex<Vec<Instant>>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(steps.into()),
                fetched_at: Mutex::new(Vec::new()),
            })
        }

        fn offsets_from(&self, start: Instant) -> Vec<Duration> {
            self.fetched_at
                .lock()
                .unwrap()
                .iter()
                .map(|t| *t - start)
                .collect()
        }
    }

    #[async_trait]
    impl TelemetrySource for ScriptedSource {
        async fn fetch_latest(&self) -> Result<Option<Sample>, PollError> {
            self.fetched_at.lock().unwrap().push(Instant::now());
            let step = self.script.lock().unwrap().pop_front();

            match step {
                Some(Step::Fail) => Err(PollError::Transport("connection refused".into())),
                Some(Step::Empty) | None => Ok(None),
                Some(Step::Sample(t)) => Ok(Some(Sample::new(t))),
                Some(Step::Slow(delay, t)) => {
                    time::sleep(delay).await;
                    Ok(Some(Sample::new(t)))
                }
            }
        }
    }

    fn collector() -> (impl FnMut(Sample) + Send + 'static, Arc<Mutex<Vec<Sample>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let received = received.clone();
            move |sample: Sample| received.lock().unwrap().push(sample)
        };
        (sink, received)
    }

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|v| Duration::from_millis(*v)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_disrupt_schedule() {
        let source = ScriptedSource::new(vec![Step::Fail, Step::Fail, Step::Fail, Step::Sample(7)]);
        let poller = Poller::new(source.clone(), Duration::from_millis(2000)).unwrap();
        let (sink, received) = collector();

        let start = Instant::now();
        let mut handle = poller.start(sink);
        time::sleep(Duration::from_millis(6500)).await;
        handle.stop();

        assert_eq!(*received.lock().unwrap(), vec![Sample::new(7)]);
        assert_eq!(source.offsets_from(start), ms(&[0, 2000, 4000, 6000]));

        let stats = poller.stats().snapshot();
        assert_eq!(stats.cycles, 4);
        assert_eq!(stats.failures, 3);
        assert_eq!(stats.deliveries, 1);
        assert_eq!(
            stats.last_error.as_deref(),
            Some("transport error: connection refused")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_result_emits_nothing() {
        let source = ScriptedSource::new(vec![Step::Empty, Step::Empty]);
        let poller = Poller::new(source, Duration::from_millis(2000)).unwrap();
        let (sink, received) = collector();

        let mut handle = poller.start(sink);
        time::sleep(Duration::from_millis(3000)).await;
        handle.stop();

        assert!(received.lock().unwrap().is_empty());
        let stats = poller.stats().snapshot();
        assert_eq!(stats.empty_cycles, 2);
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_after_stop_is_discarded() {
        let source = ScriptedSource::new(vec![Step::Slow(Duration::from_secs(5), 1)]);
        let poller = Poller::new(source.clone(), Duration::from_millis(2000)).unwrap();
        let (sink, received) = collector();

        let mut handle = poller.start(sink);
        time::sleep(Duration::from_secs(1)).await;
        handle.stop();
        time::sleep(Duration::from_secs(10)).await;

        assert!(received.lock().unwrap().is_empty());
        assert_eq!(source.fetched_at.lock().unwrap().len(), 1);
        assert_eq!(poller.stats().snapshot().deliveries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_poll_does_not_queue_requests() {
        let source = ScriptedSource::new(vec![
            Step::Slow(Duration::from_secs(5), 1),
            Step::Sample(2),
        ]);
        let poller = Poller::new(source.clone(), Duration::from_millis(2000)).unwrap();
        let (sink, received) = collector();

        let start = Instant::now();
        let mut handle = poller.start(sink);
        time::sleep(Duration::from_millis(5500)).await;
        handle.stop();

        // The ticks missed at 2s and 4s collapse into a single poll.
        assert_eq!(source.offsets_from(start), ms(&[0, 5000]));
        assert_eq!(*received.lock().unwrap(), vec![Sample::new(1), Sample::new(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let source = ScriptedSource::new(vec![Step::Sample(1), Step::Sample(2)]);
        let poller = Poller::new(source, Duration::from_millis(2000)).unwrap();
        let (sink, received) = collector();

        let mut handle = poller.start(sink);
        time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_running());

        handle.stop();
        handle.stop();
        assert!(!handle.is_running());

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(*received.lock().unwrap(), vec![Sample::new(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let source = ScriptedSource::new(vec![]);
        let poller = Poller::new(source.clone(), Duration::from_millis(2000)).unwrap();
        let (sink, _received) = collector();

        let handle = poller.start(sink);
        time::sleep(Duration::from_millis(100)).await;
        drop(handle);
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(source.fetched_at.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let source = ScriptedSource::new(vec![Step::Sample(1)]);

        assert!(matches!(
            Poller::new(source, Duration::ZERO),
            Err(PollerError::ZeroInterval)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_can_request_stop_through_owner() {
        let source = ScriptedSource::new(vec![Step::Sample(1), Step::Sample(2), Step::Sample(3)]);
        let poller = Poller::new(source.clone(), Duration::from_millis(2000)).unwrap();
        let (stop_tx, mut stop_rx) = tokio::sync::mpsc::unbounded_channel();
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = {
            let received = received.clone();
            move |sample: Sample| {
                received.lock().unwrap().push(sample);
                let _ = stop_tx.send(());
            }
        };

        let mut handle = poller.start(sink);
        stop_rx.recv().await.unwrap();
        handle.stop();
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(*received.lock().unwrap(), vec![Sample::new(1)]);
        assert_eq!(source.fetched_at.lock().unwrap().len(), 1);
    }
}
