//! Client retry controller.
//!
//! Drives repeated gateway calls through the state machine
//! `Idle -> Loading -> {Success, FailedRetrying, FailedTerminal}` and publishes
//! every change as a [`ControllerSnapshot`].
//!
//! A response that carries a [`ClassifiedError`] is a failure even when the
//! gateway attached substitute data: the controller keeps that data visible and
//! flags it through [`ControllerSnapshot::show_degraded_banner`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{BackoffPolicy, ClassifiedError, RetryState};
use crate::gateway::DataGateway;
use crate::models::{FetchRequest, GatewayResponse};

/// Progress indicator refresh interval while a retry is pending.
pub const PROGRESS_TICK: Duration = Duration::from_millis(100);

const TRANSITION_CAPACITY: usize = 64;

/// One load attempt. `attempt` is zero-based and resets on manual retry.
#[async_trait]
pub trait Loader: Send + Sync + 'static {
    async fn load(&self, attempt: u32) -> Result<GatewayResponse, ClassifiedError>;
}

/// Loads a fixed request through a [`DataGateway`].
pub struct GatewayLoader {
    gateway: Arc<DataGateway>,
    request: FetchRequest,
}

impl GatewayLoader {
    pub fn new(gateway: Arc<DataGateway>, request: impl Into<FetchRequest>) -> Self {
        Self {
            gateway,
            request: request.into(),
        }
    }
}

#[async_trait]
impl Loader for GatewayLoader {
    async fn load(&self, attempt: u32) -> Result<GatewayResponse, ClassifiedError> {
        let request = self.request.clone().with_attempt(attempt);
        self.gateway.fetch(&request).await
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerState {
    Idle,
    Loading,
    Success,
    FailedRetrying,
    FailedTerminal,
}

/// A state change, published on [`RetryController::subscribe_transitions`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Transition {
    pub from: ControllerState,
    pub to: ControllerState,
    pub attempt: u32,
}

/// What the presentation layer renders.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSnapshot {
    pub state: ControllerState,
    /// Latest response, kept across failures that produced no data.
    pub data: Option<GatewayResponse>,
    pub error: Option<ClassifiedError>,
    pub retry_state: Option<RetryState>,
    /// Elapsed share of the pending retry delay, in `[0, 1]`.
    pub progress_ratio: f64,
    /// Automatic retries scheduled since the last manual start.
    pub scheduled_retries: u32,
    pub attempt: u32,
}

impl ControllerSnapshot {
    fn idle() -> Self {
        Self {
            state: ControllerState::Idle,
            data: None,
            error: None,
            retry_state: None,
            progress_ratio: 0.0,
            scheduled_retries: 0,
            attempt: 0,
        }
    }

    /// Whether the exposed data is a stale or synthetic substitute.
    pub fn show_degraded_banner(&self) -> bool {
        self.data.as_ref().is_some_and(|data| data.degraded)
    }
}

struct Shared {
    snapshot: watch::Sender<ControllerSnapshot>,
    transitions: broadcast::Sender<Transition>,
}

impl Shared {
    fn update(&self, f: impl FnOnce(&mut ControllerSnapshot)) {
        self.snapshot.send_modify(f);
    }

    fn enter(&self, to: ControllerState, attempt: u32) {
        let mut from = to;
        self.snapshot.send_modify(|snapshot| {
            from = snapshot.state;
            snapshot.state = to;
            snapshot.attempt = attempt;
        });
        debug!("Controller {:?} -> {:?} (attempt {})", from, to, attempt);
        // No subscribers is fine
        let _ = self.transitions.send(Transition { from, to, attempt });
    }
}

/// Owns the retry loop for one resource.
///
/// The loop runs on a tokio task started by [`start`](Self::start). Dropping the
/// controller or calling [`shutdown`](Self::shutdown) cancels any pending retry.
pub struct RetryController {
    loader: Arc<dyn Loader>,
    policy: BackoffPolicy,
    shared: Arc<Shared>,
    manual: Arc<Notify>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RetryController {
    pub fn new(loader: Arc<dyn Loader>) -> Self {
        Self::with_policy(loader, BackoffPolicy::default())
    }

    pub fn with_policy(loader: Arc<dyn Loader>, policy: BackoffPolicy) -> Self {
        let (snapshot, _) = watch::channel(ControllerSnapshot::idle());
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
        Self {
            loader,
            policy,
            shared: Arc::new(Shared {
                snapshot,
                transitions,
            }),
            manual: Arc::new(Notify::new()),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn subscribe_transitions(&self) -> broadcast::Receiver<Transition> {
        self.shared.transitions.subscribe()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Begin loading. Has no effect if already started or shut down.
    pub fn start(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let mut task = self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if task.is_some() {
            return;
        }

        let driver = Driver {
            loader: Arc::clone(&self.loader),
            policy: self.policy.clone(),
            shared: Arc::clone(&self.shared),
            manual: Arc::clone(&self.manual),
            cancel: self.cancel.clone(),
        };
        *task = Some(tokio::spawn(driver.run()));
    }

    /// Manual retry: supersedes any pending automatic retry and restarts at attempt 0.
    ///
    /// Ignored while a load is already running.
    pub fn retry_now(&self) {
        if self.shared.snapshot.borrow().state == ControllerState::Loading {
            debug!("Manual retry ignored, load in progress");
            return;
        }
        let started = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some();
        if started {
            self.manual.notify_one();
        } else {
            self.start();
        }
    }

    /// Stop the loop. Pending retries never fire after this returns.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            task.abort();
        }
    }
}

impl Drop for RetryController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Driver {
    loader: Arc<dyn Loader>,
    policy: BackoffPolicy,
    shared: Arc<Shared>,
    manual: Arc<Notify>,
    cancel: CancellationToken,
}

enum Wake {
    Manual,
    Scheduled,
    Cancelled,
}

impl Driver {
    async fn run(self) {
        let mut attempt = 0;

        loop {
            self.shared.enter(ControllerState::Loading, attempt);

            let result = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = self.loader.load(attempt) => result,
            };
            self.discard_stale_retry();

            let error = match result {
                Ok(response) => {
                    let error = response.error.clone();
                    self.shared.update(|snapshot| snapshot.data = Some(response));
                    error
                }
                Err(error) => Some(error),
            };

            let wake = match error {
                None => {
                    self.shared.update(|snapshot| {
                        snapshot.error = None;
                        snapshot.retry_state = None;
                        snapshot.progress_ratio = 0.0;
                    });
                    self.shared.enter(ControllerState::Success, attempt);
                    info!("Load succeeded after {} attempt(s)", attempt + 1);
                    self.wait_for_manual().await
                }
                Some(error) => {
                    let retry_state = error.retry_state(&self.policy);
                    warn!(
                        "Load failed: kind={} attempt={} can_retry={}",
                        error.kind(),
                        attempt,
                        retry_state.can_retry
                    );
                    if retry_state.can_retry {
                        self.schedule_retry(error, retry_state, attempt).await
                    } else {
                        self.shared.update(|snapshot| {
                            snapshot.error = Some(error);
                            snapshot.retry_state = Some(retry_state);
                            snapshot.progress_ratio = 0.0;
                        });
                        self.shared.enter(ControllerState::FailedTerminal, attempt);
                        self.wait_for_manual().await
                    }
                }
            };

            match wake {
                Wake::Cancelled => return,
                Wake::Scheduled => attempt += 1,
                Wake::Manual => {
                    attempt = 0;
                    self.shared.update(|snapshot| snapshot.scheduled_retries = 0);
                }
            }
        }
    }

    /// A manual retry that raced with the load just finished is already satisfied.
    fn discard_stale_retry(&self) {
        if self.manual.notified().now_or_never().is_some() {
            debug!("Discarding manual retry requested during load");
        }
    }

    async fn wait_for_manual(&self) -> Wake {
        tokio::select! {
            _ = self.cancel.cancelled() => Wake::Cancelled,
            _ = self.manual.notified() => Wake::Manual,
        }
    }

    async fn schedule_retry(
        &self,
        error: ClassifiedError,
        retry_state: RetryState,
        attempt: u32,
    ) -> Wake {
        let delay = retry_state.next_retry_in;
        let scheduled_at = Instant::now();
        let deadline = scheduled_at + delay;

        self.shared.update(|snapshot| {
            snapshot.error = Some(error);
            snapshot.retry_state = Some(retry_state);
            snapshot.progress_ratio = 0.0;
            snapshot.scheduled_retries += 1;
        });
        self.shared.enter(ControllerState::FailedRetrying, attempt);
        debug!("Retry scheduled in {:?}", delay);

        let mut ticker = interval(PROGRESS_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Wake::Cancelled,
                _ = self.manual.notified() => return Wake::Manual,
                _ = sleep_until(deadline) => return Wake::Scheduled,
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let remaining = deadline.saturating_duration_since(now);
                    let ratio = if delay.is_zero() {
                        1.0
                    } else {
                        let elapsed = now.duration_since(scheduled_at).as_secs_f64();
                        (elapsed / delay.as_secs_f64()).min(1.0)
                    };
                    self.shared.update(|snapshot| {
                        snapshot.progress_ratio = ratio;
                        if let Some(state) = snapshot.retry_state.as_mut() {
                            state.next_retry_in = remaining;
                        }
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::cache::EphemeralCache;
    use crate::errors::ErrorKind;
    use crate::models::{Provenance, Resource};
    use crate::synth::RandomSynthesizer;
    use crate::testing::{series, Reply, StubSource};

    fn controller(source: StubSource) -> RetryController {
        let gateway = Arc::new(DataGateway::new(
            vec![Arc::new(source)],
            Arc::new(EphemeralCache::new()),
            Arc::new(RandomSynthesizer::seeded(11)),
        ));
        let loader = GatewayLoader::new(gateway, Resource::historical("bitcoin", 60));
        RetryController::new(Arc::new(loader))
    }

    fn drain(rx: &mut broadcast::Receiver<Transition>) -> Vec<Transition> {
        let mut out = Vec::new();
        while let Ok(transition) = rx.try_recv() {
            out.push(transition);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_three_times_then_live() {
        let source = StubSource::new(vec![
            Reply::Status(429),
            Reply::Status(429),
            Reply::Status(429),
            Reply::Data(series(61, 100.0)),
        ]);
        let calls = source.calls();
        let controller = controller(source);
        let mut transitions = controller.subscribe_transitions();
        let mut snapshots = controller.subscribe();

        controller.start();
        let done = snapshots
            .wait_for(|s| s.state == ControllerState::Success)
            .await
            .unwrap()
            .clone();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(done.scheduled_retries, 3);
        assert_eq!(done.attempt, 3);
        let data = done.data.as_ref().unwrap();
        assert_eq!(data.provenance, Provenance::Live);
        assert!(!done.show_degraded_banner());
        assert!(done.error.is_none());

        let states: Vec<(ControllerState, u32)> =
            drain(&mut transitions).iter().map(|t| (t.to, t.attempt)).collect();
        assert_eq!(
            states,
            vec![
                (ControllerState::Loading, 0),
                (ControllerState::FailedRetrying, 0),
                (ControllerState::Loading, 1),
                (ControllerState::FailedRetrying, 1),
                (ControllerState::Loading, 2),
                (ControllerState::FailedRetrying, 2),
                (ControllerState::Loading, 3),
                (ControllerState::Success, 3),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_terminal_after_one_call() {
        let source = StubSource::always(Reply::Status(404));
        let calls = source.calls();
        let controller = controller(source);
        let mut snapshots = controller.subscribe();

        controller.start();
        let failed = snapshots
            .wait_for(|s| s.state == ControllerState::FailedTerminal)
            .await
            .unwrap()
            .clone();

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(failed.scheduled_retries, 0);
        assert_eq!(failed.error.as_ref().unwrap().kind(), ErrorKind::NotFound);
        assert!(!failed.retry_state.as_ref().unwrap().can_retry);

        // Substitute data stays visible behind the banner
        let data = failed.data.as_ref().unwrap();
        assert_eq!(data.provenance, Provenance::Synthetic);
        assert!(!data.data.as_historical().unwrap().is_empty());
        assert!(failed.show_degraded_banner());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_become_terminal() {
        let source = StubSource::always(Reply::Status(503));
        let calls = source.calls();
        let controller = controller(source);
        let mut snapshots = controller.subscribe();

        controller.start();
        let failed = snapshots
            .wait_for(|s| s.state == ControllerState::FailedTerminal)
            .await
            .unwrap()
            .clone();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(failed.scheduled_retries, 3);
        let retry_state = failed.retry_state.unwrap();
        assert!(!retry_state.can_retry);
        assert_eq!(retry_state.retry_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_retry() {
        let source = StubSource::always(Reply::Status(500));
        let calls = source.calls();
        let controller = controller(source);
        let mut snapshots = controller.subscribe();

        controller.start();
        snapshots
            .wait_for(|s| s.state == ControllerState::FailedRetrying)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        controller.shutdown();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_retry() {
        let source = StubSource::always(Reply::Transport);
        let calls = source.calls();
        let controller = controller(source);
        let mut snapshots = controller.subscribe();

        controller.start();
        snapshots
            .wait_for(|s| s.state == ControllerState::FailedRetrying)
            .await
            .unwrap();

        drop(controller);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_advances_while_waiting() {
        let controller = controller(StubSource::always(Reply::Status(500)));
        let mut snapshots = controller.subscribe();

        controller.start();
        snapshots
            .wait_for(|s| s.state == ControllerState::FailedRetrying)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(2_550)).await;
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, ControllerState::FailedRetrying);
        // Server errors wait 5-6s on the first attempt
        assert!(snapshot.progress_ratio > 0.3 && snapshot.progress_ratio < 0.6);
        let remaining = snapshot.retry_state.unwrap().next_retry_in;
        assert!(remaining < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_retry_supersedes_schedule_and_resets_attempt() {
        let source = StubSource::new(vec![Reply::Status(429), Reply::Data(series(10, 1.0))]);
        let calls = source.calls();
        let controller = controller(source);
        let mut snapshots = controller.subscribe();
        let started = tokio::time::Instant::now();

        controller.start();
        snapshots
            .wait_for(|s| s.state == ControllerState::FailedRetrying)
            .await
            .unwrap();

        controller.retry_now();
        let done = snapshots
            .wait_for(|s| s.state == ControllerState::Success)
            .await
            .unwrap()
            .clone();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(done.attempt, 0);
        assert_eq!(done.scheduled_retries, 0);
        // Well before the 60s rate-limit backoff would have fired
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_retry_during_load_does_not_reload() {
        let source =
            StubSource::always(Reply::Data(series(10, 1.0))).with_delay(Duration::from_secs(1));
        let calls = source.calls();
        let controller = controller(source);
        let mut snapshots = controller.subscribe();

        controller.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(controller.snapshot().state, ControllerState::Loading);

        controller.retry_now();
        snapshots
            .wait_for(|s| s.state == ControllerState::Success)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.snapshot().state, ControllerState::Success);
    }
}
