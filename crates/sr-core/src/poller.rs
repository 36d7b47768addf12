//! Background change poller.
//!
//! Each cycle reads the sheet, compares the data-row count with the last known
//! count and fans out the newly appended rows to the current subscribers. The
//! sheet is re-read in full every cycle, so a cycle costs O(total rows).

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    clock::Clock,
    config::{Config, RefreshPolicy},
    notify::{FanOutReport, Notifier},
    registry::SubscriberRegistry,
    store::StoreHandle,
    Error, Result,
};

#[derive(Clone, Copy, Debug)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub refresh: RefreshPolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            error_backoff: Duration::from_secs(60),
            refresh: RefreshPolicy::EveryCycle,
        }
    }
}

impl PollSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            poll_interval: cfg.poll_interval,
            error_backoff: cfg.error_backoff,
            refresh: cfg.refresh_policy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PollPhase {
    #[default]
    Idle,
    Polling,
    NoChange,
    Notifying,
    ErrorBackoff,
    Stopped,
}

impl PollPhase {
    pub fn label(self) -> &'static str {
        match self {
            PollPhase::Idle => "idle",
            PollPhase::Polling => "polling",
            PollPhase::NoChange => "no change",
            PollPhase::Notifying => "notifying",
            PollPhase::ErrorBackoff => "error backoff",
            PollPhase::Stopped => "stopped",
        }
    }
}

/// Result of one successful read-compare-notify cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    NoChange { rows: usize },
    Notified {
        from: usize,
        to: usize,
        report: FanOutReport,
    },
    /// The sheet lost rows; the count was resynchronized without notifying.
    Shrank { from: usize, to: usize },
}

#[derive(Clone, Debug, Default)]
pub struct PollerStatus {
    pub phase: PollPhase,
    pub last_known_rows: Option<usize>,
    pub cycles: u64,
    pub batches_sent: u64,
    pub read_failures: u64,
    pub refresh_failures: u64,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct PollerState {
    status: PollerStatus,
    last_refresh: Option<Instant>,
    refresh_forced: bool,
}

#[derive(Clone)]
pub struct ChangePoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    store: Arc<StoreHandle>,
    registry: Arc<SubscriberRegistry>,
    notifier: Notifier,
    settings: PollSettings,
    clock: Arc<dyn Clock>,
    state: Mutex<PollerState>,
}

/// Running poller task.
pub struct PollerHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal the poller to stop and wait for the current cycle to finish.
    ///
    /// Returns `false` if the task did not finish within `timeout` and was aborted.
    pub async fn shutdown(mut self, timeout: Duration) -> bool {
        self.cancel.cancel();
        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(_) => true,
            Err(_) => {
                warn!(?timeout, "change poller did not stop in time, aborting");
                self.handle.abort();
                false
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl ChangePoller {
    pub fn new(
        store: Arc<StoreHandle>,
        registry: Arc<SubscriberRegistry>,
        notifier: Notifier,
        settings: PollSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // The store client connects when it is built; count that as a refresh.
        let state = PollerState {
            last_refresh: Some(clock.now()),
            ..PollerState::default()
        };
        Self {
            inner: Arc::new(PollerInner {
                store,
                registry,
                notifier,
                settings,
                clock,
                state: Mutex::new(state),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PollerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: PollPhase) {
        self.state().status.phase = phase;
    }

    pub fn status(&self) -> PollerStatus {
        self.state().status.clone()
    }

    pub fn last_known_rows(&self) -> Option<usize> {
        self.state().status.last_known_rows
    }

    /// Seed the last known row count from a full read.
    pub async fn initialize(&self) -> Result<usize> {
        let rows = self.inner.store.read_all().await?.len();
        self.state().status.last_known_rows = Some(rows);
        info!(rows, "change poller initialized");
        Ok(rows)
    }

    /// Retry `initialize` with the error backoff until it succeeds.
    ///
    /// Returns `None` if `cancel` fires first.
    pub async fn initialize_until_ready(&self, cancel: &CancellationToken) -> Option<usize> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            self.set_phase(PollPhase::Polling);
            match self.initialize().await {
                Ok(rows) => {
                    self.set_phase(PollPhase::Idle);
                    return Some(rows);
                }
                Err(e) => {
                    let backoff = self.inner.settings.error_backoff;
                    warn!(error = %e, ?backoff, "initial sheet read failed, retrying");
                    self.record_read_failure(&e);
                    tokio::select! {
                        _ = cancel.cancelled() => return None,
                        _ = self.inner.clock.sleep(backoff) => {}
                    }
                }
            }
        }
    }

    fn record_read_failure(&self, e: &Error) {
        let mut st = self.state();
        st.status.phase = PollPhase::ErrorBackoff;
        st.status.read_failures += 1;
        st.status.last_error = Some(e.to_string());
        st.refresh_forced = true;
    }

    /// Run a single cycle: optional refresh, read, compare, fan-out.
    ///
    /// Fails with `Error::NotInitialized` until `initialize` has succeeded; a
    /// later read never becomes the baseline.
    pub async fn poll_once(&self) -> Result<CycleOutcome> {
        let Some(known) = self.last_known_rows() else {
            return Err(Error::NotInitialized);
        };
        self.set_phase(PollPhase::Polling);
        self.refresh_if_due().await;

        let rows = match self.inner.store.read_all().await {
            Ok(rows) => rows,
            Err(e) => {
                self.record_read_failure(&e);
                return Err(e);
            }
        };

        let observed = rows.len();
        let outcome = match known {
            known if observed > known => {
                self.set_phase(PollPhase::Notifying);
                let subscribers = self.inner.registry.snapshot();
                let report = self
                    .inner
                    .notifier
                    .fan_out(&subscribers, &rows[known..observed])
                    .await;
                CycleOutcome::Notified {
                    from: known,
                    to: observed,
                    report,
                }
            }
            known if observed < known => CycleOutcome::Shrank {
                from: known,
                to: observed,
            },
            _ => CycleOutcome::NoChange { rows: observed },
        };

        let mut st = self.state();
        st.status.last_known_rows = Some(observed);
        st.status.cycles += 1;
        st.status.phase = match &outcome {
            CycleOutcome::Notified { .. } => {
                st.status.batches_sent += 1;
                PollPhase::Idle
            }
            CycleOutcome::NoChange { .. } => PollPhase::NoChange,
            CycleOutcome::Shrank { .. } => PollPhase::Idle,
        };
        Ok(outcome)
    }

    async fn refresh_if_due(&self) {
        let now = self.inner.clock.now();
        let due = {
            let st = self.state();
            st.refresh_forced
                || match self.inner.settings.refresh {
                    RefreshPolicy::EveryCycle => true,
                    RefreshPolicy::Disabled => false,
                    RefreshPolicy::Interval(every) => st
                        .last_refresh
                        .map(|at| now.saturating_duration_since(at) >= every)
                        .unwrap_or(true),
                }
        };
        if !due {
            return;
        }

        match self.inner.store.reconnect().await {
            Ok(()) => {
                let mut st = self.state();
                st.last_refresh = Some(now);
                st.refresh_forced = false;
                debug!("store connection refreshed");
            }
            Err(e) => {
                // Keep the current connection; retry on the next cycle.
                warn!(error = %e, "store connection refresh failed");
                let mut st = self.state();
                st.status.refresh_failures += 1;
                st.status.last_error = Some(e.to_string());
                st.refresh_forced = true;
            }
        }
    }

    /// Poll until `cancel` fires. Errors never end the loop.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            interval = ?self.inner.settings.poll_interval,
            backoff = ?self.inner.settings.error_backoff,
            "change poller started"
        );

        if self.last_known_rows().is_none()
            && self.initialize_until_ready(&cancel).await.is_none()
        {
            self.set_phase(PollPhase::Stopped);
            info!("change poller stopped before initialization");
            return;
        }

        while !cancel.is_cancelled() {
            let delay = match self.poll_once().await {
                Ok(outcome) => {
                    log_outcome(&outcome);
                    self.set_phase(PollPhase::Idle);
                    self.inner.settings.poll_interval
                }
                Err(e) => {
                    error!(error = %e, backoff = ?self.inner.settings.error_backoff, "poll cycle failed");
                    self.inner.settings.error_backoff
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.inner.clock.sleep(delay) => {}
            }
            self.set_phase(PollPhase::Idle);
        }

        self.set_phase(PollPhase::Stopped);
        info!("change poller stopped");
    }

    pub fn spawn(&self, cancel: CancellationToken) -> PollerHandle {
        let poller = self.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { poller.run(token).await });
        PollerHandle { cancel, handle }
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::NoChange { rows } => debug!(rows, "no new rows"),
        CycleOutcome::Notified { from, to, report } => info!(
            new_rows = to - from,
            rows = to,
            delivered = report.delivered,
            failed = report.failed,
            "new rows fanned out"
        ),
        CycleOutcome::Shrank { from, to } => warn!(
            from,
            to,
            "sheet row count decreased, resynchronizing without notifications"
        ),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        clock::{testing::ManualClock, TokioClock},
        domain::{ChatId, MessageRef},
        messaging::{
            port::MessagingPort,
            types::{Menu, MessagingCapabilities},
        },
        notify::testing::RecordingMessenger,
        store::testing::{row, MemoryStore},
    };

    struct Harness {
        store: MemoryStore,
        registry: Arc<SubscriberRegistry>,
        messenger: Arc<RecordingMessenger>,
        poller: ChangePoller,
    }

    fn settings() -> PollSettings {
        PollSettings {
            poll_interval: Duration::from_secs(30),
            error_backoff: Duration::from_secs(60),
            refresh: RefreshPolicy::EveryCycle,
        }
    }

    fn harness(rows: usize, settings: PollSettings, clock: Arc<dyn Clock>) -> Harness {
        let store = MemoryStore::with_rows(rows);
        let registry = Arc::new(SubscriberRegistry::new());
        let messenger = Arc::new(RecordingMessenger::default());
        let poller = ChangePoller::new(
            Arc::new(StoreHandle::new(store.clone())),
            registry.clone(),
            Notifier::new(messenger.clone(), 4000),
            settings,
            clock,
        );
        Harness {
            store,
            registry,
            messenger,
            poller,
        }
    }

    #[tokio::test]
    async fn new_rows_are_sliced_from_last_known_count() {
        let h = harness(3, settings(), Arc::new(ManualClock::new()));
        h.registry.add(ChatId(1));
        assert_eq!(h.poller.initialize().await.unwrap(), 3);

        h.store.push(row(3));
        h.store.push(row(4));
        let outcome = h.poller.poll_once().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Notified {
                from: 3,
                to: 5,
                report: FanOutReport {
                    delivered: 1,
                    failed: 0
                }
            }
        );
        assert_eq!(h.poller.last_known_rows(), Some(5));

        let msgs = h.messenger.sent_to(ChatId(1));
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("user3@example.com"));
        assert!(msgs[0].contains("user4@example.com"));
        assert!(!msgs[0].contains("user2@example.com"));
    }

    #[tokio::test]
    async fn unchanged_count_sends_nothing() {
        let h = harness(3, settings(), Arc::new(ManualClock::new()));
        h.registry.add(ChatId(1));
        h.poller.initialize().await.unwrap();

        let outcome = h.poller.poll_once().await.unwrap();
        assert_eq!(outcome, CycleOutcome::NoChange { rows: 3 });
        assert_eq!(h.poller.last_known_rows(), Some(3));
        assert!(h.messenger.sent().is_empty());
        assert_eq!(h.poller.status().phase, PollPhase::NoChange);
    }

    #[tokio::test]
    async fn shrinking_sheet_resyncs_without_notifying() {
        let h = harness(5, settings(), Arc::new(ManualClock::new()));
        h.registry.add(ChatId(1));
        h.poller.initialize().await.unwrap();

        h.store.truncate(2);
        let outcome = h.poller.poll_once().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Shrank { from: 5, to: 2 });
        assert_eq!(h.poller.last_known_rows(), Some(2));
        assert!(h.messenger.sent().is_empty());

        // Only rows appended after the resync are announced.
        h.store.push(row(42));
        h.poller.poll_once().await.unwrap();
        let msgs = h.messenger.sent_to(ChatId(1));
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("user42@example.com"));
        assert!(!msgs[0].contains("user1@example.com"));
    }

    #[tokio::test]
    async fn cycle_before_initialize_is_rejected() {
        let h = harness(4, settings(), Arc::new(ManualClock::new()));
        h.registry.add(ChatId(1));
        let err = h.poller.poll_once().await.unwrap_err();
        assert!(matches!(err, crate::Error::NotInitialized));
        assert_eq!(h.poller.last_known_rows(), None);
        assert_eq!(h.store.read_calls(), 0);
    }

    #[tokio::test]
    async fn failed_startup_read_retries_then_announces_later_rows() {
        let clock = Arc::new(ManualClock::new());
        let h = harness(3, settings(), clock.clone());
        h.registry.add(ChatId(1));
        h.store.fail_next_reads(1);

        let cancel = CancellationToken::new();
        assert_eq!(h.poller.initialize_until_ready(&cancel).await, Some(3));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(60)]);
        assert_eq!(h.poller.status().read_failures, 1);

        h.store.push(row(3));
        let outcome = h.poller.poll_once().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Notified { from: 3, to: 4, .. }));
        let msgs = h.messenger.sent_to(ChatId(1));
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("user3@example.com"));
    }

    #[tokio::test]
    async fn run_retries_startup_read_with_backoff() {
        let cancel = CancellationToken::new();
        let clock = Arc::new(ManualClock::new().stop_after(2, cancel.clone()));
        let h = harness(2, settings(), clock.clone());
        h.store.fail_next_reads(2);

        h.poller.clone().run(cancel).await;

        // two failed startup reads, then cancelled before a third attempt
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(60), Duration::from_secs(60)]
        );
        let status = h.poller.status();
        assert_eq!(status.read_failures, 2);
        assert_eq!(status.last_known_rows, None);
        assert_eq!(status.phase, PollPhase::Stopped);
    }

    #[tokio::test]
    async fn initialize_until_ready_stops_on_cancel() {
        let h = harness(1, settings(), Arc::new(ManualClock::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(h.poller.initialize_until_ready(&cancel).await, None);
        assert_eq!(h.store.read_calls(), 0);
    }

    #[tokio::test]
    async fn finished_cycles_do_not_report_polling() {
        let h = harness(3, settings(), Arc::new(ManualClock::new()));
        h.poller.initialize().await.unwrap();

        h.store.push(row(3));
        h.poller.poll_once().await.unwrap();
        assert_eq!(h.poller.status().phase, PollPhase::Idle);

        h.store.truncate(1);
        h.poller.poll_once().await.unwrap();
        assert_eq!(h.poller.status().phase, PollPhase::Idle);

        h.poller.poll_once().await.unwrap();
        assert_eq!(h.poller.status().phase, PollPhase::NoChange);
    }

    #[tokio::test]
    async fn batch_goes_to_empty_registry_and_still_advances() {
        let h = harness(1, settings(), Arc::new(ManualClock::new()));
        h.poller.initialize().await.unwrap();
        h.store.push(row(1));
        h.poller.poll_once().await.unwrap();
        assert_eq!(h.poller.last_known_rows(), Some(2));
        assert!(h.messenger.sent().is_empty());
    }

    /// Messenger that subscribes a latecomer while the batch is being delivered.
    struct SubscribingMessenger {
        inner: RecordingMessenger,
        registry: Arc<SubscriberRegistry>,
        latecomer: ChatId,
    }

    #[async_trait]
    impl MessagingPort for SubscribingMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            self.inner.capabilities()
        }

        async fn send_html(&self, chat_id: ChatId, html: &str) -> crate::Result<MessageRef> {
            self.registry.add(self.latecomer);
            self.inner.send_html(chat_id, html).await
        }

        async fn send_menu(
            &self,
            chat_id: ChatId,
            html: &str,
            menu: &Menu,
        ) -> crate::Result<MessageRef> {
            self.inner.send_menu(chat_id, html, menu).await
        }
    }

    #[tokio::test]
    async fn subscriber_added_after_snapshot_misses_the_batch() {
        let store = MemoryStore::with_rows(1);
        let registry = Arc::new(SubscriberRegistry::new());
        registry.add(ChatId(1));
        let messenger = Arc::new(SubscribingMessenger {
            inner: RecordingMessenger::default(),
            registry: registry.clone(),
            latecomer: ChatId(99),
        });
        let poller = ChangePoller::new(
            Arc::new(StoreHandle::new(store.clone())),
            registry.clone(),
            Notifier::new(messenger.clone(), 4000),
            settings(),
            Arc::new(ManualClock::new()),
        );
        poller.initialize().await.unwrap();

        store.push(row(1));
        poller.poll_once().await.unwrap();
        assert!(registry.contains(ChatId(99)));
        assert_eq!(messenger.inner.sent_to(ChatId(1)).len(), 1);
        assert!(messenger.inner.sent_to(ChatId(99)).is_empty());

        store.push(row(2));
        poller.poll_once().await.unwrap();
        assert_eq!(messenger.inner.sent_to(ChatId(99)).len(), 1);
    }

    #[tokio::test]
    async fn read_failure_backs_off_and_keeps_polling() {
        let cancel = CancellationToken::new();
        let clock = Arc::new(ManualClock::new().stop_after(3, cancel.clone()));
        let h = harness(2, settings(), clock.clone());
        h.registry.add(ChatId(7));
        h.poller.initialize().await.unwrap();

        h.store.fail_next_reads(1);
        h.store.push(row(2));
        h.poller.clone().run(cancel).await;

        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_secs(60),
                Duration::from_secs(30),
                Duration::from_secs(30)
            ]
        );
        let status = h.poller.status();
        assert_eq!(status.read_failures, 1);
        assert_eq!(status.phase, PollPhase::Stopped);
        assert_eq!(status.last_known_rows, Some(3));
        assert!(status.last_error.unwrap().contains("simulated read failure"));
        assert_eq!(h.messenger.sent_to(ChatId(7)).len(), 1);
        // initialize + failed read + two successful cycles
        assert_eq!(h.store.read_calls(), 4);
    }

    #[tokio::test]
    async fn refresh_every_cycle_reconnects_each_time() {
        let h = harness(0, settings(), Arc::new(ManualClock::new()));
        h.poller.initialize().await.unwrap();
        h.poller.poll_once().await.unwrap();
        h.poller.poll_once().await.unwrap();
        assert_eq!(h.store.reconnect_calls(), 2);
    }

    #[tokio::test]
    async fn refresh_interval_waits_for_the_cadence() {
        let clock = Arc::new(ManualClock::new());
        let s = PollSettings {
            refresh: RefreshPolicy::Interval(Duration::from_secs(1800)),
            ..settings()
        };
        let h = harness(0, s, clock.clone());
        h.poller.initialize().await.unwrap();

        h.poller.poll_once().await.unwrap();
        assert_eq!(h.store.reconnect_calls(), 0);

        clock.advance(Duration::from_secs(1800));
        h.poller.poll_once().await.unwrap();
        assert_eq!(h.store.reconnect_calls(), 1);

        clock.advance(Duration::from_secs(30));
        h.poller.poll_once().await.unwrap();
        assert_eq!(h.store.reconnect_calls(), 1);
    }

    #[tokio::test]
    async fn refresh_failure_does_not_abort_the_cycle() {
        let h = harness(1, settings(), Arc::new(ManualClock::new()));
        h.registry.add(ChatId(1));
        h.poller.initialize().await.unwrap();
        h.store.set_fail_reconnect(true);
        h.store.push(row(1));

        let outcome = h.poller.poll_once().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Notified { from: 1, to: 2, .. }));
        assert_eq!(h.poller.status().refresh_failures, 1);
        assert_eq!(h.messenger.sent_to(ChatId(1)).len(), 1);
    }

    #[tokio::test]
    async fn read_failure_forces_refresh_even_when_disabled() {
        let s = PollSettings {
            refresh: RefreshPolicy::Disabled,
            ..settings()
        };
        let h = harness(1, s, Arc::new(ManualClock::new()));
        h.poller.initialize().await.unwrap();

        h.poller.poll_once().await.unwrap();
        assert_eq!(h.store.reconnect_calls(), 0);

        h.store.fail_next_reads(1);
        assert!(h.poller.poll_once().await.is_err());
        assert_eq!(h.poller.status().phase, PollPhase::ErrorBackoff);
        h.poller.poll_once().await.unwrap();
        assert_eq!(h.store.reconnect_calls(), 1);

        h.poller.poll_once().await.unwrap();
        assert_eq!(h.store.reconnect_calls(), 1);
    }

    #[tokio::test]
    async fn end_to_end_subscribe_append_unsubscribe() {
        let h = harness(3, settings(), Arc::new(ManualClock::new()));
        let (a, b) = (ChatId(100), ChatId(200));
        h.registry.add(a);
        h.registry.add(b);
        h.poller.initialize().await.unwrap();

        let fresh = crate::domain::Record::new(
            "2026-05-05 09:30:00",
            "Dana",
            "dana@example.com",
            "+44 20 7946 0000",
        );
        h.store.push(fresh.clone());
        h.poller.poll_once().await.unwrap();
        assert_eq!(h.poller.last_known_rows(), Some(4));
        for chat in [a, b] {
            let msgs = h.messenger.sent_to(chat);
            assert_eq!(msgs.len(), 1);
            for field in fresh.to_cells() {
                assert!(msgs[0].contains(&field), "missing {field}");
            }
        }

        h.poller.poll_once().await.unwrap();
        assert_eq!(h.messenger.sent().len(), 2);

        h.registry.remove(b);
        h.store.push(row(9));
        h.poller.poll_once().await.unwrap();
        assert_eq!(h.messenger.sent_to(a).len(), 2);
        assert_eq!(h.messenger.sent_to(b).len(), 1);
    }

    #[tokio::test]
    async fn shutdown_is_prompt_while_sleeping() {
        let s = PollSettings {
            poll_interval: Duration::from_secs(3600),
            ..settings()
        };
        let h = harness(1, s, Arc::new(TokioClock));
        let handle = h.poller.spawn(CancellationToken::new());
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(handle.shutdown(Duration::from_secs(5)).await);
        assert_eq!(h.poller.status().phase, PollPhase::Stopped);
    }
}
