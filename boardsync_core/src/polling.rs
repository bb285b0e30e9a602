//! Generation-status polling for the open thread.
//!
//! At most one subscription is active. Each `start`/`stop` advances an epoch;
//! a tick only applies its results while its epoch is still current, so a
//! response that lands after the subscription ended is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use flume::Sender;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::BoardApi;
use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::events::{render_posts, ScrollBehavior, ViewEvent};
use crate::models::GenerationStatus;
use crate::store::PostStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Active(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// A reply is still being generated.
    KeepPolling,
    /// Generation finished and nothing new is on the server.
    Stop,
    /// Generation finished with posts we have not seen; fetch them first.
    FetchThenStop,
}

pub fn decide(status: GenerationStatus, local_count: usize) -> TickDecision {
    if status.is_generating {
        TickDecision::KeepPolling
    } else if status.post_count > local_count as u64 {
        TickDecision::FetchThenStop
    } else {
        TickDecision::Stop
    }
}

/// The live subscription. Exists exactly while the scheduler is active.
pub struct PollHandle {
    thread_id: String,
    epoch: u64,
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

impl PollHandle {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

struct Slot {
    handle: Option<PollHandle>,
    indicator_visible: bool,
}

struct Shared {
    api: Arc<dyn BoardApi>,
    store: Arc<Mutex<PostStore>>,
    events: Sender<ViewEvent>,
    period: Duration,
    epoch: AtomicU64,
    slot: StdMutex<Slot>,
    /// Serializes ticks so a new cycle cannot overtake a fetch still in flight.
    cycle: Mutex<()>,
}

pub struct PollingScheduler {
    shared: Arc<Shared>,
}

impl PollingScheduler {
    pub fn new(
        api: Arc<dyn BoardApi>,
        store: Arc<Mutex<PostStore>>,
        events: Sender<ViewEvent>,
        period: Duration,
    ) -> Self {
        // A zero period would panic inside the timer task.
        let period = if period.is_zero() {
            warn!("zero poll interval, using the default");
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
        } else {
            period
        };
        Self {
            shared: Arc::new(Shared {
                api,
                store,
                events,
                period,
                epoch: AtomicU64::new(0),
                slot: StdMutex::new(Slot {
                    handle: None,
                    indicator_visible: false,
                }),
                cycle: Mutex::new(()),
            }),
        }
    }

    /// Begins polling `thread_id`, replacing any running subscription.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, thread_id: &str) {
        let mut slot = self.shared.lock_slot();
        if let Some(previous) = slot.handle.take() {
            previous.cancel.cancel();
            debug!(thread_id = %previous.thread_id, "replacing poll subscription");
        }

        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_timer(
            Arc::clone(&self.shared),
            thread_id.to_string(),
            epoch,
            cancel.clone(),
        ));
        slot.handle = Some(PollHandle {
            thread_id: thread_id.to_string(),
            epoch,
            cancel,
            _task: task,
        });
        info!(thread_id, period_ms = self.shared.period.as_millis() as u64, "polling started");
    }

    /// Cancels the timer and hides the indicator. No-op when idle.
    pub fn stop(&self) {
        let mut slot = self.shared.lock_slot();
        if let Some(handle) = slot.handle.take() {
            self.shared.epoch.fetch_add(1, Ordering::SeqCst);
            handle.cancel.cancel();
            info!(thread_id = %handle.thread_id, "polling stopped");
        }
        self.shared.set_indicator(&mut slot, false);
    }

    pub fn state(&self) -> PollState {
        match &self.shared.lock_slot().handle {
            Some(handle) => PollState::Active(handle.thread_id.clone()),
            None => PollState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.lock_slot().handle.is_some()
    }

    pub fn indicator_visible(&self) -> bool {
        self.shared.lock_slot().indicator_visible
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.shared.lock_slot().handle.take() {
            handle.cancel.cancel();
        }
    }
}

async fn run_timer(
    shared: Arc<Shared>,
    thread_id: String,
    epoch: u64,
    cancel: CancellationToken,
) {
    let mut interval = interval_at(Instant::now() + shared.period, shared.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        if !shared.tick(&thread_id, epoch).await {
            break;
        }
    }
    debug!(thread_id, epoch, "poll timer exited");
}

impl Shared {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn set_indicator(&self, slot: &mut Slot, visible: bool) {
        if slot.indicator_visible != visible {
            slot.indicator_visible = visible;
            let _ = self.events.send(ViewEvent::Generating(visible));
        }
    }

    /// Updates the indicator only if `epoch` still owns the subscription.
    fn set_indicator_if_current(&self, epoch: u64, visible: bool) -> bool {
        let mut slot = self.lock_slot();
        if !self.is_current(epoch) {
            return false;
        }
        self.set_indicator(&mut slot, visible);
        true
    }

    fn cancel_timer(&self, epoch: u64) {
        let slot = self.lock_slot();
        if let Some(handle) = slot.handle.as_ref().filter(|h| h.epoch == epoch) {
            handle.cancel.cancel();
        }
    }

    /// Moves to idle if `epoch` still owns the subscription.
    fn finish(&self, epoch: u64) {
        let mut slot = self.lock_slot();
        if slot.handle.as_ref().is_some_and(|h| h.epoch == epoch) {
            if let Some(handle) = slot.handle.take() {
                self.epoch.fetch_add(1, Ordering::SeqCst);
                handle.cancel.cancel();
                info!(thread_id = %handle.thread_id, "polling finished");
            }
            self.set_indicator(&mut slot, false);
        }
    }

    /// One status check. Returns whether the timer should keep running.
    async fn tick(&self, thread_id: &str, epoch: u64) -> bool {
        let _cycle = self.cycle.lock().await;
        if !self.is_current(epoch) {
            return false;
        }

        let status = match self.api.generation_status(thread_id).await {
            Ok(status) => status,
            Err(err) => {
                warn!(thread_id, error = %err, "status check failed, stopping poll");
                self.finish(epoch);
                return false;
            }
        };

        let local_count = self.store.lock().await.count();
        let decision = decide(status, local_count);
        debug!(
            thread_id,
            is_generating = status.is_generating,
            remote = status.post_count,
            local = local_count,
            ?decision,
            "status tick"
        );

        match decision {
            TickDecision::KeepPolling => self.set_indicator_if_current(epoch, true),
            TickDecision::Stop => {
                self.finish(epoch);
                false
            }
            TickDecision::FetchThenStop => {
                if !self.set_indicator_if_current(epoch, false) {
                    return false;
                }
                self.cancel_timer(epoch);
                self.fetch_missing(thread_id, epoch).await;
                self.finish(epoch);
                false
            }
        }
    }

    async fn fetch_missing(&self, thread_id: &str, epoch: u64) {
        let since = self.store.lock().await.highest_id();
        let posts = match self.api.list_posts(thread_id, Some(since)).await {
            Ok(posts) => posts,
            Err(err) => {
                warn!(thread_id, since, error = %err, "differential fetch failed");
                return;
            }
        };

        let mut store = self.store.lock().await;
        if !self.is_current(epoch) || store.thread_id() != Some(thread_id) {
            debug!(thread_id, since, "discarding stale differential fetch");
            return;
        }
        let accepted = store.merge_incremental(posts);
        drop(store);

        info!(thread_id, since, accepted = accepted.len(), "merged new posts");
        if !accepted.is_empty() {
            let _ = self.events.send(ViewEvent::PostsAppended {
                thread_id: thread_id.to_string(),
                posts: render_posts(&accepted),
                scroll: ScrollBehavior::Smooth,
            });
        }
    }
}
