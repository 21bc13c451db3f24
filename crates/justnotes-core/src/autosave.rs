//! Per-note debounced save timers.
//!
//! Each note id has at most one armed timer. Arming again for the same id
//! replaces the previous timer in one critical section, so only the last
//! value typed inside the quiet period is ever persisted. Timers for
//! different ids never interact.
//!
//! A timer that fires removes itself from the table before running its
//! callback; re-arming afterwards starts a fresh timer and never aborts a
//! save that is already talking to the service.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::models::NoteId;
use crate::util::lock;

/// Quiet period used when none is configured.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1000);

/// Autosave state of a single note id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutosaveState {
    Idle,
    /// A timer is armed and has not fired yet.
    Pending,
}

#[derive(Debug)]
struct ArmedTimer {
    generation: u64,
    handle: AbortHandle,
}

#[derive(Debug, Default)]
struct TimerTable {
    next_generation: u64,
    timers: HashMap<NoteId, ArmedTimer>,
    in_flight: usize,
}

impl TimerTable {
    fn activity(&self) -> usize {
        self.timers.len() + self.in_flight
    }
}

#[derive(Debug)]
pub struct AutosaveScheduler {
    quiet_period: Duration,
    table: Arc<Mutex<TimerTable>>,
    activity: Arc<watch::Sender<usize>>,
}

impl Default for AutosaveScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl AutosaveScheduler {
    pub fn new(quiet_period: Duration) -> Self {
        let (activity, _) = watch::channel(0);
        Self {
            quiet_period,
            table: Arc::new(Mutex::new(TimerTable::default())),
            activity: Arc::new(activity),
        }
    }

    pub const fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Arm the save for `id` after the configured quiet period.
    pub fn schedule<F, Fut>(&self, id: NoteId, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.arm_or_replace(id, self.quiet_period, callback);
    }

    /// Arm a timer for `id`, cancelling the one not yet fired for the same id.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm_or_replace<F, Fut>(&self, id: NoteId, delay: Duration, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut table = lock(&self.table);
        table.next_generation += 1;
        let generation = table.next_generation;

        let task = tokio::spawn(run_timer(
            Arc::clone(&self.table),
            Arc::clone(&self.activity),
            id.clone(),
            generation,
            delay,
            callback,
        ));
        let armed = ArmedTimer {
            generation,
            handle: task.abort_handle(),
        };

        if let Some(previous) = table.timers.insert(id.clone(), armed) {
            previous.handle.abort();
            tracing::debug!("Re-armed autosave for note {}", id);
        } else {
            tracing::debug!(
                "Armed autosave for note {} ({} ms)",
                id,
                delay.as_millis()
            );
        }
        self.activity.send_replace(table.activity());
    }

    /// Drop the armed timer for `id`, if any. Returns whether one was armed.
    pub fn cancel(&self, id: &NoteId) -> bool {
        let mut table = lock(&self.table);
        let cancelled = table.timers.remove(id).map(|armed| armed.handle.abort());
        self.activity.send_replace(table.activity());
        cancelled.is_some()
    }

    /// Drop every armed timer. Saves already running are left to finish.
    pub fn cancel_all(&self) -> usize {
        let mut table = lock(&self.table);
        let count = table.timers.len();
        for (_, armed) in table.timers.drain() {
            armed.handle.abort();
        }
        self.activity.send_replace(table.activity());
        if count > 0 {
            tracing::debug!("Cancelled {} pending autosaves", count);
        }
        count
    }

    pub fn state(&self, id: &NoteId) -> AutosaveState {
        if lock(&self.table).timers.contains_key(id) {
            AutosaveState::Pending
        } else {
            AutosaveState::Idle
        }
    }

    /// Number of armed timers.
    pub fn pending_count(&self) -> usize {
        lock(&self.table).timers.len()
    }

    /// Wait until no timer is armed and no fired save is still running.
    ///
    /// Timers are not forced; this resolves after the quiet periods elapse.
    pub async fn wait_idle(&self) {
        let mut activity = self.activity.subscribe();
        let _ = activity.wait_for(|count| *count == 0).await;
    }
}

async fn run_timer<F, Fut>(
    table: Arc<Mutex<TimerTable>>,
    activity: Arc<watch::Sender<usize>>,
    id: NoteId,
    generation: u64,
    delay: Duration,
    callback: F,
) where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::time::sleep(delay).await;

    {
        let mut guard = lock(&table);
        match guard.timers.get(&id) {
            Some(armed) if armed.generation == generation => {}
            _ => return,
        }
        guard.timers.remove(&id);
        guard.in_flight += 1;
    }

    let _in_flight = InFlight { table, activity };
    tracing::debug!("Autosave fired for note {}", id);
    callback().await;
}

/// Marks a fired save as finished when dropped.
struct InFlight {
    table: Arc<Mutex<TimerTable>>,
    activity: Arc<watch::Sender<usize>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut table = lock(&self.table);
        table.in_flight = table.in_flight.saturating_sub(1);
        self.activity.send_replace(table.activity());
    }
}
