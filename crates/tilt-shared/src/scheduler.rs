//! Deferred task scheduler.
//!
//! Runs zero-argument callbacks no earlier than a delay from scheduling.
//! Timers can be throttled or starved, so the due-check is fed by several
//! independent wake sources:
//!
//! - `Deadline`: sleeps until the soonest fire time plus a margin, re-armed
//!   whenever a task is added
//! - `Ticker`: periodic background tick, only signals
//! - `Sweep`: coarse fixed-interval due-check
//! - `Foreground`: SIGCONT (process resumed from background), only signals
//!
//! Any subset may be missing; the rest still fire every task eventually.
//! The due-check is idempotent, so redundant triggers are harmless.

use crate::config::SchedulerConfig;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Opaque task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    fn new() -> Self {
        TaskId(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Callback = Box<dyn FnOnce() + Send + 'static>;

struct ScheduledTask {
    id: TaskId,
    execute_at: Instant,
    /// Insertion order, for stable ties
    seq: u64,
    callback: Callback,
}

#[derive(Default)]
struct PendingTasks {
    tasks: Vec<ScheduledTask>,
    next_seq: u64,
}

/// A producer of due-check triggers
#[derive(Debug, Clone, PartialEq)]
pub enum WakeSource {
    Deadline,
    Ticker { every: Duration },
    Sweep { every: Duration },
    Foreground,
}

impl WakeSource {
    /// Sources enabled by config
    pub fn from_config(config: &SchedulerConfig) -> Vec<WakeSource> {
        let mut sources = vec![WakeSource::Deadline];
        if config.tick_ms > 0 {
            sources.push(WakeSource::Ticker {
                every: Duration::from_millis(config.tick_ms),
            });
        }
        if config.sweep_ms > 0 {
            sources.push(WakeSource::Sweep {
                every: Duration::from_millis(config.sweep_ms),
            });
        }
        if config.foreground_signal {
            sources.push(WakeSource::Foreground);
        }
        sources
    }

    /// Whether this source only signals (needs the pump to act)
    fn signals(&self) -> bool {
        !matches!(self, WakeSource::Sweep { .. })
    }
}

struct Shared {
    pending: Mutex<PendingTasks>,
    wake: Notify,
    destroyed: AtomicBool,
    /// A pump task is consuming `wake`
    pumped: AtomicBool,
    margin: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PendingTasks> {
        // Callbacks run outside the lock, so a poisoned guard still holds
        // consistent data.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.lock().tasks.iter().map(|t| t.execute_at).min()
    }

    /// Fire every due task in (fire time, insertion) order.
    fn run_due(&self) -> usize {
        if self.is_destroyed() {
            return 0;
        }

        let mut due = {
            let mut pending = self.lock();
            let now = Instant::now();
            let (due, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut pending.tasks)
                .into_iter()
                .partition(|t| t.execute_at <= now);
            pending.tasks = keep;
            due
        };
        if due.is_empty() {
            return 0;
        }
        due.sort_by_key(|t| (t.execute_at, t.seq));

        let total = due.len();
        let mut fired = 0;
        for task in due {
            // A callback (or another thread) may destroy the scheduler mid-sweep
            if self.is_destroyed() {
                let dropped = total - fired;
                debug!("Scheduler destroyed mid-sweep, {} due task(s) dropped", dropped);
                break;
            }
            fired += 1;
            if let Err(payload) = catch_unwind(AssertUnwindSafe(task.callback)) {
                error!("Scheduled task {} panicked: {}", task.id, panic_message(&payload));
            }
        }
        debug!("Due-check fired {} task(s)", fired);
        fired
    }
}

/// Roughly 30 years, the cap for delays that overflow `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `at + delay`, capped instead of overflowing.
fn after(at: Instant, delay: Duration) -> Instant {
    at.checked_add(delay)
        .or_else(|| at.checked_add(FAR_FUTURE))
        .unwrap_or(at)
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic".to_string()
    }
}

/// Cloneable handle; callbacks may hold one to reschedule.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Run `callback` no earlier than `delay` from now.
    pub fn schedule<F>(&self, callback: F, delay: Duration) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = TaskId::new();
        if self.shared.is_destroyed() {
            debug!("Scheduler destroyed, task {} dropped", id);
            return id;
        }

        {
            let mut pending = self.shared.lock();
            let seq = pending.next_seq;
            pending.next_seq += 1;
            pending.tasks.push(ScheduledTask {
                id,
                execute_at: after(Instant::now(), delay),
                seq,
                callback: Box::new(callback),
            });
        }
        // Re-arm the deadline timer
        self.shared.wake.notify_one();
        id
    }

    /// Millisecond form; negative delays are clamped to zero.
    pub fn schedule_ms<F>(&self, callback: F, delay_ms: i64) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = Duration::from_millis(delay_ms.max(0) as u64);
        self.schedule(callback, delay)
    }

    /// Remove a pending task. Unknown or already-fired ids are a no-op.
    pub fn clear(&self, id: TaskId) -> bool {
        let mut pending = self.shared.lock();
        let before = pending.tasks.len();
        pending.tasks.retain(|t| t.id != id);
        before != pending.tasks.len()
    }

    /// External wake event (e.g. foregrounding). Signals the pump when one
    /// is running, otherwise runs the due-check inline.
    pub fn wake(&self) {
        if self.shared.pumped.load(Ordering::SeqCst) {
            self.shared.wake.notify_one();
        } else {
            self.shared.run_due();
        }
    }

    /// Run the due-check now; returns the number of callbacks fired.
    pub fn run_due(&self) -> usize {
        self.shared.run_due()
    }

    pub fn pending(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.shared.next_deadline()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.is_destroyed()
    }
}

/// Owner of the wake sources. Dropping it destroys the scheduler.
pub struct Scheduler {
    handle: SchedulerHandle,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Scheduler with the sources enabled in config.
    pub fn new(config: &SchedulerConfig) -> Self {
        Self::with_sources(config.margin(), WakeSource::from_config(config))
    }

    /// No background sources; callers drive `run_due`/`wake` themselves.
    pub fn manual() -> Self {
        Self::with_sources(Duration::ZERO, Vec::new())
    }

    /// Scheduler with an explicit set of sources. Sources are spawned on
    /// the current tokio runtime; without one, the scheduler is manual.
    pub fn with_sources(margin: Duration, sources: Vec<WakeSource>) -> Self {
        let shared = Arc::new(Shared {
            pending: Mutex::new(PendingTasks::default()),
            wake: Notify::new(),
            destroyed: AtomicBool::new(false),
            pumped: AtomicBool::new(false),
            margin,
        });

        let mut workers = Vec::new();
        if !sources.is_empty() && tokio::runtime::Handle::try_current().is_err() {
            warn!("No tokio runtime, scheduler running without wake sources");
        } else if !sources.is_empty() {
            let deadline = sources.contains(&WakeSource::Deadline);
            if sources.iter().any(WakeSource::signals) {
                shared.pumped.store(true, Ordering::SeqCst);
                workers.push(tokio::spawn(pump(shared.clone(), deadline)));
            }
            for source in &sources {
                match source {
                    WakeSource::Deadline => {}
                    WakeSource::Ticker { every } => {
                        workers.push(tokio::spawn(ticker(shared.clone(), *every)));
                    }
                    WakeSource::Sweep { every } => {
                        workers.push(tokio::spawn(sweep(shared.clone(), *every)));
                    }
                    WakeSource::Foreground => {
                        workers.push(tokio::spawn(foreground(shared.clone())));
                    }
                }
            }
            info!("Scheduler started with sources {:?}", sources);
        }

        Self {
            handle: SchedulerHandle { shared },
            workers: Mutex::new(workers),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn schedule<F>(&self, callback: F, delay: Duration) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.schedule(callback, delay)
    }

    pub fn schedule_ms<F>(&self, callback: F, delay_ms: i64) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.schedule_ms(callback, delay_ms)
    }

    pub fn clear(&self, id: TaskId) -> bool {
        self.handle.clear(id)
    }

    pub fn wake(&self) {
        self.handle.wake()
    }

    pub fn run_due(&self) -> usize {
        self.handle.run_due()
    }

    pub fn pending(&self) -> usize {
        self.handle.pending()
    }

    /// Stop every source and drop pending tasks without firing them.
    pub fn destroy(&self) {
        let shared = &self.handle.shared;
        if shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let dropped = std::mem::take(&mut shared.lock().tasks);

        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        for worker in workers.drain(..) {
            worker.abort();
        }
        shared.pumped.store(false, Ordering::SeqCst);
        debug!("Scheduler destroyed, {} pending task(s) dropped", dropped.len());
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Consumes wake signals and, with `deadline`, the self-rearming timer.
async fn pump(shared: Arc<Shared>, deadline: bool) {
    loop {
        match shared.next_deadline().filter(|_| deadline) {
            Some(at) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(after(at, shared.margin)) => {}
                    _ = shared.wake.notified() => {}
                }
            }
            None => shared.wake.notified().await,
        }
        if shared.is_destroyed() {
            break;
        }
        shared.run_due();
    }
}

async fn ticker(shared: Arc<Shared>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if shared.is_destroyed() {
            break;
        }
        shared.wake.notify_one();
    }
}

async fn sweep(shared: Arc<Shared>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        if shared.is_destroyed() {
            break;
        }
        shared.run_due();
    }
}

#[cfg(unix)]
async fn foreground(shared: Arc<Shared>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut resumed = match signal(SignalKind::from_raw(libc::SIGCONT)) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Foreground wake source unavailable: {}", e);
            return;
        }
    };
    while resumed.recv().await.is_some() {
        if shared.is_destroyed() {
            break;
        }
        debug!("Resumed from background, waking scheduler");
        shared.wake.notify_one();
    }
}

#[cfg(not(unix))]
async fn foreground(_shared: Arc<Shared>) {
    debug!("Foreground wake source not supported on this platform");
}
