//! Tests for the deferred task scheduler with real wake sources.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tilt_shared::scheduler::{Scheduler, WakeSource};

type Log = Arc<Mutex<Vec<u64>>>;

/// Callback that appends `tag` to `log`
fn record(log: &Log, tag: u64) -> impl FnOnce() + Send + 'static {
    let log = log.clone();
    move || log.lock().unwrap().push(tag)
}

/// Callback that increments `hits`
fn bump(hits: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
    let hits = hits.clone();
    move || {
        hits.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_fires_in_fire_time_order() {
    let scheduler = Scheduler::manual();
    let log = Log::default();
    for delay in [50, 10, 30] {
        scheduler.schedule(record(&log, delay), Duration::from_millis(delay));
    }

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(scheduler.run_due(), 3);
    assert_eq!(*log.lock().unwrap(), vec![10, 30, 50]);
}

#[tokio::test]
async fn test_equal_fire_times_keep_insertion_order() {
    let scheduler = Scheduler::manual();
    let log = Log::default();
    for tag in 1..=5 {
        scheduler.schedule(record(&log, tag), Duration::ZERO);
    }
    scheduler.run_due();
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_cleared_task_never_runs() {
    let scheduler = Scheduler::new(&Default::default());
    let hits = Arc::new(AtomicUsize::new(0));
    let id = scheduler.schedule(bump(&hits), Duration::from_millis(30));
    assert!(scheduler.clear(id));

    tokio::time::sleep(Duration::from_millis(120)).await;
    scheduler.run_due();
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_callback_does_not_stop_others() {
    let scheduler = Scheduler::manual();
    let log = Log::default();
    scheduler.schedule(record(&log, 1), Duration::ZERO);
    scheduler.schedule(|| panic!("callback blew up"), Duration::ZERO);
    scheduler.schedule(record(&log, 3), Duration::ZERO);

    assert_eq!(scheduler.run_due(), 3);
    assert_eq!(*log.lock().unwrap(), vec![1, 3]);

    // Still healthy afterwards
    scheduler.schedule(record(&log, 4), Duration::ZERO);
    assert_eq!(scheduler.run_due(), 1);
}

#[tokio::test]
async fn test_redundant_due_checks_fire_once() {
    let scheduler = Scheduler::manual();
    let hits = Arc::new(AtomicUsize::new(0));
    scheduler.schedule(bump(&hits), Duration::ZERO);
    scheduler.run_due();
    scheduler.run_due();
    scheduler.wake();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

async fn fires_with(sources: Vec<WakeSource>) -> bool {
    let scheduler = Scheduler::with_sources(Duration::from_millis(2), sources);
    let hits = Arc::new(AtomicUsize::new(0));
    scheduler.schedule(bump(&hits), Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(300)).await;
    hits.load(Ordering::SeqCst) == 1
}

#[tokio::test]
async fn test_deadline_alone_fires() {
    assert!(fires_with(vec![WakeSource::Deadline]).await);
}

#[tokio::test]
async fn test_ticker_alone_fires() {
    let every = Duration::from_millis(25);
    assert!(fires_with(vec![WakeSource::Ticker { every }]).await);
}

#[tokio::test]
async fn test_sweep_alone_fires() {
    let every = Duration::from_millis(40);
    assert!(fires_with(vec![WakeSource::Sweep { every }]).await);
}

#[tokio::test]
async fn test_all_sources_fire_exactly_once() {
    let every = Duration::from_millis(5);
    assert!(
        fires_with(vec![
            WakeSource::Deadline,
            WakeSource::Ticker { every },
            WakeSource::Sweep { every },
            WakeSource::Foreground,
        ])
        .await
    );
}

#[tokio::test]
async fn test_callback_can_reschedule() {
    let scheduler = Scheduler::with_sources(Duration::ZERO, vec![WakeSource::Deadline]);
    let handle = scheduler.handle();
    let hits = Arc::new(AtomicUsize::new(0));

    let h = hits.clone();
    let inner = handle.clone();
    handle.schedule(
        move || {
            h.fetch_add(1, Ordering::SeqCst);
            inner.schedule(bump(&h), Duration::from_millis(10));
        },
        Duration::from_millis(10),
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_destroy_drops_pending() {
    let scheduler = Scheduler::new(&Default::default());
    let hits = Arc::new(AtomicUsize::new(0));
    scheduler.schedule(bump(&hits), Duration::from_millis(20));
    scheduler.destroy();
    assert_eq!(scheduler.pending(), 0);

    scheduler.schedule(bump(&hits), Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(scheduler.run_due(), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    // Idempotent
    scheduler.destroy();
}

#[tokio::test]
async fn test_destroy_from_callback_stops_sweep() {
    let scheduler = Arc::new(Scheduler::manual());
    let hits = Arc::new(AtomicUsize::new(0));

    let owner = scheduler.clone();
    scheduler.schedule(move || owner.destroy(), Duration::ZERO);
    scheduler.schedule(bump(&hits), Duration::ZERO);

    assert_eq!(scheduler.run_due(), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_huge_delay_is_accepted() {
    let scheduler = Scheduler::with_sources(Duration::from_millis(5), vec![WakeSource::Deadline]);
    let hits = Arc::new(AtomicUsize::new(0));
    scheduler.schedule(bump(&hits), Duration::MAX);
    scheduler.schedule_ms(bump(&hits), i64::MAX);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(scheduler.pending(), 2);
    assert_eq!(scheduler.run_due(), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
