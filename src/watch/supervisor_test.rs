use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

use super::supervisor::RetryState;
use super::*;
use crate::config::RetryConfig;
use crate::config::RetryNotice;
use crate::test_utils::*;
use crate::WatchError;

const WAIT: Duration = Duration::from_secs(60);

fn fast_retry() -> RetryConfig {
    RetryConfig::default()
        .with_initial_backoff(Duration::from_millis(10))
        .with_max_backoff(Duration::from_millis(100))
}

fn recording(retry: RetryConfig) -> (RetryConfig, Arc<Mutex<Vec<RetryNotice>>>) {
    let notices = Arc::new(Mutex::new(Vec::new()));
    let sink = notices.clone();
    let retry = retry.on_retry(move |notice| sink.lock().push(notice.clone()));
    (retry, notices)
}

fn start(
    transport: &ScriptedTransport,
    ctx: &CancellationToken,
    retry: RetryConfig,
    start_revision: u64,
) -> (mpsc::Receiver<WatchEvent>, ShutdownCoordinator) {
    let coordinator = ShutdownCoordinator::new();
    let request = WatchOptions::default()
        .with_start_revision(start_revision)
        .to_request(Bytes::from("k"));
    let settings = retry.validate().unwrap();
    let stop = StopSignal::new(ctx.clone(), coordinator.token().clone());
    let (tx, rx) = mpsc::channel(16);

    coordinator.spawn(run_resilient_watch(
        Arc::new(transport.clone()),
        request,
        settings,
        16,
        tx,
        stop,
        coordinator.clone(),
    ));
    (rx, coordinator)
}

async fn next(rx: &mut mpsc::Receiver<WatchEvent>) -> Option<WatchEvent> {
    timeout(WAIT, rx.recv()).await.expect("watch channel stalled")
}

#[test]
fn test_retry_state_resume_revision() {
    let settings = RetryConfig::default().validate().unwrap();
    let mut state = RetryState::new(&settings, 0);
    assert_eq!(state.resume_revision(), 0);

    state.record_delivered(5);
    assert_eq!(state.resume_revision(), 6);

    state.record_delivered(3);
    assert_eq!(state.last_revision, 5);

    let terminal = WatchEvent::terminal(WatchError::Compacted { compact_revision: 20 }, 5, 20);
    state.record_terminal(&terminal);
    assert_eq!(state.resume_revision(), 20);
}

#[test]
fn test_retry_state_keeps_start_revision_until_delivery() {
    let settings = RetryConfig::default().validate().unwrap();
    let mut state = RetryState::new(&settings, 42);
    assert_eq!(state.resume_revision(), 42);

    state.record_terminal(&WatchEvent::terminal(WatchError::Disconnected, 0, 0));
    assert_eq!(state.resume_revision(), 42);

    state.record_delivered(42);
    assert_eq!(state.resume_revision(), 43);
}

#[test]
fn test_retry_state_reset() {
    let settings = fast_retry().validate().unwrap();
    let mut state = RetryState::new(&settings, 0);
    state.retry_count = 4;
    state.backoff.next_delay();
    state.backoff.next_delay();

    state.reset();

    assert_eq!(state.retry_count, 0);
    assert_eq!(state.backoff.current(), Duration::from_millis(10));
}

#[test]
fn test_retry_count_saturates_when_unbounded() {
    let settings = RetryConfig::default().validate().unwrap();
    let mut state = RetryState::new(&settings, 0);
    state.retry_count = u32::MAX - 1;

    assert_eq!(state.record_attempt(), u32::MAX);
    assert_eq!(state.record_attempt(), u32::MAX);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_reconnect_resumes_after_last_revision() {
    let transport = ScriptedTransport::new([
        Attempt::ends(vec![put("k", "a", 4), put("k", "b", 5)]),
        Attempt::hangs(vec![put("k", "c", 6)]),
    ]);
    let ctx = CancellationToken::new();
    let (mut rx, _coordinator) = start(&transport, &ctx, fast_retry(), 0);

    let revisions: Vec<u64> = vec![
        next(&mut rx).await.unwrap().revision,
        next(&mut rx).await.unwrap().revision,
        next(&mut rx).await.unwrap().revision,
    ];

    assert_eq!(revisions, vec![4, 5, 6]);
    assert_eq!(transport.start_revisions(), vec![0, 6]);
}

#[tokio::test(start_paused = true)]
async fn test_compaction_floor_wins_over_last_revision() {
    let transport = ScriptedTransport::new([
        Attempt::hangs(vec![put("k", "a", 5), compacted(20)]),
        Attempt::hangs(vec![put("k", "b", 20)]),
    ]);
    let ctx = CancellationToken::new();
    let (mut rx, _coordinator) = start(&transport, &ctx, fast_retry(), 0);

    assert_eq!(next(&mut rx).await.unwrap().revision, 5);
    // The compaction itself is handled internally, never surfaced
    let resumed = next(&mut rx).await.unwrap();
    assert!(resumed.is_normal());
    assert_eq!(resumed.revision, 20);

    assert_eq!(transport.start_revisions(), vec![0, 20]);
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_exhaustion() {
    let transport = ScriptedTransport::new([
        Attempt::Refuse(unavailable()),
        Attempt::Refuse(unavailable()),
        Attempt::Refuse(unavailable()),
    ]);
    let (retry, notices) = recording(fast_retry().with_max_retries(2));
    let ctx = CancellationToken::new();
    let (mut rx, _coordinator) = start(&transport, &ctx, retry, 0);

    let terminal = next(&mut rx).await.unwrap();
    assert!(terminal.is_retries_exhausted());
    assert_eq!(
        terminal.error,
        Some(WatchError::RetriesExhausted {
            retries: 2,
            last: Box::new(unavailable()),
        })
    );
    assert!(next(&mut rx).await.is_none());

    let attempts: Vec<u32> = notices.lock().iter().map(|n| n.attempt).collect();
    assert_eq!(attempts, vec![1, 2]);
    assert_eq!(transport.watch_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unlimited_retries_keep_going() {
    let transport = ScriptedTransport::new((0..5).map(|_| Attempt::Refuse(unavailable())));
    let ctx = CancellationToken::new();
    let (mut rx, _coordinator) = start(&transport, &ctx, fast_retry(), 0);

    timeout(WAIT, transport.wait_for_calls(6)).await.unwrap();

    assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[tokio::test(start_paused = true)]
async fn test_healthy_connection_resets_escalation() {
    let transport = ScriptedTransport::new([
        Attempt::Refuse(unavailable()),
        Attempt::Refuse(unavailable()),
        Attempt::ends(vec![put("k", "a", 1)]),
    ]);
    let (retry, notices) = recording(
        RetryConfig::default()
            .with_initial_backoff(Duration::from_millis(100))
            .with_max_backoff(Duration::from_secs(1)),
    );
    let ctx = CancellationToken::new();
    let (mut rx, _coordinator) = start(&transport, &ctx, retry, 0);

    assert_eq!(next(&mut rx).await.unwrap().revision, 1);
    timeout(WAIT, transport.wait_for_calls(4)).await.unwrap();

    let notices = notices.lock().clone();
    let attempts: Vec<u32> = notices.iter().map(|n| n.attempt).collect();
    assert_eq!(attempts, vec![1, 2, 1]);

    // 100ms, 200ms, then back to 100ms, each within ±20%
    let ms: Vec<u128> = notices.iter().map(|n| n.next_backoff.as_millis()).collect();
    assert!((80..=120).contains(&ms[0]), "{ms:?}");
    assert!((160..=240).contains(&ms[1]), "{ms:?}");
    assert!((80..=120).contains(&ms[2]), "{ms:?}");
    assert_eq!(notices[2].last_revision, 1);
    assert_eq!(notices[2].cause, WatchError::Disconnected);
    assert_eq!(transport.start_revisions(), vec![0, 0, 0, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_start_revision_preserved_before_delivery() {
    let transport = ScriptedTransport::new([Attempt::Refuse(unavailable())]);
    let ctx = CancellationToken::new();
    let (_rx, _coordinator) = start(&transport, &ctx, fast_retry(), 42);

    timeout(WAIT, transport.wait_for_calls(2)).await.unwrap();

    assert_eq!(transport.start_revisions(), vec![42, 42]);
}

#[tokio::test]
async fn test_cancel_during_long_backoff_closes_promptly() {
    let transport = ScriptedTransport::new([Attempt::Refuse(unavailable())]);
    let (retry, notices) = recording(RetryConfig::default().with_initial_backoff(Duration::from_secs(3600)));
    let ctx = CancellationToken::new();
    let (mut rx, _coordinator) = start(&transport, &ctx, retry, 0);

    transport.wait_for_calls(1).await;
    while notices.lock().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    ctx.cancel();

    let closed = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
    assert!(closed.is_none(), "cancellation must not emit an exhaustion event");
    assert_eq!(transport.watch_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_client_shutdown_stops_supervisor() {
    let transport = ScriptedTransport::new([Attempt::hangs(vec![put("k", "a", 1)])]);
    let ctx = CancellationToken::new();
    let (mut rx, coordinator) = start(&transport, &ctx, fast_retry(), 0);

    assert_eq!(next(&mut rx).await.unwrap().revision, 1);
    timeout(WAIT, coordinator.shutdown()).await.unwrap();

    assert!(next(&mut rx).await.is_none());
    assert_eq!(coordinator.active_tasks(), 0);
}
