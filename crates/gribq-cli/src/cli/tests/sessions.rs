//! Tests for the bounded session runner behind `fetch --jobs`.

use crate::cli::commands::run_sessions;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn panicked_session_counts_as_failure_and_rest_finish() {
    let finished = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&finished);
    let mut reported = Vec::new();

    let failures = run_sessions(
        vec![1u32, 2, 3, 4, 5],
        2,
        move |n| {
            if n == 2 {
                panic!("session {n} failed hard");
            }
            std::thread::sleep(Duration::from_millis(20));
            counter.fetch_add(1, Ordering::SeqCst);
            n
        },
        |n| {
            reported.push(n);
            n != 4
        },
    )
    .await;

    assert_eq!(failures, 2);
    reported.sort_unstable();
    assert_eq!(reported, vec![1, 3, 4, 5]);
    assert_eq!(finished.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn never_exceeds_max_concurrent() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (r, p) = (Arc::clone(&running), Arc::clone(&peak));

    let failures = run_sessions(
        (0..6).collect::<Vec<u32>>(),
        2,
        move |_| {
            let now = r.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            r.fetch_sub(1, Ordering::SeqCst);
        },
        |()| true,
    )
    .await;

    assert_eq!(failures, 0);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}
