use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[tokio::test]
async fn batch_mode_accumulates_events_within_the_window() {
    let flushed: Arc<Mutex<Vec<(&'static str, Vec<u32>)>>> = Arc::new(Mutex::new(Vec::new()));
    let flushed2 = flushed.clone();
    let debouncer: Debouncer<&'static str, u32> = Debouncer::new(
        DebounceMode::Batch,
        Duration::from_millis(30),
        move |key, events| flushed2.lock().push((key, events)),
    );

    debouncer.add("a", 1).unwrap();
    debouncer.add("a", 2).unwrap();
    debouncer.add("a", 3).unwrap();
    debouncer.wait_idle().await;

    let result = flushed.lock().clone();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0], ("a", vec![1, 2, 3]));
}

#[tokio::test]
async fn last_wins_mode_keeps_only_the_final_event() {
    let flushed: Arc<Mutex<Vec<(&'static str, Vec<u32>)>>> = Arc::new(Mutex::new(Vec::new()));
    let flushed2 = flushed.clone();
    let debouncer: Debouncer<&'static str, u32> = Debouncer::new(
        DebounceMode::LastWins,
        Duration::from_millis(30),
        move |key, events| flushed2.lock().push((key, events)),
    );

    debouncer.add("a", 1).unwrap();
    debouncer.add("a", 2).unwrap();
    debouncer.add("a", 3).unwrap();
    debouncer.wait_idle().await;

    let result = flushed.lock().clone();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0], ("a", vec![3]));
}

#[tokio::test]
async fn distinct_keys_flush_independently() {
    let count = Arc::new(AtomicUsize::new(0));
    let count2 = count.clone();
    let debouncer: Debouncer<&'static str, u32> = Debouncer::new(
        DebounceMode::Batch,
        Duration::from_millis(20),
        move |_key, _events| {
            count2.fetch_add(1, Ordering::SeqCst);
        },
    );

    debouncer.add("a", 1).unwrap();
    debouncer.add("b", 1).unwrap();
    debouncer.wait_idle().await;

    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn stop_flushes_pending_entries_once_and_then_rejects_add() {
    let flushed = Arc::new(AtomicUsize::new(0));
    let flushed2 = flushed.clone();
    let debouncer: Debouncer<&'static str, u32> = Debouncer::new(
        DebounceMode::Batch,
        Duration::from_secs(60),
        move |_key, events| {
            flushed2.fetch_add(events.len(), Ordering::SeqCst);
        },
    );

    debouncer.add("a", 1).unwrap();
    debouncer.add("a", 2).unwrap();
    debouncer.stop();
    debouncer.stop();

    assert_eq!(flushed.load(Ordering::SeqCst), 2);
    assert!(debouncer.add("a", 3).is_err());
}
