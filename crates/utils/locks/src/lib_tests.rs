use core::time::Duration;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::yield_now;
use tokio::time::{sleep, timeout};

use super::KeyedLocks;

#[tokio::test]
async fn test_same_key_serializes_in_arrival_order() {
    let locks = KeyedLocks::<&'static str>::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let first = locks.lock(&"p1").await;

    let mut tasks = Vec::new();
    for n in 0..3_u32 {
        let locks = locks.clone();
        let log = Arc::clone(&log);
        tasks.push(tokio::spawn(async move {
            let _guard = locks.lock(&"p1").await;
            log.lock().push(n);
        }));
        // Let the task register as a waiter before spawning the next one.
        for _ in 0..4 {
            yield_now().await;
        }
    }

    assert!(log.lock().is_empty());
    drop(first);

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(*log.lock(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_different_keys_do_not_block() {
    let locks = KeyedLocks::new();

    let _p1 = locks.lock(&"p1").await;
    let p2 = tokio::time::timeout(Duration::from_millis(100), locks.lock(&"p2")).await;

    assert!(p2.is_ok());
}

#[tokio::test]
async fn test_entries_are_released() {
    let locks = KeyedLocks::new();

    let guard = locks.lock(&"p1").await;
    assert!(locks.is_busy(&"p1"));
    assert_eq!(guard.key(), &"p1");

    drop(guard);
    assert!(!locks.is_busy(&"p1"));
    assert_eq!(locks.busy_count(), 0);
}

#[tokio::test]
async fn test_entry_survives_while_waiters_remain() {
    let locks = KeyedLocks::new();
    let first = locks.lock(&"p1").await;

    let waiter = {
        let locks = locks.clone();
        tokio::spawn(async move {
            let _guard = locks.lock(&"p1").await;
            sleep(Duration::from_millis(10)).await;
        })
    };

    for _ in 0..4 {
        yield_now().await;
    }

    drop(first);
    assert!(locks.is_busy(&"p1"));

    waiter.await.unwrap();
    assert!(!locks.is_busy(&"p1"));
}

#[tokio::test]
async fn test_cancelled_waiter_releases_entry() {
    let locks = KeyedLocks::new();
    let first = locks.lock(&"p1").await;

    let mut waiter = Box::pin(locks.lock(&"p1"));
    assert!(timeout(Duration::ZERO, &mut waiter).await.is_err());

    drop(first);
    assert!(locks.is_busy(&"p1"));

    drop(waiter);
    assert!(!locks.is_busy(&"p1"));
    assert_eq!(locks.busy_count(), 0);
}

#[tokio::test]
async fn test_waiter_cancelled_while_held_does_not_block_key() {
    let locks = KeyedLocks::new();
    let first = locks.lock(&"p1").await;

    assert!(timeout(Duration::from_millis(5), locks.lock(&"p1"))
        .await
        .is_err());

    drop(first);
    assert_eq!(locks.busy_count(), 0);

    let again = timeout(Duration::from_millis(100), locks.lock(&"p1")).await;
    assert!(again.is_ok());
}
