//! Integration tests for the snapshot change stream.

mod common;

use common::TestEnv;
use std::thread;
use taskdeps::{Store, StoreConfig, TaskStore};

#[tokio::test]
async fn test_stream_replays_current_then_commits() {
    let env = TestEnv::new();
    let a = env.create_task("A");
    let mut stream = env.store.observe();

    let initial = stream.next().await.unwrap();
    assert_eq!(initial.len(), 1);
    assert!(initial.contains(a));

    let b = env.create_blocked("B", &[a]);
    env.complete(a);

    let first = stream.next().await.unwrap();
    assert!(first.contains(b));
    assert!(first.look_up_by_id(a).unwrap().status().is_blocking());

    let second = stream.next().await.unwrap();
    assert_eq!(second, env.store.current());
}

#[tokio::test]
async fn test_stream_ends_after_shutdown() {
    let env = TestEnv::new();
    let mut stream = env.store.observe();
    env.create_task("A");
    env.store.shutdown().unwrap();

    assert!(stream.next().await.unwrap().is_empty());
    assert_eq!(stream.next().await.unwrap().len(), 1);
    assert!(stream.next().await.is_none());
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_late_subscriber_sees_latest_only() {
    let env = TestEnv::new();
    env.create_task("A");
    env.create_task("B");

    let mut stream = env.store.observe();
    assert_eq!(stream.next().await.unwrap().len(), 2);

    env.store.shutdown().unwrap();
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_observe_after_shutdown_yields_final_snapshot() {
    let env = TestEnv::new();
    env.create_task("A");
    env.store.shutdown().unwrap();

    let mut stream = env.store.observe();
    assert_eq!(stream.next().await.unwrap().len(), 1);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_lagging_subscriber_skips_to_newer_snapshots() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = StoreConfig::new(temp_dir.path().join("tasks.txt")).history_capacity(2);
    let store = Store::open(config).unwrap();
    let mut stream = store.observe();

    for i in 0..10 {
        store.create_task(format!("task {}", i), |_| {}).unwrap();
    }
    store.shutdown().unwrap();

    let mut seen: Vec<TaskStore> = Vec::new();
    while let Some(snapshot) = stream.next().await {
        seen.push(snapshot);
    }

    assert!(seen.len() < 11);
    assert!(seen[0].is_empty());
    assert_eq!(seen.last().unwrap().len(), 10);
    assert!(seen.windows(2).all(|pair| pair[0].len() < pair[1].len()));
}

#[test]
fn test_blocking_stream_across_threads() {
    let env = TestEnv::new();
    let mut stream = env.store.observe();

    thread::scope(|scope| {
        let reader = scope.spawn(move || {
            let mut sizes = Vec::new();
            while let Some(snapshot) = stream.blocking_next() {
                sizes.push(snapshot.len());
            }
            sizes
        });

        for i in 0..3 {
            env.create_task(&format!("task {}", i));
        }
        env.store.shutdown().unwrap();

        assert_eq!(reader.join().unwrap(), vec![0, 1, 2, 3]);
    });
}
