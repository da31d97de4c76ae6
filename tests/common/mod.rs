//! Shared test infrastructure for taskdeps integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown.

#![allow(dead_code)]

use std::path::PathBuf;
use taskdeps::{Status, Store, StoreConfig, TaskId};
use tempfile::TempDir;

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: Store,
}

impl TestEnv {
    /// Create a new test environment with an empty store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::open(StoreConfig::new(temp_dir.path().join("tasks.txt"))).expect("Failed to open store");
        Self { temp_dir, store }
    }

    /// Path of the task file backing the store.
    pub fn path(&self) -> PathBuf {
        self.store.config().path.clone()
    }

    /// Open a second store over the same file.
    pub fn reopen(&self) -> Store {
        Store::open(StoreConfig::new(self.path())).expect("Failed to reopen store")
    }

    /// Create an open task with no dependencies.
    pub fn create_task(&self, label: &str) -> TaskId {
        self.store.create_task(label, |_| {}).expect("Failed to create task").id()
    }

    /// Create an open task blocked by `blockers`.
    pub fn create_blocked(&self, label: &str, blockers: &[TaskId]) -> TaskId {
        self.store
            .create_task(label, |task| {
                for blocker in blockers {
                    task.blocked_by(*blocker);
                }
            })
            .expect("Failed to create task")
            .id()
    }

    /// Make `blocker` block `blocked`.
    pub fn add_blocker(&self, blocked: TaskId, blocker: TaskId) {
        self.store
            .mutate_task(blocked, |task| {
                task.add_blocker(blocker);
            })
            .expect("Failed to add blocker");
    }

    pub fn complete(&self, id: TaskId) {
        self.store
            .mutate_task(id, |task| {
                task.complete();
            })
            .expect("Failed to complete task");
    }

    pub fn start(&self, id: TaskId) {
        self.store
            .mutate_task(id, |task| {
                task.start();
            })
            .expect("Failed to start task");
    }

    pub fn status(&self, id: TaskId) -> Status {
        self.store
            .current()
            .look_up_by_id(id)
            .expect("Task not found")
            .status()
    }

    pub fn ready_ids(&self) -> Vec<TaskId> {
        let snapshot = self.store.current();
        snapshot
            .all_open_tasks_without_open_blockers()
            .iter()
            .map(|task| task.id())
            .collect()
    }

    pub fn blocked_ids(&self) -> Vec<TaskId> {
        let snapshot = self.store.current();
        snapshot
            .all_open_tasks_with_open_blockers()
            .iter()
            .map(|task| task.id())
            .collect()
    }

    /// Assert that a task is ready to work on.
    pub fn assert_ready(&self, id: TaskId) {
        let ready = self.ready_ids();
        assert!(
            ready.contains(&id),
            "Expected task {} to be ready, but it wasn't. Ready tasks: {:?}",
            id,
            ready
        );
    }

    /// Assert that a task is NOT ready to work on.
    pub fn assert_not_ready(&self, id: TaskId) {
        assert!(
            !self.ready_ids().contains(&id),
            "Expected task {} to NOT be ready, but it was",
            id
        );
    }

    /// Assert that a task is in the blocked list.
    pub fn assert_blocked(&self, id: TaskId) {
        assert!(
            self.blocked_ids().contains(&id),
            "Expected task {} to be blocked, but it wasn't",
            id
        );
    }

    pub fn ready_count(&self) -> usize {
        self.ready_ids().len()
    }

    pub fn total_count(&self) -> usize {
        self.store.current().len()
    }

    /// Every edge of the current graph as (blocker, blocked).
    pub fn edges(&self) -> Vec<(TaskId, TaskId)> {
        self.store
            .current()
            .graph()
            .edges()
            .map(|(from, to)| (*from, *to))
            .collect()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
