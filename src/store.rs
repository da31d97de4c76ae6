//! High-level store API: the current snapshot, mutations and change stream.
//!
//! The store keeps one current [`TaskStore`] snapshot. Every mutation reads
//! it, computes and validates a candidate, then publishes the candidate as the
//! new current snapshot and sends it to subscribers. Writers are serialized by
//! a lock held across that whole sequence; readers only ever see complete,
//! validated snapshots and never wait on validation.

use crate::builder::{TaskBuilder, TaskMutator};
use crate::config::StoreConfig;
use crate::graph::GraphError;
use crate::id::TaskId;
use crate::mutation;
use crate::snapshot::{Task, TaskStore};
use crate::storage;
use eyre::{Context, Result};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Errors that can occur during store mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The change would make the dependency graph cyclic. Carries the cycle,
    /// with its first task repeated at the end.
    CyclicalDependency(Vec<TaskId>),
    /// The candidate's graph nodes and task data disagree.
    InconsistentStore,
    /// A referenced task does not exist in the store.
    UnknownTask(TaskId),
    /// The store has been shut down and accepts no further changes.
    ShutDown,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::CyclicalDependency(cycle) => {
                let path: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
                write!(f, "dependency cycle: {}", path.join(" -> "))
            }
            StoreError::InconsistentStore => write!(f, "graph nodes and task data do not match"),
            StoreError::UnknownTask(id) => write!(f, "task not found: {}", id),
            StoreError::ShutDown => write!(f, "store has been shut down"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<GraphError<TaskId>> for StoreError {
    fn from(err: GraphError<TaskId>) -> Self {
        match err {
            GraphError::UnknownNode(id) => StoreError::UnknownTask(id),
        }
    }
}

/// Result of a successful create or edit.
///
/// Only the store builds these, so `id` is always present in `after`.
#[derive(Debug, Clone)]
pub struct Commit {
    before: TaskStore,
    after: TaskStore,
    id: TaskId,
}

impl Commit {
    /// Snapshot the change was applied to.
    pub fn before(&self) -> &TaskStore {
        &self.before
    }

    /// Snapshot the change produced.
    pub fn after(&self) -> &TaskStore {
        &self.after
    }

    /// Id of the created or edited task.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The created or edited task, as it is in `after`.
    pub fn task(&self) -> Task<'_> {
        self.after.task(self.id)
    }
}

/// Result of a delete that removed a task. `id` is always present in `before`.
#[derive(Debug, Clone)]
pub struct Removal {
    before: TaskStore,
    after: TaskStore,
    id: TaskId,
}

impl Removal {
    pub fn before(&self) -> &TaskStore {
        &self.before
    }

    pub fn after(&self) -> &TaskStore {
        &self.after
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The removed task, as it was in `before`.
    pub fn task(&self) -> Task<'_> {
        self.before.task(self.id)
    }
}

/// The task store.
pub struct Store {
    config: StoreConfig,
    current: RwLock<TaskStore>,
    // `None` once shut down.
    writer: Mutex<Option<broadcast::Sender<TaskStore>>>,
}

impl Store {
    /// Open the store, loading the file named in `config` if there is one.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let initial = storage::read_file(&config.path).context("Failed to load task store")?;
        log::info!("Opened store {} with {} tasks", config.path.display(), initial.len());
        Ok(Self::with_snapshot(config, initial))
    }

    /// A store starting from `initial`, without reading from disk.
    pub fn with_snapshot(config: StoreConfig, initial: TaskStore) -> Self {
        let (events, _) = broadcast::channel(config.history_capacity.max(1));
        Self {
            config,
            current: RwLock::new(initial),
            writer: Mutex::new(Some(events)),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The current snapshot.
    pub fn current(&self) -> TaskStore {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// True once [`Store::shutdown`] has run.
    pub fn is_shut_down(&self) -> bool {
        self.lock_writer().is_none()
    }

    /// Subscribe to snapshots: first the current one, then every commit.
    pub fn observe(&self) -> SnapshotStream {
        // Holding the writer lock keeps a commit from landing between reading
        // the current snapshot and subscribing.
        let writer = self.lock_writer();
        SnapshotStream {
            initial: Some(self.current()),
            events: writer.as_ref().map(|events| events.subscribe()),
        }
    }

    /// Create a task labelled `label`, configured by `configure`.
    pub fn create_task(
        &self,
        label: impl Into<String>,
        configure: impl FnOnce(&mut TaskBuilder),
    ) -> Result<Commit, StoreError> {
        let mut builder = TaskBuilder::new(label);
        configure(&mut builder);
        let (before, after, id) = self.transact(|old| mutation::apply_create(old, builder))?;
        log::debug!("Created task {}", id);
        Ok(Commit { before, after, id })
    }

    /// Edit the task `id` as staged by `configure`.
    pub fn mutate_task(&self, id: TaskId, configure: impl FnOnce(&mut TaskMutator)) -> Result<Commit, StoreError> {
        let mut mutator = TaskMutator::new();
        configure(&mut mutator);
        let (before, after, ()) = self.transact(|old| Ok((mutation::apply_mutate(old, id, mutator)?, ())))?;
        log::debug!("Updated task {}", id);
        Ok(Commit { before, after, id })
    }

    /// Delete the task `id`. Returns `None` if there was no such task.
    pub fn delete_task(&self, id: TaskId) -> Result<Option<Removal>, StoreError> {
        let (before, after, removed) = self.transact(|old| match mutation::apply_delete(old, id)? {
            Some(new) => Ok((new, true)),
            None => Ok((old.clone(), false)),
        })?;
        if !removed {
            log::debug!("Nothing to delete for {}", id);
            return Ok(None);
        }
        log::debug!("Deleted task {}", id);
        Ok(Some(Removal { before, after, id }))
    }

    /// Write the current snapshot to the configured file.
    pub fn write_to_disk(&self) -> Result<()> {
        storage::write_file(&self.config.path, &self.current())
            .with_context(|| format!("Failed to write {}", self.config.path.display()))
    }

    /// Stop accepting changes, flush the current snapshot and end all
    /// change streams. Only the first call does anything.
    pub fn shutdown(&self) -> Result<()> {
        let mut writer = self.lock_writer();
        let Some(events) = writer.take() else {
            return Ok(());
        };
        log::info!("Shutting down store {}", self.config.path.display());
        let flushed = self.write_to_disk();
        drop(events);
        flushed
    }

    /// Run one read-compute-validate-publish cycle under the writer lock.
    ///
    /// `apply` returns the candidate and a value passed back to the caller.
    /// Returning the old snapshot itself means "no change" and publishes
    /// nothing.
    fn transact<T>(
        &self,
        apply: impl FnOnce(&TaskStore) -> Result<(TaskStore, T), StoreError>,
    ) -> Result<(TaskStore, TaskStore, T), StoreError> {
        let writer = self.lock_writer();
        let Some(events) = writer.as_ref() else {
            return Err(StoreError::ShutDown);
        };

        let old = self.current();
        let (new, value) = apply(&old).inspect_err(|e| log::warn!("Rejected change: {}", e))?;

        if !new.is_same(&old) {
            *self.current.write().unwrap_or_else(PoisonError::into_inner) = new.clone();
            // No subscribers is fine.
            let _ = events.send(new.clone());
            log::debug!("Committed snapshot with {} tasks", new.len());
        }

        Ok((old, new, value))
    }

    fn lock_writer(&self) -> MutexGuard<'_, Option<broadcast::Sender<TaskStore>>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Snapshots from a store: the one current at subscription, then each commit
/// in order. Ends after the store shuts down.
pub struct SnapshotStream {
    initial: Option<TaskStore>,
    events: Option<broadcast::Receiver<TaskStore>>,
}

impl SnapshotStream {
    /// Wait for the next snapshot. `None` once the store has shut down.
    pub async fn next(&mut self) -> Option<TaskStore> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        let events = self.events.as_mut()?;
        loop {
            match events.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Snapshot subscriber lagged, skipped {} snapshots", skipped);
                }
                Err(RecvError::Closed) => {
                    self.events = None;
                    return None;
                }
            }
        }
    }

    /// Blocking variant of [`SnapshotStream::next`] for synchronous callers.
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_next(&mut self) -> Option<TaskStore> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        let events = self.events.as_mut()?;
        loop {
            match events.blocking_recv() {
                Ok(snapshot) => return Some(snapshot),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Snapshot subscriber lagged, skipped {} snapshots", skipped);
                }
                Err(RecvError::Closed) => {
                    self.events = None;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;
    use tempfile::TempDir;

    fn setup_test_store() -> (TempDir, Store) {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open(StoreConfig::new(temp_dir.path().join("tasks.txt"))).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let (_temp_dir, store) = setup_test_store();
        assert!(store.current().is_empty());
        assert!(!store.is_shut_down());
    }

    #[test]
    fn test_create_and_look_up() {
        let (_temp_dir, store) = setup_test_store();

        let commit = store.create_task("Test task", |_| {}).unwrap();

        assert!(commit.before().is_empty());
        assert_eq!(commit.after().len(), 1);
        assert_eq!(commit.task().label(), "Test task");
        assert_eq!(commit.task().status(), Status::Open);
        assert_eq!(&store.current(), commit.after());
    }

    #[test]
    fn test_mutate() {
        let (_temp_dir, store) = setup_test_store();

        let id = store.create_task("Original", |_| {}).unwrap().id();
        let commit = store
            .mutate_task(id, |task| {
                task.label("Updated").start();
            })
            .unwrap();

        assert_eq!(commit.task().label(), "Updated");
        assert_eq!(commit.task().status(), Status::Started);
        assert_eq!(commit.before().look_up_by_id(id).unwrap().label(), "Original");
    }

    #[test]
    fn test_rejected_change_leaves_store_untouched() {
        let (_temp_dir, store) = setup_test_store();

        let a = store.create_task("A", |_| {}).unwrap().id();
        let b = store
            .create_task("B", |task| {
                task.blocked_by(a);
            })
            .unwrap()
            .id();
        let before = store.current();

        let err = store
            .mutate_task(a, |task| {
                task.add_blocker(b);
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::CyclicalDependency(_)));
        assert_eq!(store.current(), before);
    }

    #[test]
    fn test_delete() {
        let (_temp_dir, store) = setup_test_store();

        let id = store.create_task("Doomed", |_| {}).unwrap().id();
        let removal = store.delete_task(id).unwrap().unwrap();
        assert_eq!(removal.task().label(), "Doomed");
        assert!(removal.after().is_empty());

        assert!(store.delete_task(id).unwrap().is_none());
    }

    #[test]
    fn test_results_resolve_against_their_snapshots() {
        let (_temp_dir, store) = setup_test_store();

        let commit = store.create_task("Kept", |_| {}).unwrap();
        assert!(!commit.before().contains(commit.id()));
        assert!(commit.after().contains(commit.id()));
        assert_eq!(commit.task().id(), commit.id());

        let removal = store.delete_task(commit.id()).unwrap().unwrap();
        assert_eq!(removal.id(), commit.id());
        assert_eq!(removal.before(), commit.after());
        assert!(!removal.after().contains(removal.id()));
        assert_eq!(removal.task().label(), "Kept");
    }

    #[test]
    fn test_shutdown_rejects_changes() {
        let (_temp_dir, store) = setup_test_store();

        store.shutdown().unwrap();
        assert!(store.is_shut_down());
        assert_eq!(store.create_task("Late", |_| {}).unwrap_err(), StoreError::ShutDown);
        store.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_flushes() {
        let (temp_dir, store) = setup_test_store();
        store.create_task("Persist me", |_| {}).unwrap();
        store.shutdown().unwrap();

        let reopened = Store::open(StoreConfig::new(temp_dir.path().join("tasks.txt"))).unwrap();
        assert_eq!(reopened.current(), store.current());
    }

    #[test]
    fn test_cycle_error_message() {
        let a: TaskId = "000a".parse().unwrap();
        let b: TaskId = "000b".parse().unwrap();
        let err = StoreError::CyclicalDependency(vec![a, b, a]);
        assert_eq!(err.to_string(), "dependency cycle: 000a -> 000b -> 000a");
    }
}
