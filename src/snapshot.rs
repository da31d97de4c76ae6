//! Immutable store snapshots and the read-only task views derived from them.

use crate::graph::DependencyGraph;
use crate::id::TaskId;
use crate::types::{Status, TaskData};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// One immutable state of the whole store: the dependency graph plus the
/// data of every task in it.
///
/// Cloning is cheap. Equality and hashing are structural over graph and data.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<Inner>,
}

struct Inner {
    graph: DependencyGraph<TaskId>,
    data: BTreeMap<TaskId, TaskData>,
    partitions: OnceLock<Partitions>,
}

/// Task ids grouped by status and blocked-ness, computed on first use.
#[derive(Debug, Default)]
struct Partitions {
    open_unblocked: Vec<TaskId>,
    open_blocked: Vec<TaskId>,
    started: Vec<TaskId>,
    completed: Vec<TaskId>,
    open: Vec<TaskId>,
}

impl TaskStore {
    /// Build a snapshot from a graph and the data of its nodes.
    ///
    /// # Panics
    ///
    /// Panics if the graph's nodes and the data keys are not the same set.
    /// Callers that assemble candidates from untrusted edits should check
    /// with [`TaskStore::is_consistent`] first.
    pub fn new(graph: DependencyGraph<TaskId>, data: BTreeMap<TaskId, TaskData>) -> Self {
        assert!(
            Self::is_consistent(&graph, &data),
            "inconsistent store: graph nodes and task data keys differ"
        );
        Self {
            inner: Arc::new(Inner {
                graph,
                data,
                partitions: OnceLock::new(),
            }),
        }
    }

    /// A snapshot with no tasks.
    pub fn empty() -> Self {
        Self::new(DependencyGraph::new(), BTreeMap::new())
    }

    /// True if the node set of `graph` equals the key set of `data`.
    pub fn is_consistent(graph: &DependencyGraph<TaskId>, data: &BTreeMap<TaskId, TaskData>) -> bool {
        graph.len() == data.len() && graph.contents().eq(data.keys())
    }

    /// The dependency graph over task ids.
    pub fn graph(&self) -> &DependencyGraph<TaskId> {
        &self.inner.graph
    }

    /// Data of every task, keyed by id.
    pub fn data(&self) -> &BTreeMap<TaskId, TaskData> {
        &self.inner.data
    }

    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.inner.data.contains_key(&id)
    }

    /// View of the task with the given id, if it exists in this snapshot.
    pub fn look_up_by_id(&self, id: TaskId) -> Option<Task<'_>> {
        self.inner
            .data
            .get_key_value(&id)
            .map(|(id, data)| Task { store: self, id: *id, data })
    }

    /// Every task, ordered by id.
    pub fn all_tasks(&self) -> Vec<Task<'_>> {
        self.inner
            .data
            .iter()
            .map(|(id, data)| Task { store: self, id: *id, data })
            .collect()
    }

    /// Not-completed tasks (started ones included) with no blocker left to
    /// finish.
    pub fn all_open_tasks_without_open_blockers(&self) -> Vec<Task<'_>> {
        self.resolve(&self.partitions().open_unblocked)
    }

    /// Not-completed tasks held up by at least one unfinished blocker.
    pub fn all_open_tasks_with_open_blockers(&self) -> Vec<Task<'_>> {
        self.resolve(&self.partitions().open_blocked)
    }

    /// Tasks that are started but not completed. A subset of
    /// [`TaskStore::all_open_tasks`].
    pub fn all_started_tasks(&self) -> Vec<Task<'_>> {
        self.resolve(&self.partitions().started)
    }

    pub fn all_completed_tasks(&self) -> Vec<Task<'_>> {
        self.resolve(&self.partitions().completed)
    }

    /// Every task that is not completed, started ones included.
    pub fn all_open_tasks(&self) -> Vec<Task<'_>> {
        self.resolve(&self.partitions().open)
    }

    /// The dependency graph with each id resolved to its task view.
    pub fn task_graph(&self) -> DependencyGraph<Task<'_>> {
        self.inner.graph.map(|id| self.task(*id))
    }

    /// True if both handles point at the very same snapshot.
    pub(crate) fn is_same(&self, other: &TaskStore) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// View of a task known to be present.
    pub(crate) fn task(&self, id: TaskId) -> Task<'_> {
        Task {
            store: self,
            id,
            data: &self.inner.data[&id],
        }
    }

    fn resolve(&self, ids: &[TaskId]) -> Vec<Task<'_>> {
        ids.iter().map(|id| self.task(*id)).collect()
    }

    fn partitions(&self) -> &Partitions {
        self.inner.partitions.get_or_init(|| {
            let mut partitions = Partitions::default();
            for task in self.all_tasks() {
                if task.status() == Status::Completed {
                    partitions.completed.push(task.id);
                    continue;
                }
                if task.status() == Status::Started {
                    partitions.started.push(task.id);
                }
                partitions.open.push(task.id);
                if task.is_unblocked() {
                    partitions.open_unblocked.push(task.id);
                } else {
                    partitions.open_blocked.push(task.id);
                }
            }
            partitions
        })
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for TaskStore {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
            || (self.inner.graph == other.inner.graph && self.inner.data == other.inner.data)
    }
}

impl Eq for TaskStore {}

impl Hash for TaskStore {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.graph.hash(state);
        self.inner.data.hash(state);
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("graph", &self.inner.graph)
            .field("data", &self.inner.data)
            .finish()
    }
}

/// Read-only view of one task inside one snapshot.
///
/// Related tasks are always resolved against the same snapshot.
#[derive(Clone, Copy)]
pub struct Task<'a> {
    store: &'a TaskStore,
    id: TaskId,
    data: &'a TaskData,
}

impl<'a> Task<'a> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn label(&self) -> &'a str {
        &self.data.label
    }

    pub fn status(&self) -> Status {
        self.data.status
    }

    pub fn data(&self) -> &'a TaskData {
        self.data
    }

    /// The snapshot this view belongs to.
    pub fn store(&self) -> &'a TaskStore {
        self.store
    }

    /// True if none of the direct blockers is still open or started.
    pub fn is_unblocked(&self) -> bool {
        self.store
            .graph()
            .predecessors(&self.id)
            .all(|pred| !self.store.data()[pred].status.is_blocking())
    }

    /// Tasks that block this one, ordered by id.
    pub fn blocking_tasks(&self) -> Vec<Task<'a>> {
        let store = self.store;
        store.graph().predecessors(&self.id).map(|id| store.task(*id)).collect()
    }

    /// Tasks this one blocks, ordered by id.
    pub fn blocked_tasks(&self) -> Vec<Task<'a>> {
        let store = self.store;
        store.graph().successors(&self.id).map(|id| store.task(*id)).collect()
    }
}

impl std::fmt::Debug for Task<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("label", &self.data.label)
            .field("status", &self.data.status)
            .finish()
    }
}

impl PartialEq for Task<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.data == other.data
    }
}

impl Eq for Task<'_> {}

impl PartialOrd for Task<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id).then_with(|| {
            (&self.data.label, self.data.status as u8).cmp(&(&other.data.label, other.data.status as u8))
        })
    }
}

impl Hash for Task<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.data.hash(state);
    }
}
