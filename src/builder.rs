//! Staging objects for creating and editing tasks.
//!
//! A [`TaskBuilder`] or [`TaskMutator`] only records intended changes. The
//! store hands one to a caller-supplied closure, then applies what was staged
//! in a single validated commit.
//!
//! # Example
//!
//! ```ignore
//! store.create_task("Write tests", |task| {
//!     task.blocked_by(design_id).status(Status::Started);
//! })?;
//!
//! store.mutate_task(design_id, |task| {
//!     task.label("Write the design doc").complete();
//! })?;
//! ```

use crate::id::TaskId;
use crate::types::Status;
use std::collections::BTreeSet;
use std::fmt;

/// Staged changes for a task that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskBuilder {
    pub(crate) label: String,
    pub(crate) status: Status,
    pub(crate) blocked_by: BTreeSet<TaskId>,
    pub(crate) blocks: BTreeSet<TaskId>,
}

impl TaskBuilder {
    pub(crate) fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            status: Status::Open,
            blocked_by: BTreeSet::new(),
            blocks: BTreeSet::new(),
        }
    }

    /// Replace the label given at creation.
    pub fn label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = label.into();
        self
    }

    /// Set the initial status (default: open).
    pub fn status(&mut self, status: Status) -> &mut Self {
        self.status = status;
        self
    }

    /// The new task will be blocked by `blocker`.
    pub fn blocked_by(&mut self, blocker: TaskId) -> &mut Self {
        self.blocked_by.insert(blocker);
        self
    }

    /// The new task will block `blocked`.
    pub fn blocks(&mut self, blocked: TaskId) -> &mut Self {
        self.blocks.insert(blocked);
        self
    }
}

/// A staged edit to one set of neighbours.
///
/// Either replaces the set outright or adds and removes individual ids. Adding
/// an id cancels a pending removal of it and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetEdit {
    overwrite: Option<BTreeSet<TaskId>>,
    add: BTreeSet<TaskId>,
    remove: BTreeSet<TaskId>,
}

impl SetEdit {
    pub fn is_empty(&self) -> bool {
        self.overwrite.is_none() && self.add.is_empty() && self.remove.is_empty()
    }

    pub(crate) fn insert(&mut self, id: TaskId) {
        self.remove.remove(&id);
        self.add.insert(id);
    }

    pub(crate) fn delete(&mut self, id: TaskId) {
        self.add.remove(&id);
        self.remove.insert(id);
    }

    pub(crate) fn replace(&mut self, ids: impl IntoIterator<Item = TaskId>) {
        self.overwrite = Some(ids.into_iter().collect());
        self.add.clear();
        self.remove.clear();
    }

    /// The set that results from applying this edit to `current`.
    pub fn apply(&self, current: impl IntoIterator<Item = TaskId>) -> BTreeSet<TaskId> {
        let mut result: BTreeSet<TaskId> = match &self.overwrite {
            Some(ids) => ids.clone(),
            None => current.into_iter().collect(),
        };
        result.extend(self.add.iter().copied());
        result.retain(|id| !self.remove.contains(id));
        result
    }

    /// Every id this edit mentions.
    pub(crate) fn referenced(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.overwrite
            .iter()
            .flatten()
            .chain(self.add.iter())
            .chain(self.remove.iter())
            .copied()
    }
}

/// A staged status change, applied to the status the task has at commit time.
pub type StatusTransform = Box<dyn Fn(Status) -> Status + Send>;

/// Staged changes for an existing task.
#[derive(Default)]
pub struct TaskMutator {
    pub(crate) label: Option<String>,
    pub(crate) status: Option<StatusTransform>,
    pub(crate) blocking: SetEdit,
    pub(crate) blocked: SetEdit,
}

impl TaskMutator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replace the label.
    pub fn label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = Some(label.into());
        self
    }

    /// Derive the new status from the current one. The last call wins.
    pub fn update_status(&mut self, transform: impl Fn(Status) -> Status + Send + 'static) -> &mut Self {
        self.status = Some(Box::new(transform));
        self
    }

    /// Set the status regardless of the current one.
    pub fn set_status(&mut self, status: Status) -> &mut Self {
        self.update_status(move |_| status)
    }

    pub fn start(&mut self) -> &mut Self {
        self.update_status(Status::start)
    }

    /// Started tasks go back to open; anything else is left alone.
    pub fn stop(&mut self) -> &mut Self {
        self.update_status(Status::stop)
    }

    pub fn complete(&mut self) -> &mut Self {
        self.update_status(Status::complete)
    }

    /// Completed tasks go back to open; anything else is left alone.
    pub fn reopen(&mut self) -> &mut Self {
        self.update_status(Status::reopen)
    }

    /// Make `blocker` block this task.
    pub fn add_blocker(&mut self, blocker: TaskId) -> &mut Self {
        self.blocking.insert(blocker);
        self
    }

    /// Stop `blocker` from blocking this task.
    pub fn remove_blocker(&mut self, blocker: TaskId) -> &mut Self {
        self.blocking.delete(blocker);
        self
    }

    /// Replace the full set of tasks blocking this one.
    pub fn set_blockers(&mut self, blockers: impl IntoIterator<Item = TaskId>) -> &mut Self {
        self.blocking.replace(blockers);
        self
    }

    /// Make this task block `blocked`.
    pub fn add_blocked(&mut self, blocked: TaskId) -> &mut Self {
        self.blocked.insert(blocked);
        self
    }

    /// Stop this task from blocking `blocked`.
    pub fn remove_blocked(&mut self, blocked: TaskId) -> &mut Self {
        self.blocked.delete(blocked);
        self
    }

    /// Replace the full set of tasks this one blocks.
    pub fn set_blocked(&mut self, blocked: impl IntoIterator<Item = TaskId>) -> &mut Self {
        self.blocked.replace(blocked);
        self
    }
}

impl fmt::Debug for TaskMutator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskMutator")
            .field("label", &self.label)
            .field("status", &self.status.as_ref().map(|_| "<transform>"))
            .field("blocking", &self.blocking)
            .field("blocked", &self.blocked)
            .finish()
    }
}
