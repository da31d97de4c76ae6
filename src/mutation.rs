//! Turning staged changes into validated candidate snapshots.
//!
//! Each function reads an old snapshot, builds a candidate graph and data map
//! from it, and validates the candidate. The old snapshot is never touched;
//! publishing the candidate is up to the caller.

use crate::builder::{SetEdit, TaskBuilder, TaskMutator};
use crate::cycle::find_any_cycle;
use crate::graph::{DependencyGraph, GraphBuilder};
use crate::id::TaskId;
use crate::snapshot::TaskStore;
use crate::store::StoreError;
use crate::types::TaskData;
use std::collections::{BTreeMap, BTreeSet};

/// Candidate with a new task built from `builder`, plus the new task's id.
pub(crate) fn apply_create(old: &TaskStore, builder: TaskBuilder) -> Result<(TaskStore, TaskId), StoreError> {
    ensure_known(old, builder.blocked_by.iter().chain(builder.blocks.iter()).copied())?;

    let id = TaskId::generate(|candidate| old.graph().contains(candidate));

    let mut graph = old.graph().to_builder();
    graph.add_node(id);
    for blocker in &builder.blocked_by {
        graph.add_edge(*blocker, id)?;
    }
    for blocked in &builder.blocks {
        graph.add_edge(id, *blocked)?;
    }

    let mut data = old.data().clone();
    data.insert(id, TaskData::new(builder.label, builder.status));

    Ok((validate(graph.build(), data)?, id))
}

/// Candidate with the task `id` edited as `mutator` describes.
pub(crate) fn apply_mutate(old: &TaskStore, id: TaskId, mutator: TaskMutator) -> Result<TaskStore, StoreError> {
    let current = old.data().get(&id).ok_or(StoreError::UnknownTask(id))?;
    ensure_known(old, mutator.blocking.referenced().chain(mutator.blocked.referenced()))?;

    let updated = TaskData {
        label: mutator.label.unwrap_or_else(|| current.label.clone()),
        status: mutator
            .status
            .map_or(current.status, |transform| transform(current.status)),
    };

    let mut graph = old.graph().to_builder();
    let blockers: BTreeSet<TaskId> = old.graph().predecessors(&id).copied().collect();
    rewire(&mut graph, &blockers, &mutator.blocking, |other| (other, id))?;
    let blocked: BTreeSet<TaskId> = old.graph().successors(&id).copied().collect();
    rewire(&mut graph, &blocked, &mutator.blocked, |other| (id, other))?;

    let mut data = old.data().clone();
    data.insert(id, updated);

    validate(graph.build(), data)
}

/// Candidate without the task `id`, or `None` if there is no such task.
pub(crate) fn apply_delete(old: &TaskStore, id: TaskId) -> Result<Option<TaskStore>, StoreError> {
    if !old.contains(id) {
        return Ok(None);
    }

    let graph = old.graph().remove_node(&id);
    let mut data = old.data().clone();
    data.remove(&id);

    validate(graph, data).map(Some)
}

/// Check a candidate and turn it into a snapshot.
pub(crate) fn validate(
    graph: DependencyGraph<TaskId>,
    data: BTreeMap<TaskId, TaskData>,
) -> Result<TaskStore, StoreError> {
    if !TaskStore::is_consistent(&graph, &data) {
        return Err(StoreError::InconsistentStore);
    }
    if let Some(cycle) = find_any_cycle(&graph) {
        return Err(StoreError::CyclicalDependency(cycle));
    }
    Ok(TaskStore::new(graph, data))
}

/// Apply `edit` to one neighbour set of a task. `edge` maps a neighbour to the
/// `(from, to)` pair of the edge joining it to the task.
fn rewire(
    graph: &mut GraphBuilder<TaskId>,
    current: &BTreeSet<TaskId>,
    edit: &SetEdit,
    edge: impl Fn(TaskId) -> (TaskId, TaskId),
) -> Result<(), StoreError> {
    if edit.is_empty() {
        return Ok(());
    }
    let target = edit.apply(current.iter().copied());
    for gone in current.difference(&target) {
        let (from, to) = edge(*gone);
        graph.remove_edge(&from, &to)?;
    }
    for added in target.difference(current) {
        let (from, to) = edge(*added);
        graph.add_edge(from, to)?;
    }
    Ok(())
}

fn ensure_known(store: &TaskStore, ids: impl IntoIterator<Item = TaskId>) -> Result<(), StoreError> {
    for id in ids {
        if !store.contains(id) {
            return Err(StoreError::UnknownTask(id));
        }
    }
    Ok(())
}
