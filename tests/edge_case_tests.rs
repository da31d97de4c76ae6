//! Integration tests for edge cases.
//!
//! Tests boundary values, unicode handling, rendering and unusual inputs.

mod common;

use common::TestEnv;
use std::collections::BTreeSet;
use taskdeps::{RenderOptions, Status, TaskId, render};

// =============================================================================
// Empty Store Operations
// =============================================================================

#[test]
fn test_empty_store_queries() {
    let env = TestEnv::new();
    let snapshot = env.store.current();

    assert!(snapshot.is_empty());
    assert!(snapshot.all_tasks().is_empty());
    assert!(snapshot.all_open_tasks().is_empty());
    assert!(snapshot.all_open_tasks_with_open_blockers().is_empty());
    assert!(snapshot.all_completed_tasks().is_empty());
    assert!(snapshot.all_started_tasks().is_empty());
    assert!(snapshot.task_graph().is_empty());
}

#[test]
fn test_empty_store_renders_nothing() {
    let env = TestEnv::new();
    let lines = render(&env.store.current().task_graph(), &RenderOptions::new());
    assert!(lines.is_empty());
}

// =============================================================================
// Labels
// =============================================================================

#[test]
fn test_unicode_label() {
    let env = TestEnv::new();
    let id = env.create_task("日本語のタスク 🚀");

    let snapshot = env.store.current();
    assert_eq!(snapshot.look_up_by_id(id).unwrap().label(), "日本語のタスク 🚀");
}

#[test]
fn test_empty_label() {
    let env = TestEnv::new();
    let id = env.create_task("");
    assert_eq!(env.store.current().look_up_by_id(id).unwrap().label(), "");
}

#[test]
fn test_very_long_label() {
    let env = TestEnv::new();
    let label = "x".repeat(10_000);
    let id = env.create_task(&label);
    assert_eq!(env.store.current().look_up_by_id(id).unwrap().label().len(), 10_000);
}

// =============================================================================
// Ids
// =============================================================================

#[test]
fn test_many_tasks_get_distinct_ids() {
    let env = TestEnv::new();
    let ids: BTreeSet<TaskId> = (0..500).map(|i| env.create_task(&format!("task {}", i))).collect();

    assert_eq!(ids.len(), 500);
    assert_eq!(env.total_count(), 500);
    for id in &ids {
        assert_eq!(id.to_string().len(), 4);
    }
}

// =============================================================================
// Staged Edits
// =============================================================================

#[test]
fn test_set_blockers_to_empty_clears() {
    let env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");
    let c = env.create_blocked("C", &[a, b]);

    env.store
        .mutate_task(c, |task| {
            task.set_blockers([]);
        })
        .unwrap();

    assert!(env.edges().is_empty());
    env.assert_ready(c);
}

#[test]
fn test_add_then_remove_blocker_cancels() {
    let env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");

    env.store
        .mutate_task(b, |task| {
            task.add_blocker(a).remove_blocker(a);
        })
        .unwrap();

    assert!(env.edges().is_empty());
}

#[test]
fn test_removing_absent_edge_is_harmless() {
    let env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");

    env.store
        .mutate_task(b, |task| {
            task.remove_blocker(a).remove_blocked(a);
        })
        .unwrap();

    assert!(env.edges().is_empty());
}

#[test]
fn test_adding_existing_edge_is_harmless() {
    let env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_blocked("B", &[a]);

    env.store
        .mutate_task(b, |task| {
            task.add_blocker(a);
        })
        .unwrap();

    assert_eq!(env.edges(), vec![(a, b)]);
}

#[test]
fn test_update_status_sees_committed_status() {
    let env = TestEnv::new();
    let id = env.create_task("A");
    env.start(id);

    env.store
        .mutate_task(id, |task| {
            task.update_status(|status| if status == Status::Started { Status::Completed } else { status });
        })
        .unwrap();

    assert_eq!(env.status(id), Status::Completed);
}

#[test]
fn test_create_started_task() {
    let env = TestEnv::new();
    let commit = env
        .store
        .create_task("Already going", |task| {
            task.status(Status::Started);
        })
        .unwrap();

    let id = commit.task().id();
    assert_eq!(commit.task().status(), Status::Started);
    env.assert_ready(id);
    assert!(env.blocked_ids().is_empty());
}

#[test]
fn test_label_only_mutation_keeps_edges() {
    let env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_blocked("B", &[a]);

    let commit = env
        .store
        .mutate_task(b, |task| {
            task.label("B renamed");
        })
        .unwrap();

    assert_eq!(commit.task().label(), "B renamed");
    assert_eq!(commit.before().look_up_by_id(b).unwrap().label(), "B");
    assert_eq!(env.edges(), vec![(a, b)]);
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
fn test_render_two_task_chain() {
    let env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_blocked("B", &[a]);

    let lines = render(&env.store.current().task_graph(), &RenderOptions::new());
    assert_eq!(lines, vec!["☐ A", "│", "☐ B"]);

    env.complete(b);
    let lines = render(&env.store.current().task_graph(), &RenderOptions::new());
    assert_eq!(lines, vec!["☐ A"]);

    let lines = render(
        &env.store.current().task_graph(),
        &RenderOptions::new().include_completed(true).show_ids(true),
    );
    assert_eq!(lines, vec![format!("☐ {} A", a), "│".to_string(), format!("☑ {} B", b)]);
}

#[test]
fn test_render_blockers_of() {
    let env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_blocked("B", &[a]);
    env.create_blocked("C", &[b]);
    env.create_task("Unrelated");

    let lines = render(
        &env.store.current().task_graph(),
        &RenderOptions::new().blockers_of([b]),
    );
    assert_eq!(lines, vec!["☐ A", "│", "☐ B"]);
}

#[test]
fn test_render_multiline_label_stays_on_one_line() {
    let env = TestEnv::new();
    env.create_task("first\nsecond");

    let lines = render(&env.store.current().task_graph(), &RenderOptions::new());
    assert_eq!(lines, vec!["☐ first second"]);
}
