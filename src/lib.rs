//! Taskdeps: a task dependency store with an acyclic blocks/blocked-by graph.
//!
//! The store keeps immutable snapshots of a dependency graph and its task
//! data. Every change is validated against the whole graph before it becomes
//! the current snapshot, so a committed snapshot never contains a cycle.
//! Snapshots persist to a small versioned text file and can be drawn as a
//! box-drawing layout.
//!
//! # Example
//!
//! ```no_run
//! use taskdeps::{RenderOptions, Store, StoreConfig, render};
//!
//! let store = Store::open(StoreConfig::new("tasks.txt")).unwrap();
//!
//! // Create tasks
//! let design = store.create_task("Write design doc", |_| {}).unwrap().id();
//! let code = store
//!     .create_task("Write code", |task| {
//!         task.blocked_by(design);
//!     })
//!     .unwrap()
//!     .id();
//!
//! // Query ready work
//! let snapshot = store.current();
//! let ready = snapshot.all_open_tasks_without_open_blockers();
//! assert_eq!(ready.len(), 1);
//! assert_eq!(ready[0].id(), design);
//!
//! // Finishing the blocker unblocks the next task
//! store
//!     .mutate_task(design, |task| {
//!         task.complete();
//!     })
//!     .unwrap();
//! assert!(store.current().look_up_by_id(code).unwrap().is_unblocked());
//!
//! for line in render(&store.current().task_graph(), &RenderOptions::new()) {
//!     println!("{}", line);
//! }
//!
//! // Flush to disk
//! store.shutdown().unwrap();
//! ```

mod builder;
mod config;
mod cycle;
mod graph;
mod id;
mod mutation;
mod render;
mod snapshot;
mod storage;
mod store;
mod types;

// Re-export public API
pub use builder::{SetEdit, StatusTransform, TaskBuilder, TaskMutator};
pub use config::{StoreConfig, TASKS_FILE_ENV, default_path};
pub use cycle::find_any_cycle;
pub use graph::{DependencyGraph, GraphBuilder, GraphError, NodeEdges};
pub use id::{ID_LENGTH, ID_RADIX, IdError, TaskId};
pub use render::{RenderOptions, render};
pub use snapshot::{Task, TaskStore};
pub use storage::{FORMAT_VERSION, FormatError, deserialize, read_file, serialize, write_file};
pub use store::{Commit, Removal, SnapshotStream, Store, StoreError};
pub use types::{Status, TaskData};
