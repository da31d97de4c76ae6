//! CLI argument parsing for taskdeps.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use taskdeps::TaskId;

#[derive(Parser)]
#[command(
    name = "td",
    about = "Track tasks and the tasks that block them",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/taskdeps/logs/taskdeps.log"
)]
pub struct Cli {
    /// Task file (default: $TASKS_FILE, then ~/.taskdeps/tasks.txt)
    #[arg(short = 'f', long, global = true)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new task
    Add {
        /// Task label
        label: String,

        /// Tasks that must be completed first (comma-separated)
        #[arg(short = 'b', long, value_delimiter = ',')]
        blocked_by: Vec<TaskId>,

        /// Tasks this one blocks (comma-separated)
        #[arg(short = 'B', long, value_delimiter = ',')]
        blocks: Vec<TaskId>,

        /// Mark the task as started right away
        #[arg(short, long)]
        started: bool,
    },

    /// Change a task's label or dependencies
    Edit(EditArgs),

    /// Mark a task as started
    Start {
        /// Task ID
        id: TaskId,
    },

    /// Put a started task back to open
    Stop {
        /// Task ID
        id: TaskId,
    },

    /// Mark a task as completed
    Complete {
        /// Task ID
        id: TaskId,
    },

    /// Put a completed task back to open
    Reopen {
        /// Task ID
        id: TaskId,
    },

    /// Delete a task and its dependency edges
    Delete {
        /// Task ID
        id: TaskId,
    },

    /// Show one task with its blockers
    Show {
        /// Task ID
        id: TaskId,
    },

    /// List tasks (default: open tasks that are ready to work on)
    List {
        /// List every task
        #[arg(short, long, conflicts_with_all = ["blocked", "completed", "started"])]
        all: bool,

        /// List open tasks waiting on a blocker
        #[arg(long, conflicts_with_all = ["completed", "started"])]
        blocked: bool,

        /// List completed tasks
        #[arg(long, conflicts_with = "started")]
        completed: bool,

        /// List started tasks
        #[arg(long)]
        started: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Draw the dependency graph
    Graph {
        /// Include completed tasks
        #[arg(short, long)]
        all: bool,

        /// Only tasks connected to these (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        related: Vec<TaskId>,

        /// Only these tasks and what blocks them (comma-separated)
        #[arg(long, value_delimiter = ',')]
        blockers_of: Vec<TaskId>,

        /// Show task IDs next to labels
        #[arg(short, long)]
        ids: bool,
    },
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: TaskId,

    /// New label
    #[arg(short, long)]
    pub label: Option<String>,

    /// Add blockers (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub add_blocker: Vec<TaskId>,

    /// Remove blockers (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub remove_blocker: Vec<TaskId>,

    /// Replace all blockers (comma-separated, empty to clear)
    #[arg(long, value_delimiter = ',', num_args = 0.., conflicts_with_all = ["add_blocker", "remove_blocker"])]
    pub set_blockers: Option<Vec<TaskId>>,

    /// Add tasks this one blocks (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub add_blocked: Vec<TaskId>,

    /// Stop blocking these tasks (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub remove_blocked: Vec<TaskId>,
}
