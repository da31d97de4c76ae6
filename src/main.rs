//! td - track tasks and the tasks that block them.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use taskdeps::{RenderOptions, Status, Store, StoreConfig, Task, TaskId, TaskMutator, TaskStore, render};

mod cli;

use cli::{Cli, Command, EditArgs};

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskdeps")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("taskdeps.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn get_store_config(cli: &Cli) -> StoreConfig {
    cli.file.clone().map(StoreConfig::new).unwrap_or_else(StoreConfig::from_env)
}

fn format_status(status: Status) -> ColoredString {
    match status {
        Status::Open => "open".green(),
        Status::Started => "started".yellow(),
        Status::Completed => "completed".blue(),
    }
}

fn format_ids(tasks: &[Task<'_>]) -> String {
    tasks.iter().map(|task| task.id().to_string()).collect::<Vec<_>>().join(", ")
}

fn print_task(task: &Task<'_>) {
    let blockers: Vec<Task<'_>> = task
        .blocking_tasks()
        .into_iter()
        .filter(|blocker| blocker.status().is_blocking())
        .collect();
    let waiting = if blockers.is_empty() {
        String::new()
    } else {
        format!(" (blocked by {})", format_ids(&blockers))
    };
    println!(
        "{} {} {}{}",
        format_status(task.status()),
        task.id().to_string().cyan(),
        task.label(),
        waiting.dimmed()
    );
}

/// One task as printed by `list --json`.
#[derive(Serialize)]
struct TaskEntry<'a> {
    id: TaskId,
    label: &'a str,
    status: Status,
    unblocked: bool,
    blocked_by: Vec<TaskId>,
    blocks: Vec<TaskId>,
}

impl<'a> From<&Task<'a>> for TaskEntry<'a> {
    fn from(task: &Task<'a>) -> Self {
        Self {
            id: task.id(),
            label: task.label(),
            status: task.status(),
            unblocked: task.is_unblocked(),
            blocked_by: task.blocking_tasks().iter().map(Task::id).collect(),
            blocks: task.blocked_tasks().iter().map(Task::id).collect(),
        }
    }
}

fn look_up(snapshot: &TaskStore, id: TaskId) -> Task<'_> {
    match snapshot.look_up_by_id(id) {
        Some(task) => task,
        None => {
            eprintln!("{} Task not found: {}", "✗".red(), id);
            std::process::exit(1);
        }
    }
}

fn edit(store: &Store, args: EditArgs) -> Result<()> {
    let EditArgs {
        id,
        label,
        add_blocker,
        remove_blocker,
        set_blockers,
        add_blocked,
        remove_blocked,
    } = args;

    let commit = store
        .mutate_task(id, |task| {
            if let Some(label) = label {
                task.label(label);
            }
            if let Some(blockers) = set_blockers {
                task.set_blockers(blockers);
            }
            for blocker in add_blocker {
                task.add_blocker(blocker);
            }
            for blocker in remove_blocker {
                task.remove_blocker(blocker);
            }
            for blocked in add_blocked {
                task.add_blocked(blocked);
            }
            for blocked in remove_blocked {
                task.remove_blocked(blocked);
            }
        })
        .context("Failed to edit task")?;

    println!("{} Updated: {}", "✓".green(), commit.task().id().to_string().cyan());
    print_task(&commit.task());
    Ok(())
}

fn set_status(store: &Store, id: TaskId, verb: &str, change: fn(&mut TaskMutator) -> &mut TaskMutator) -> Result<()> {
    let commit = store
        .mutate_task(id, |task| {
            change(task);
        })
        .with_context(|| format!("Failed to update task {}", id))?;
    let task = commit.task();
    println!("{} {}: {} {}", "→".blue(), verb, task.id().to_string().cyan(), task.label());
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = get_store_config(&cli);
    let store = Store::open(config).context("Failed to open store")?;

    match cli.command {
        Command::Add {
            label,
            blocked_by,
            blocks,
            started,
        } => {
            let commit = store
                .create_task(label, |task| {
                    for blocker in blocked_by {
                        task.blocked_by(blocker);
                    }
                    for blocked in blocks {
                        task.blocks(blocked);
                    }
                    if started {
                        task.status(Status::Started);
                    }
                })
                .context("Failed to create task")?;

            let task = commit.task();
            println!("{} Created: {} {}", "✓".green(), task.id().to_string().cyan(), task.label());
        }

        Command::Edit(args) => edit(&store, args)?,

        Command::Start { id } => set_status(&store, id, "Started", TaskMutator::start)?,

        Command::Stop { id } => set_status(&store, id, "Stopped", TaskMutator::stop)?,

        Command::Complete { id } => set_status(&store, id, "Completed", TaskMutator::complete)?,

        Command::Reopen { id } => set_status(&store, id, "Reopened", TaskMutator::reopen)?,

        Command::Delete { id } => match store.delete_task(id).context("Failed to delete task")? {
            Some(removal) => {
                let task = removal.task();
                println!("{} Deleted: {} {}", "✓".green(), task.id().to_string().cyan(), task.label());
            }
            None => {
                eprintln!("{} Task not found: {}", "✗".red(), id);
                std::process::exit(1);
            }
        },

        Command::Show { id } => {
            let snapshot = store.current();
            let task = look_up(&snapshot, id);

            println!("{}: {}", "ID".bold(), task.id().to_string().cyan());
            println!("{}: {}", "Label".bold(), task.label());
            println!("{}: {}", "Status".bold(), format_status(task.status()));
            println!("{}: {}", "Unblocked".bold(), if task.is_unblocked() { "yes" } else { "no" });
            let blockers = task.blocking_tasks();
            if !blockers.is_empty() {
                println!("{}:", "Blocked by".bold());
                for blocker in &blockers {
                    print!("  ");
                    print_task(blocker);
                }
            }
            let blocked = task.blocked_tasks();
            if !blocked.is_empty() {
                println!("{}:", "Blocks".bold());
                for other in &blocked {
                    print!("  ");
                    print_task(other);
                }
            }
            return Ok(());
        }

        Command::List {
            all,
            blocked,
            completed,
            started,
            json,
        } => {
            let snapshot = store.current();
            let tasks = if all {
                snapshot.all_tasks()
            } else if blocked {
                snapshot.all_open_tasks_with_open_blockers()
            } else if completed {
                snapshot.all_completed_tasks()
            } else if started {
                snapshot.all_started_tasks()
            } else {
                snapshot.all_open_tasks_without_open_blockers()
            };

            if json {
                let entries: Vec<TaskEntry<'_>> = tasks.iter().map(TaskEntry::from).collect();
                let text = serde_json::to_string_pretty(&entries).context("Failed to serialize tasks")?;
                println!("{}", text);
            } else if tasks.is_empty() {
                println!("{}", "No tasks found".dimmed());
            } else {
                for task in &tasks {
                    print_task(task);
                }
            }
            return Ok(());
        }

        Command::Graph {
            all,
            related,
            blockers_of,
            ids,
        } => {
            let snapshot = store.current();
            let options = RenderOptions::new()
                .include_completed(all)
                .related_to(related)
                .blockers_of(blockers_of)
                .show_ids(ids);
            let lines = render(&snapshot.task_graph(), &options);
            if lines.is_empty() {
                println!("{}", "No tasks to draw".dimmed());
            }
            for line in lines {
                println!("{}", line);
            }
            return Ok(());
        }
    }

    store.shutdown().context("Failed to save tasks")
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
