//! Storage layer: the versioned, line-oriented task file.
//!
//! ```text
//! # version 2
//! # tasks
//! <id>;<status>;<escaped label>;
//! # dependencies
//! <id>;<blocker id>,<blocker id>,...;
//! ```
//!
//! Labels escape backslash, newline and `;` with a backslash. Only tasks that
//! have blockers get a dependencies row. Rows are written in id order.

use crate::cycle::find_any_cycle;
use crate::graph::{DependencyGraph, GraphError};
use crate::id::TaskId;
use crate::snapshot::TaskStore;
use crate::types::{Status, TaskData};
use eyre::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Newest format version this build reads, and the one it writes.
pub const FORMAT_VERSION: u32 = 2;

const VERSION_PREFIX: &str = "# version ";

const TASKS_HEADER: &str = "# tasks";

const DEPENDENCIES_HEADER: &str = "# dependencies";

const FIELD_DELIMITER: char = ';';

const LIST_DELIMITER: char = ',';

/// Errors in the contents of a task file. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Content appeared before the `# version` line.
    MissingVersion { line: usize },
    /// The file was written by a newer format version.
    IncompatibleVersion { found: u32, supported: u32 },
    /// A dependency row names a task that was never declared.
    MissingTaskData { line: usize, id: TaskId },
    /// The same task id is declared twice.
    DuplicateTask { line: usize, id: TaskId },
    /// The same blocker is listed twice for a task.
    DuplicateEdge { line: usize, blocker: TaskId, blocked: TaskId },
    /// A field that should hold a task id does not.
    InvalidId { line: usize, text: String },
    /// Unknown status token.
    InvalidStatus { line: usize, token: String },
    /// Anything else that does not fit the format.
    MalformedLine { line: usize, reason: String },
    /// The dependencies form a cycle.
    CyclicDependencies(Vec<TaskId>),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::MissingVersion { line } => {
                write!(f, "line {}: expected '{}<N>' before any content", line, VERSION_PREFIX)
            }
            FormatError::IncompatibleVersion { found, supported } => write!(
                f,
                "file format version {} is newer than the supported version {}",
                found, supported
            ),
            FormatError::MissingTaskData { line, id } => {
                write!(f, "line {}: dependency on undeclared task {}", line, id)
            }
            FormatError::DuplicateTask { line, id } => write!(f, "line {}: task {} declared twice", line, id),
            FormatError::DuplicateEdge { line, blocker, blocked } => {
                write!(f, "line {}: {} listed twice as a blocker of {}", line, blocker, blocked)
            }
            FormatError::InvalidId { line, text } => write!(f, "line {}: invalid task id '{}'", line, text),
            FormatError::InvalidStatus { line, token } => write!(f, "line {}: invalid status '{}'", line, token),
            FormatError::MalformedLine { line, reason } => write!(f, "line {}: {}", line, reason),
            FormatError::CyclicDependencies(cycle) => {
                let path: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
                write!(f, "dependencies form a cycle: {}", path.join(" -> "))
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// Load a snapshot from `path`. A missing file is an empty store.
pub fn read_file(path: &Path) -> Result<TaskStore> {
    if !path.exists() {
        log::info!("No task file at {}, starting empty", path.display());
        return Ok(TaskStore::empty());
    }
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    deserialize(&text)
        .map_err(|e| eyre::eyre!(e))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Replace the contents of `path` with `store`.
///
/// Writes a sibling temporary file and renames it over `path`, so readers see
/// either the old contents or the new ones.
pub fn write_file(path: &Path, store: &TaskStore) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("tmp");
    let mut file = File::create(&tmp_path).context("Failed to create temporary task file")?;
    file.write_all(serialize(store).as_bytes())
        .context("Failed to write temporary task file")?;
    file.sync_all().context("Failed to sync temporary task file")?;
    fs::rename(&tmp_path, path).with_context(|| format!("Failed to replace {}", path.display()))?;

    log::info!("Wrote {} tasks to {}", store.len(), path.display());
    Ok(())
}

/// Render `store` in the task file format.
pub fn serialize(store: &TaskStore) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}{}\n", VERSION_PREFIX, FORMAT_VERSION));

    out.push_str(TASKS_HEADER);
    out.push('\n');
    for (id, data) in store.data() {
        out.push_str(&format!(
            "{}{d}{}{d}{}{d}\n",
            id,
            status_token(data.status),
            escape(&data.label),
            d = FIELD_DELIMITER
        ));
    }

    out.push_str(DEPENDENCIES_HEADER);
    out.push('\n');
    for id in store.graph().contents() {
        let blockers: Vec<String> = store.graph().predecessors(id).map(|b| b.to_string()).collect();
        if blockers.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "{}{d}{}{d}\n",
            id,
            blockers.join(&LIST_DELIMITER.to_string()),
            d = FIELD_DELIMITER
        ));
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Tasks,
    Dependencies,
}

/// Parse the task file format.
pub fn deserialize(text: &str) -> Result<TaskStore, FormatError> {
    let mut section = Section::Preamble;
    let mut version: Option<u32> = None;
    let mut data: BTreeMap<TaskId, TaskData> = BTreeMap::new();
    // (blocker, blocked, line)
    let mut edges: Vec<(TaskId, TaskId, usize)> = Vec::new();
    let mut rows: Vec<(TaskId, usize)> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }

        if let Some(rest) = raw.strip_prefix(VERSION_PREFIX) {
            if version.is_some() {
                return Err(malformed(line, "duplicate version line"));
            }
            let found: u32 = rest
                .trim()
                .parse()
                .map_err(|_| malformed(line, format!("invalid version '{}'", rest.trim())))?;
            if found > FORMAT_VERSION {
                return Err(FormatError::IncompatibleVersion {
                    found,
                    supported: FORMAT_VERSION,
                });
            }
            version = Some(found);
            continue;
        }

        if version.is_none() {
            return Err(FormatError::MissingVersion { line });
        }

        match raw.trim_end() {
            TASKS_HEADER => {
                section = Section::Tasks;
                continue;
            }
            DEPENDENCIES_HEADER => {
                section = Section::Dependencies;
                continue;
            }
            _ => {}
        }

        let fields = split_fields(raw, line)?;
        match section {
            Section::Preamble => return Err(malformed(line, "content outside of any section")),
            Section::Tasks => {
                let [id, status, label] = fields.as_slice() else {
                    return Err(malformed(line, format!("expected 3 fields, found {}", fields.len())));
                };
                let id = parse_id(id, line)?;
                let status = parse_status(status, line)?;
                if data.insert(id, TaskData::new(label.clone(), status)).is_some() {
                    return Err(FormatError::DuplicateTask { line, id });
                }
            }
            Section::Dependencies => {
                let (id, blockers) = match fields.as_slice() {
                    [id] => (id, ""),
                    [id, blockers] => (id, blockers.as_str()),
                    _ => return Err(malformed(line, format!("expected 2 fields, found {}", fields.len()))),
                };
                let blocked = parse_id(id, line)?;
                rows.push((blocked, line));
                for blocker in blockers.split(LIST_DELIMITER).filter(|s| !s.is_empty()) {
                    edges.push((parse_id(blocker, line)?, blocked, line));
                }
            }
        }
    }

    if let Some(&(id, line)) = rows.iter().find(|(id, _)| !data.contains_key(id)) {
        return Err(FormatError::MissingTaskData { line, id });
    }

    let mut graph = DependencyGraph::new().to_builder();
    for id in data.keys() {
        graph.add_node(*id);
    }
    let mut seen: BTreeSet<(TaskId, TaskId)> = BTreeSet::new();
    for (blocker, blocked, line) in edges {
        graph
            .add_edge(blocker, blocked)
            .map_err(|GraphError::UnknownNode(id)| FormatError::MissingTaskData { line, id })?;
        if !seen.insert((blocker, blocked)) {
            return Err(FormatError::DuplicateEdge { line, blocker, blocked });
        }
    }
    let graph = graph.build();

    if let Some(cycle) = find_any_cycle(&graph) {
        return Err(FormatError::CyclicDependencies(cycle));
    }

    Ok(TaskStore::new(graph, data))
}

fn status_token(status: Status) -> &'static str {
    match status {
        Status::Open => "open",
        Status::Started => "started",
        Status::Completed => "complete",
    }
}

fn parse_status(token: &str, line: usize) -> Result<Status, FormatError> {
    match token {
        "open" | "false" => Ok(Status::Open),
        "started" => Ok(Status::Started),
        "complete" | "true" => Ok(Status::Completed),
        _ => Err(FormatError::InvalidStatus {
            line,
            token: token.to_string(),
        }),
    }
}

fn parse_id(text: &str, line: usize) -> Result<TaskId, FormatError> {
    text.trim().parse().map_err(|_| FormatError::InvalidId {
        line,
        text: text.to_string(),
    })
}

fn malformed(line: usize, reason: impl Into<String>) -> FormatError {
    FormatError::MalformedLine {
        line,
        reason: reason.into(),
    }
}

fn escape(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            FIELD_DELIMITER => {
                out.push('\\');
                out.push(FIELD_DELIMITER);
            }
            other => out.push(other),
        }
    }
    out
}

/// Split a row on unescaped delimiters and unescape each field. A trailing
/// delimiter terminates the row rather than starting an empty field.
fn split_fields(raw: &str, line: usize) -> Result<Vec<String>, FormatError> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => field.push('\n'),
                Some(escaped) => field.push(escaped),
                None => return Err(malformed(line, "dangling escape at end of line")),
            },
            FIELD_DELIMITER => fields.push(std::mem::take(&mut field)),
            other => field.push(other),
        }
    }
    fields.push(field);
    if fields.len() > 1 && fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    Ok(fields)
}
