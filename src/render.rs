//! Box-drawing layout of a task graph.
//!
//! Tasks are drawn one per line in topological order, blockers first. Each
//! task sits in a column; an edge line under a task connects it to the
//! columns of the tasks it blocks. Columns that still carry an edge towards a
//! task further down are drawn with `╎` until that task is reached.
//!
//! ```text
//! ☐ design
//! ├┐
//! ╎☐ backend
//! ╎│
//! ☐╎ frontend
//! └┤
//!  ☐ release
//! ```

use crate::graph::DependencyGraph;
use crate::id::TaskId;
use crate::snapshot::Task;
use crate::types::Status;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

const OPEN_GLYPH: char = '☐';

const COMPLETED_GLYPH: char = '☑';

const PENDING_GLYPH: char = '╎';

/// Which part of the graph to draw, and how.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Draw completed tasks too
    pub include_completed: bool,

    /// If non-empty, only draw tasks connected to one of these, in either
    /// direction
    pub related_to: BTreeSet<TaskId>,

    /// If non-empty, only draw these tasks and everything that transitively
    /// blocks them
    pub blockers_of: BTreeSet<TaskId>,

    /// Prefix each label with the task id
    pub show_ids: bool,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_completed(mut self, include: bool) -> Self {
        self.include_completed = include;
        self
    }

    pub fn related_to(mut self, ids: impl IntoIterator<Item = TaskId>) -> Self {
        self.related_to.extend(ids);
        self
    }

    pub fn blockers_of(mut self, ids: impl IntoIterator<Item = TaskId>) -> Self {
        self.blockers_of.extend(ids);
        self
    }

    pub fn show_ids(mut self, show: bool) -> Self {
        self.show_ids = show;
        self
    }
}

/// Lay out `graph` as display lines.
///
/// Ties in the topological order go to the lower id. Ids in the filters that
/// are not part of `graph` are ignored.
pub fn render(graph: &DependencyGraph<Task<'_>>, options: &RenderOptions) -> Vec<String> {
    let visible = filter(graph, options);
    let order = topological_order(&visible);
    log::debug!("Rendering {} of {} tasks", order.len(), graph.len());
    Layout::default().draw(&visible, &order, options.show_ids)
}

fn filter<'a>(graph: &DependencyGraph<Task<'a>>, options: &RenderOptions) -> DependencyGraph<Task<'a>> {
    let by_id: BTreeMap<TaskId, Task<'a>> = graph.contents().map(|task| (task.id(), *task)).collect();
    let seeds = |ids: &BTreeSet<TaskId>| -> Vec<Task<'a>> { ids.iter().filter_map(|id| by_id.get(id).copied()).collect() };

    let mut keep: Option<BTreeSet<TaskId>> = None;
    if !options.related_to.is_empty() {
        keep = Some(reachable(graph, seeds(&options.related_to), true));
    }
    if !options.blockers_of.is_empty() {
        let blockers = reachable(graph, seeds(&options.blockers_of), false);
        keep = Some(match keep {
            Some(related) => related.intersection(&blockers).copied().collect(),
            None => blockers,
        });
    }

    graph.retain(|task| {
        keep.as_ref().is_none_or(|ids| ids.contains(&task.id()))
            && (options.include_completed || task.status() != Status::Completed)
    })
}

/// Breadth-first closure of `seeds` over predecessor edges, or over edges in
/// both directions when `undirected`.
fn reachable<'a>(graph: &DependencyGraph<Task<'a>>, seeds: Vec<Task<'a>>, undirected: bool) -> BTreeSet<TaskId> {
    let mut reached: BTreeSet<TaskId> = seeds.iter().map(Task::id).collect();
    let mut queue: VecDeque<Task<'a>> = seeds.into();
    while let Some(task) = queue.pop_front() {
        let successors = graph.successors(&task).filter(|_| undirected);
        for next in graph.predecessors(&task).chain(successors) {
            if reached.insert(next.id()) {
                queue.push_back(*next);
            }
        }
    }
    reached
}

/// Kahn's algorithm, always taking the lowest ready id next.
fn topological_order<'a>(graph: &DependencyGraph<Task<'a>>) -> Vec<Task<'a>> {
    let mut waiting: BTreeMap<TaskId, usize> = graph
        .contents()
        .map(|task| (task.id(), graph.predecessors(task).count()))
        .collect();
    let mut ready: BTreeSet<Task<'a>> = graph
        .contents()
        .filter(|task| graph.predecessors(task).next().is_none())
        .copied()
        .collect();

    let mut order = Vec::with_capacity(graph.len());
    while let Some(task) = ready.pop_first() {
        order.push(task);
        for next in graph.successors(&task) {
            if let Some(count) = waiting.get_mut(&next.id()) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(*next);
                }
            }
        }
    }
    order
}

#[derive(Debug, Default)]
struct Layout {
    /// Column of every task placed so far
    columns: BTreeMap<TaskId, usize>,
    /// Columns reserved for tasks not drawn yet
    pending: BTreeSet<usize>,
    lines: Vec<String>,
}

impl Layout {
    fn draw<'a>(mut self, graph: &DependencyGraph<Task<'a>>, order: &[Task<'a>], show_ids: bool) -> Vec<String> {
        let rank: BTreeMap<TaskId, usize> = order.iter().enumerate().map(|(i, task)| (task.id(), i)).collect();

        for task in order {
            let column = self.claim(task.id());
            self.node_line(task, column, show_ids);

            let mut successors: Vec<&Task<'a>> = graph.successors(task).collect();
            if successors.is_empty() {
                continue;
            }
            successors.sort_by_key(|successor| Reverse(rank.get(&successor.id()).copied()));

            let mut targets = BTreeSet::new();
            let mut fresh = BTreeSet::new();
            let mut next = column;
            for successor in successors {
                if let Some(&assigned) = self.columns.get(&successor.id()) {
                    targets.insert(assigned);
                    continue;
                }
                next = self.free_column(next);
                self.columns.insert(successor.id(), next);
                self.pending.insert(next);
                targets.insert(next);
                fresh.insert(next);
                next += 1;
            }
            self.edge_line(column, &targets, &fresh);
        }

        self.lines
    }

    /// The column reserved for `id`, or the leftmost free one.
    fn claim(&mut self, id: TaskId) -> usize {
        let column = match self.columns.get(&id) {
            Some(&column) => column,
            None => self.free_column(0),
        };
        self.columns.insert(id, column);
        self.pending.remove(&column);
        column
    }

    fn free_column(&self, from: usize) -> usize {
        let mut column = from;
        while self.pending.contains(&column) {
            column += 1;
        }
        column
    }

    fn width(&self, column: usize) -> usize {
        self.pending.last().map_or(column, |&last| last.max(column)) + 1
    }

    fn node_line(&mut self, task: &Task<'_>, column: usize, show_ids: bool) {
        let glyph = match task.status() {
            Status::Completed => COMPLETED_GLYPH,
            Status::Open | Status::Started => OPEN_GLYPH,
        };
        let mut line: String = (0..self.width(column))
            .map(|x| {
                if x == column {
                    glyph
                } else if self.pending.contains(&x) {
                    PENDING_GLYPH
                } else {
                    ' '
                }
            })
            .collect();
        line.push(' ');
        if show_ids {
            line.push_str(&task.id().to_string());
            line.push(' ');
        }
        line.push_str(&task.label().replace('\n', " "));
        self.lines.push(line);
    }

    /// Connect `column` to every target column. Fresh targets start here;
    /// the others already have an edge coming down from above.
    fn edge_line(&mut self, column: usize, targets: &BTreeSet<usize>, fresh: &BTreeSet<usize>) {
        let lo = targets.first().map_or(column, |&first| first.min(column));
        let hi = targets.last().map_or(column, |&last| last.max(column));

        let line: String = (0..self.width(column))
            .map(|x| {
                if x == column {
                    junction(true, targets.contains(&x), x > lo, x < hi)
                } else if targets.contains(&x) {
                    junction(!fresh.contains(&x), true, x > lo, x < hi)
                } else if lo < x && x < hi {
                    let through = self.pending.contains(&x);
                    junction(through, through, true, true)
                } else if self.pending.contains(&x) {
                    PENDING_GLYPH
                } else {
                    ' '
                }
            })
            .collect();
        self.lines.push(line.trim_end().to_string());
    }
}

/// Box-drawing character joining the given sides of a cell.
fn junction(up: bool, down: bool, left: bool, right: bool) -> char {
    match (up, down, left, right) {
        (true, true, false, true) => '├',
        (true, true, true, false) => '┤',
        (true, true, true, true) => '┼',
        (true, false, false, true) => '└',
        (true, false, true, false) => '┘',
        (true, false, true, true) => '┴',
        (false, true, false, true) => '┌',
        (false, true, true, false) => '┐',
        (false, true, true, true) => '┬',
        (true, _, false, false) | (false, true, false, false) => '│',
        (false, false, false, false) => ' ',
        (false, false, _, _) => '─',
    }
}
