//! Cycle detection over dependency graphs.

use crate::graph::DependencyGraph;
use std::collections::BTreeSet;

/// Find some cycle in `graph`, if there is one.
///
/// Runs a depth-first search from every unvisited node, visiting nodes and
/// successors in ascending order, and stops at the first edge that leads back
/// onto the active path. The result is that part of the path, closed by
/// repeating its first node: `[a, b, c, a]` for `a -> b -> c -> a`, and
/// `[a, a]` for a self-loop.
pub fn find_any_cycle<N: Ord + Clone>(graph: &DependencyGraph<N>) -> Option<Vec<N>> {
    let mut visited: BTreeSet<&N> = BTreeSet::new();

    for start in graph.contents() {
        if visited.contains(start) {
            continue;
        }

        // Active path, with each entry's not-yet-explored successors.
        let mut path: Vec<&N> = Vec::new();
        let mut pending: Vec<std::vec::IntoIter<&N>> = Vec::new();
        let mut on_path: BTreeSet<&N> = BTreeSet::new();

        visited.insert(start);
        on_path.insert(start);
        path.push(start);
        pending.push(graph.successors(start).collect::<Vec<_>>().into_iter());

        while let Some(successors) = pending.last_mut() {
            match successors.next() {
                Some(next) if on_path.contains(next) => {
                    let from = path.iter().position(|node| *node == next).unwrap_or(0);
                    let mut cycle: Vec<N> = path[from..].iter().map(|node| (*node).clone()).collect();
                    cycle.push(next.clone());
                    return Some(cycle);
                }
                Some(next) => {
                    if visited.insert(next) {
                        on_path.insert(next);
                        path.push(next);
                        pending.push(graph.successors(next).collect::<Vec<_>>().into_iter());
                    }
                }
                None => {
                    pending.pop();
                    if let Some(done) = path.pop() {
                        on_path.remove(done);
                    }
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[u32], edges: &[(u32, u32)]) -> DependencyGraph<u32> {
        let mut builder = DependencyGraph::new().to_builder();
        for node in nodes {
            builder.add_node(*node);
        }
        for (from, to) in edges {
            builder.add_edge(*from, *to).unwrap();
        }
        builder.build()
    }

    #[test]
    fn test_empty_graph_has_no_cycle() {
        assert_eq!(find_any_cycle(&DependencyGraph::<u32>::new()), None);
    }

    #[test]
    fn test_diamond_is_acyclic() {
        let g = graph(&[1, 2, 3, 4], &[(1, 2), (1, 3), (2, 4), (3, 4)]);
        assert_eq!(find_any_cycle(&g), None);
    }

    #[test]
    fn test_self_loop() {
        let g = graph(&[1, 2], &[(1, 2), (2, 2)]);
        assert_eq!(find_any_cycle(&g), Some(vec![2, 2]));
    }

    #[test]
    fn test_two_node_cycle() {
        let g = graph(&[1, 2], &[(1, 2), (2, 1)]);
        assert_eq!(find_any_cycle(&g), Some(vec![1, 2, 1]));
    }

    #[test]
    fn test_cycle_excludes_lead_in_path() {
        // 1 -> 2 -> 3 -> 4 -> 2
        let g = graph(&[1, 2, 3, 4], &[(1, 2), (2, 3), (3, 4), (4, 2)]);
        assert_eq!(find_any_cycle(&g), Some(vec![2, 3, 4, 2]));
    }

    #[test]
    fn test_cycle_reachable_only_from_later_root() {
        // 1 is isolated; 5 -> 6 -> 5
        let g = graph(&[1, 5, 6], &[(5, 6), (6, 5)]);
        assert_eq!(find_any_cycle(&g), Some(vec![5, 6, 5]));
    }

    #[test]
    fn test_revisiting_finished_node_is_not_a_cycle() {
        // 1 -> 3, 2 -> 3: 3 is finished before 2 reaches it
        let g = graph(&[1, 2, 3], &[(1, 3), (2, 3)]);
        assert_eq!(find_any_cycle(&g), None);
    }
}
