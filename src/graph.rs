//! Immutable dependency graph with copy-on-write edits.
//!
//! An edge `a -> b` means *a blocks b*: `a` is a predecessor of `b` and `b` is
//! a successor of `a`. Every edit produces a new graph value; the adjacency
//! map and each node's edge sets are shared between graph values until one
//! of them is written to, so older snapshots stay valid and cheap to keep.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// The edges incident to one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeEdges<N> {
    predecessors: BTreeSet<N>,
    successors: BTreeSet<N>,
}

impl<N: Ord> NodeEdges<N> {
    fn empty() -> Self {
        Self {
            predecessors: BTreeSet::new(),
            successors: BTreeSet::new(),
        }
    }

    /// Nodes with an edge into this one (its blockers).
    pub fn predecessors(&self) -> &BTreeSet<N> {
        &self.predecessors
    }

    /// Nodes this one has an edge to (the nodes it blocks).
    pub fn successors(&self) -> &BTreeSet<N> {
        &self.successors
    }
}

type Adjacency<N> = BTreeMap<N, Arc<NodeEdges<N>>>;

/// Errors from structural graph edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError<N> {
    /// An edge endpoint is not a node of the graph.
    UnknownNode(N),
}

impl<N: fmt::Display> fmt::Display for GraphError<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::UnknownNode(node) => write!(f, "unknown node: {}", node),
        }
    }
}

impl<N: fmt::Debug + fmt::Display> std::error::Error for GraphError<N> {}

/// A directed graph over node values, compared structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyGraph<N> {
    nodes: Arc<Adjacency<N>>,
}

impl<N: Ord + Clone> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Ord + Clone> DependencyGraph<N> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(BTreeMap::new()),
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: &N) -> bool {
        self.nodes.contains_key(node)
    }

    /// All nodes, in ascending order.
    pub fn contents(&self) -> impl Iterator<Item = &N> {
        self.nodes.keys()
    }

    /// Edges incident to `node`, if it is part of the graph.
    pub fn node_of(&self, node: &N) -> Option<&NodeEdges<N>> {
        self.nodes.get(node).map(|edges| edges.as_ref())
    }

    /// Predecessors of `node` in ascending order; empty if `node` is absent.
    pub fn predecessors<'a>(&'a self, node: &N) -> impl Iterator<Item = &'a N> + use<'a, N> {
        self.node_of(node).into_iter().flat_map(|edges| edges.predecessors.iter())
    }

    /// Successors of `node` in ascending order; empty if `node` is absent.
    pub fn successors<'a>(&'a self, node: &N) -> impl Iterator<Item = &'a N> + use<'a, N> {
        self.node_of(node).into_iter().flat_map(|edges| edges.successors.iter())
    }

    /// Every edge as `(from, to)`, ordered by `from` then `to`.
    pub fn edges(&self) -> impl Iterator<Item = (&N, &N)> {
        self.nodes
            .iter()
            .flat_map(|(from, edges)| edges.successors.iter().map(move |to| (from, to)))
    }

    /// Start a batch of edits against this graph.
    pub fn to_builder(&self) -> GraphBuilder<N> {
        GraphBuilder {
            nodes: Arc::clone(&self.nodes),
        }
    }

    /// A new graph with `node` added. Adding an existing node changes nothing.
    pub fn add_node(&self, node: N) -> Self {
        let mut builder = self.to_builder();
        builder.add_node(node);
        builder.build()
    }

    /// A new graph without `node` and without any edge touching it.
    pub fn remove_node(&self, node: &N) -> Self {
        let mut builder = self.to_builder();
        builder.remove_node(node);
        builder.build()
    }

    /// A new graph with the edge `from -> to` added.
    pub fn add_edge(&self, from: N, to: N) -> Result<Self, GraphError<N>> {
        let mut builder = self.to_builder();
        builder.add_edge(from, to)?;
        Ok(builder.build())
    }

    /// A new graph with the edge `from -> to` removed.
    pub fn remove_edge(&self, from: &N, to: &N) -> Result<Self, GraphError<N>> {
        let mut builder = self.to_builder();
        builder.remove_edge(from, to)?;
        Ok(builder.build())
    }

    /// The same shape with every node replaced by `f(node)`.
    ///
    /// `f` must preserve ordering and distinctness of nodes.
    pub fn map<M: Ord + Clone>(&self, f: impl Fn(&N) -> M) -> DependencyGraph<M> {
        let nodes = self
            .nodes
            .iter()
            .map(|(node, edges)| {
                let mapped = NodeEdges {
                    predecessors: edges.predecessors.iter().map(&f).collect(),
                    successors: edges.successors.iter().map(&f).collect(),
                };
                (f(node), Arc::new(mapped))
            })
            .collect();
        DependencyGraph { nodes: Arc::new(nodes) }
    }

    /// The induced subgraph on the nodes `keep` accepts.
    pub fn retain(&self, keep: impl Fn(&N) -> bool) -> Self {
        let mut builder = self.to_builder();
        let dropped: Vec<N> = self.contents().filter(|node| !keep(node)).cloned().collect();
        for node in &dropped {
            builder.remove_node(node);
        }
        builder.build()
    }
}

/// Staged edits over a graph. Shares storage with its source until written.
#[derive(Debug, Clone)]
pub struct GraphBuilder<N> {
    nodes: Arc<Adjacency<N>>,
}

impl<N: Ord + Clone> GraphBuilder<N> {
    pub fn contains(&self, node: &N) -> bool {
        self.nodes.contains_key(node)
    }

    /// Add `node` if it is not present yet.
    pub fn add_node(&mut self, node: N) -> &mut Self {
        if !self.nodes.contains_key(&node) {
            Arc::make_mut(&mut self.nodes).insert(node, Arc::new(NodeEdges::empty()));
        }
        self
    }

    /// Remove `node` along with its incident edges. Absent nodes are ignored.
    pub fn remove_node(&mut self, node: &N) -> &mut Self {
        let nodes = Arc::make_mut(&mut self.nodes);
        if let Some(edges) = nodes.remove(node) {
            for pred in &edges.predecessors {
                if let Some(pred_edges) = nodes.get_mut(pred) {
                    Arc::make_mut(pred_edges).successors.remove(node);
                }
            }
            for succ in &edges.successors {
                if let Some(succ_edges) = nodes.get_mut(succ) {
                    Arc::make_mut(succ_edges).predecessors.remove(node);
                }
            }
        }
        self
    }

    /// Add the edge `from -> to`. Both endpoints must already be nodes.
    pub fn add_edge(&mut self, from: N, to: N) -> Result<&mut Self, GraphError<N>> {
        self.check_endpoints(&from, &to)?;
        let nodes = Arc::make_mut(&mut self.nodes);
        if let Some(edges) = nodes.get_mut(&from) {
            Arc::make_mut(edges).successors.insert(to.clone());
        }
        if let Some(edges) = nodes.get_mut(&to) {
            Arc::make_mut(edges).predecessors.insert(from);
        }
        Ok(self)
    }

    /// Remove the edge `from -> to`. Both endpoints must be nodes.
    pub fn remove_edge(&mut self, from: &N, to: &N) -> Result<&mut Self, GraphError<N>> {
        self.check_endpoints(from, to)?;
        let nodes = Arc::make_mut(&mut self.nodes);
        if let Some(edges) = nodes.get_mut(from) {
            Arc::make_mut(edges).successors.remove(to);
        }
        if let Some(edges) = nodes.get_mut(to) {
            Arc::make_mut(edges).predecessors.remove(from);
        }
        Ok(self)
    }

    /// Freeze the staged edits into a graph value.
    pub fn build(self) -> DependencyGraph<N> {
        DependencyGraph { nodes: self.nodes }
    }

    fn check_endpoints(&self, from: &N, to: &N) -> Result<(), GraphError<N>> {
        for node in [from, to] {
            if !self.nodes.contains_key(node) {
                return Err(GraphError::UnknownNode(node.clone()));
            }
        }
        Ok(())
    }
}
