//! Transient graph model using petgraph.
//!
//! A [`SocialGraph`] is rebuilt from a [`StoredGraph`] at the start of every
//! operation and dropped at the end of it. It never outlives the operation, so
//! it can't go stale relative to the store.
//!
//! # Representation
//!
//! - `UnGraph<UserId, ()>` holds the structure; edges carry no weight
//! - `HashMap<UserId, NodeIndex>` maps users to graph nodes
//!
//! Every edge in the petgraph graph corresponds to exactly one canonical
//! [`Edge`]; duplicates and self-loops are rejected on insertion.

use crate::domain::{Edge, StoredGraph, UserId};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap};

/// Undirected graph of users for one scope.
#[derive(Debug, Clone, Default)]
pub struct SocialGraph {
    graph: UnGraph<UserId, ()>,
    node_map: HashMap<UserId, NodeIndex>,
}

impl SocialGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a stored node set and edge set.
    ///
    /// Stored data is trusted but repaired: edge endpoints missing from
    /// `nodes` are added, and self-loops and duplicate edges are dropped.
    pub fn build<N, E>(nodes: N, edges: E) -> Self
    where
        N: IntoIterator<Item = UserId>,
        E: IntoIterator<Item = (UserId, UserId)>,
    {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node);
        }

        for (a, b) in edges {
            for endpoint in [&a, &b] {
                if !graph.node_map.contains_key(endpoint) {
                    tracing::debug!(user = %endpoint, "Edge endpoint missing from node set, adding it");
                }
            }
            match Edge::new(a, b) {
                Some(edge) => {
                    graph.add_edge(&edge);
                }
                None => tracing::debug!("Dropping self-loop edge"),
            }
        }

        graph
    }

    /// Build a graph from its persisted form.
    pub fn from_stored(stored: &StoredGraph) -> Self {
        Self::build(
            stored.nodes.iter().cloned(),
            stored.edges.iter().cloned().map(Into::into),
        )
    }

    /// Add a node, returning its index. Existing nodes are left as they are.
    pub fn add_node(&mut self, user: UserId) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&user) {
            return index;
        }
        let index = self.graph.add_node(user.clone());
        self.node_map.insert(user, index);
        index
    }

    /// Add a canonical edge, adding its endpoints if needed.
    ///
    /// Returns `false` if the edge was already present.
    pub fn add_edge(&mut self, edge: &Edge) -> bool {
        let (low, high) = edge.endpoints();
        let a = self.add_node(low.clone());
        let b = self.add_node(high.clone());
        if self.graph.contains_edge(a, b) {
            return false;
        }
        self.graph.add_edge(a, b, ());
        true
    }

    /// Return a new graph keeping only the users for which `is_member` holds
    /// and the edges whose endpoints are both kept.
    ///
    /// `self` is not modified; this only shapes the transient view.
    pub fn filter_by_membership<F>(&self, is_member: F) -> Self
    where
        F: Fn(&UserId) -> bool,
    {
        let mut filtered = Self::new();
        for user in self.graph.node_weights() {
            if is_member(user) {
                filtered.add_node(user.clone());
            }
        }

        for edge in self.edges() {
            let (low, high) = edge.endpoints();
            if filtered.node_map.contains_key(low) && filtered.node_map.contains_key(high) {
                filtered.add_edge(&edge);
            }
        }

        let pruned = self.node_count() - filtered.node_count();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned non-member nodes from view");
        }
        filtered
    }

    /// Whether the node set is empty
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of users
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of connections
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether `user` is in the graph
    pub fn contains_node(&self, user: &UserId) -> bool {
        self.node_map.contains_key(user)
    }

    /// Whether the canonical `edge` is in the graph
    pub fn contains_edge(&self, edge: &Edge) -> bool {
        let (low, high) = edge.endpoints();
        match (self.node_map.get(low), self.node_map.get(high)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Number of connections `user` has, or `None` if the user is absent
    pub fn degree(&self, user: &UserId) -> Option<usize> {
        self.node_map
            .get(user)
            .map(|&index| self.graph.edges(index).count())
    }

    /// Users, sorted
    pub fn nodes(&self) -> Vec<UserId> {
        let mut nodes: Vec<UserId> = self.graph.node_weights().cloned().collect();
        nodes.sort();
        nodes
    }

    /// Canonical edges, sorted
    pub fn edges(&self) -> Vec<Edge> {
        let edges: BTreeSet<Edge> = self
            .graph
            .edge_references()
            .filter_map(|e| {
                Edge::new(
                    self.graph[e.source()].clone(),
                    self.graph[e.target()].clone(),
                )
            })
            .collect();
        edges.into_iter().collect()
    }

    /// The persisted form of this graph
    pub fn to_stored(&self) -> StoredGraph {
        StoredGraph {
            nodes: self.graph.node_weights().cloned().collect(),
            edges: self.edges().into_iter().collect(),
        }
    }
}
