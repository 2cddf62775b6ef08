//! Core in-memory storage data structures.
//!
//! This module contains the inner storage structure that holds all graphs and
//! is wrapped in a mutex by both the in-memory and the JSONL-backed store.

use crate::domain::{Edge, Scope, StoredGraph, UserId};
use std::collections::HashMap;

/// Inner storage structure (not thread-safe).
///
/// Every method is a complete store operation; callers hold the surrounding
/// lock for the duration of one call.
#[derive(Debug, Default)]
pub struct InMemoryStoreInner {
    /// Graphs indexed by scope
    pub(super) graphs: HashMap<Scope, StoredGraph>,
}

impl InMemoryStoreInner {
    /// Create a new empty storage instance
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn load(&self, scope: &Scope) -> Option<StoredGraph> {
        self.graphs.get(scope).cloned()
    }

    pub(crate) fn save(&mut self, scope: &Scope, graph: StoredGraph) {
        let StoredGraph { nodes, edges } = graph;
        let mut repaired = StoredGraph::default();
        repaired.union(nodes, edges);
        self.graphs.insert(scope.clone(), repaired);
    }

    pub(crate) fn merge_add(&mut self, scope: &Scope, nodes: Vec<UserId>, edges: Vec<Edge>) {
        self.graphs
            .entry(scope.clone())
            .or_default()
            .union(nodes, edges);
    }

    pub(crate) fn remove_edge(&mut self, scope: &Scope, edge: &Edge) -> bool {
        self.graphs
            .get_mut(scope)
            .is_some_and(|graph| graph.edges.remove(edge))
    }

    pub(crate) fn clear(&mut self, scope: &Scope) -> bool {
        self.graphs.remove(scope).is_some()
    }

    pub(crate) fn scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self.graphs.keys().cloned().collect();
        scopes.sort();
        scopes
    }

    /// All stored graphs, sorted by scope for deterministic serialization.
    pub(crate) fn sorted_graphs(&self) -> Vec<(&Scope, &StoredGraph)> {
        let mut graphs: Vec<_> = self.graphs.iter().collect();
        graphs.sort_by(|a, b| a.0.cmp(b.0));
        graphs
    }
}
