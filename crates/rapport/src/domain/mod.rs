//! Domain types for community relationship graphs.
//!
//! This module contains the identifiers, the canonical edge type and the
//! stored graph representation shared by every other component.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id! {
    /// Opaque identifier of a person within a community.
    ///
    /// Ordering is only used to put edges in canonical form.
    UserId
}

string_id! {
    /// Identifier of a community (a chat server, a guild, a workspace).
    CommunityId
}

string_id! {
    /// Identifier of a channel inside a community.
    ChannelId
}

/// The address of one graph: a community plus its designated channel.
///
/// Graphs are keyed by scope rather than by community alone, so re-designating
/// a channel starts a fresh graph while the old one stays in storage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Community the graph belongs to
    pub community_id: CommunityId,

    /// Designated channel the graph was built in
    pub channel_id: ChannelId,
}

impl Scope {
    /// Create a new scope
    pub fn new(community_id: impl Into<CommunityId>, channel_id: impl Into<ChannelId>) -> Self {
        Self {
            community_id: community_id.into(),
            channel_id: channel_id.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.community_id, self.channel_id)
    }
}

/// An undirected connection between two distinct users.
///
/// Always stored in canonical form: `low <= high`. Serialized as a two element
/// array so the persisted layout stays `[[a, b], ...]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "(UserId, UserId)", into = "(UserId, UserId)")]
pub struct Edge {
    low: UserId,
    high: UserId,
}

impl Edge {
    /// Build the canonical edge between `a` and `b`.
    ///
    /// Returns `None` when `a == b`; self-loops are never created.
    pub fn new(a: UserId, b: UserId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The smaller endpoint
    pub fn low(&self) -> &UserId {
        &self.low
    }

    /// The larger endpoint
    pub fn high(&self) -> &UserId {
        &self.high
    }

    /// Both endpoints, smaller first
    pub fn endpoints(&self) -> (&UserId, &UserId) {
        (&self.low, &self.high)
    }

    /// Whether `user` is one of the endpoints
    pub fn touches(&self, user: &UserId) -> bool {
        &self.low == user || &self.high == user
    }
}

impl TryFrom<(UserId, UserId)> for Edge {
    type Error = String;

    fn try_from((a, b): (UserId, UserId)) -> Result<Self, Self::Error> {
        Edge::new(a.clone(), b).ok_or_else(|| format!("self-loop edge on '{a}'"))
    }
}

impl From<Edge> for (UserId, UserId) {
    fn from(edge: Edge) -> Self {
        (edge.low, edge.high)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.low, self.high)
    }
}

/// The persisted form of one graph: its node set and edge set.
///
/// Invariant maintained by every store mutation: each endpoint of each edge is
/// present in `nodes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredGraph {
    /// Users that have taken part in at least one connection
    pub nodes: BTreeSet<UserId>,

    /// Canonical edges
    pub edges: BTreeSet<Edge>,
}

impl StoredGraph {
    /// Whether the node set is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Union `nodes` and `edges` into this graph, adding every edge endpoint
    /// to the node set.
    pub fn union(&mut self, nodes: impl IntoIterator<Item = UserId>, edges: impl IntoIterator<Item = Edge>) {
        self.nodes.extend(nodes);
        for edge in edges {
            self.nodes.insert(edge.low.clone());
            self.nodes.insert(edge.high.clone());
            self.edges.insert(edge);
        }
    }
}

/// One line of the persisted graph file.
///
/// Layout: `{"community_id", "channel_id", "nodes": [..], "edges": [[a, b], ..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Community the graph belongs to
    pub community_id: CommunityId,

    /// Designated channel the graph was built in
    pub channel_id: ChannelId,

    /// Node set, sorted
    #[serde(default)]
    pub nodes: Vec<UserId>,

    /// Edge set as endpoint pairs, sorted
    #[serde(default)]
    pub edges: Vec<(UserId, UserId)>,
}

impl GraphDocument {
    /// Create the document for `scope` from its stored graph
    pub fn from_graph(scope: &Scope, graph: &StoredGraph) -> Self {
        Self {
            community_id: scope.community_id.clone(),
            channel_id: scope.channel_id.clone(),
            nodes: graph.nodes.iter().cloned().collect(),
            edges: graph.edges.iter().cloned().map(Into::into).collect(),
        }
    }

    /// The scope this document belongs to
    pub fn scope(&self) -> Scope {
        Scope {
            community_id: self.community_id.clone(),
            channel_id: self.channel_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn uid(s: &str) -> UserId {
        UserId::new(s)
    }

    #[test]
    fn test_edge_is_canonical() {
        let edge = Edge::new(uid("b"), uid("a")).unwrap();
        assert_eq!(edge.low(), &uid("a"));
        assert_eq!(edge.high(), &uid("b"));
    }

    #[test]
    fn test_self_loop_rejected() {
        assert!(Edge::new(uid("a"), uid("a")).is_none());
    }

    #[test]
    fn test_edge_serializes_as_pair() {
        let edge = Edge::new(uid("200"), uid("100")).unwrap();
        let json = serde_json::to_string(&edge).unwrap();
        assert_eq!(json, r#"["100","200"]"#);
    }

    #[test]
    fn test_edge_deserialization_canonicalizes() {
        let edge: Edge = serde_json::from_str(r#"["200","100"]"#).unwrap();
        assert_eq!(edge.endpoints(), (&uid("100"), &uid("200")));
    }

    #[test]
    fn test_edge_deserialization_rejects_self_loop() {
        let result: std::result::Result<Edge, _> = serde_json::from_str(r#"["7","7"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_union_repairs_node_set() {
        let mut graph = StoredGraph::default();
        graph.union(Vec::new(), Edge::new(uid("a"), uid("b")));
        assert!(graph.nodes.contains(&uid("a")));
        assert!(graph.nodes.contains(&uid("b")));
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn test_document_roundtrips_through_graph() {
        let scope = Scope::new("guild", "chan");
        let mut graph = StoredGraph::default();
        graph.union([uid("c")], Edge::new(uid("b"), uid("a")));

        let doc = GraphDocument::from_graph(&scope, &graph);
        assert_eq!(doc.scope(), scope);
        assert_eq!(doc.nodes, vec![uid("a"), uid("b"), uid("c")]);
        assert_eq!(doc.edges, vec![(uid("a"), uid("b"))]);
    }

    proptest! {
        #[test]
        fn prop_edge_is_symmetric(a in "[0-9]{1,6}", b in "[0-9]{1,6}") {
            let forward = Edge::new(UserId::new(a.clone()), UserId::new(b.clone()));
            let backward = Edge::new(UserId::new(b), UserId::new(a));
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn prop_edge_endpoints_ordered(a in "[a-z0-9]{1,8}", b in "[a-z0-9]{1,8}") {
            if let Some(edge) = Edge::new(UserId::new(a), UserId::new(b)) {
                prop_assert!(edge.low() < edge.high());
            }
        }
    }
}
