//! Connection planning for batch "connect N users" requests.
//!
//! The planner is pure: it looks at the participants and the edges already
//! stored for the scope and says which pairs are new. Writing the result is the
//! caller's job (through [`GraphStore::merge_add`]), so the same plan can be
//! applied concurrently with other plans without losing edges.
//!
//! [`GraphStore::merge_add`]: crate::storage::GraphStore::merge_add

use crate::domain::{Edge, UserId};
use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashSet};

/// Minimum number of distinct participants a connect request needs.
pub const MIN_PARTICIPANTS: usize = 2;

/// The edges implied by a connect request, split by whether they exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionPlan {
    /// Participants that appear in at least one new edge
    pub new_nodes: BTreeSet<UserId>,

    /// Canonical edges not yet in the stored edge set
    pub new_edges: BTreeSet<Edge>,

    /// Canonical edges that were already stored, in pair order
    pub already_connected: Vec<Edge>,
}

impl ConnectionPlan {
    /// Whether the request adds nothing
    pub fn is_noop(&self) -> bool {
        self.new_edges.is_empty()
    }
}

/// Collapse repeated mentions, keeping first-occurrence order.
pub fn distinct_participants(participants: &[UserId]) -> Vec<UserId> {
    let mut seen = HashSet::new();
    participants
        .iter()
        .filter(|user| seen.insert(*user))
        .cloned()
        .collect()
}

/// Plan the edges for connecting every pair of `participants`.
///
/// Duplicate mentions count once, so no self-loop is ever produced. Pairs are
/// canonicalized before they are compared with `existing`, which makes the
/// result independent of mention order.
///
/// # Errors
///
/// Returns `Error::InvalidRequest` if fewer than two distinct participants
/// remain after collapsing duplicates.
pub fn plan_connections(participants: &[UserId], existing: &BTreeSet<Edge>) -> Result<ConnectionPlan> {
    let participants = distinct_participants(participants);
    if participants.len() < MIN_PARTICIPANTS {
        return Err(Error::InvalidRequest(format!(
            "at least {MIN_PARTICIPANTS} distinct users are needed to create connections"
        )));
    }

    let mut plan = ConnectionPlan::default();
    for (i, a) in participants.iter().enumerate() {
        for b in &participants[i + 1..] {
            let Some(edge) = Edge::new(a.clone(), b.clone()) else {
                continue;
            };
            if existing.contains(&edge) {
                plan.already_connected.push(edge);
            } else {
                plan.new_nodes.insert(a.clone());
                plan.new_nodes.insert(b.clone());
                plan.new_edges.insert(edge);
            }
        }
    }

    tracing::debug!(
        participants = participants.len(),
        new_edges = plan.new_edges.len(),
        already_connected = plan.already_connected.len(),
        "Planned connections"
    );

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn uid(s: &str) -> UserId {
        UserId::new(s)
    }

    fn users(ids: &[&str]) -> Vec<UserId> {
        ids.iter().map(|s| uid(s)).collect()
    }

    fn edge(a: &str, b: &str) -> Edge {
        Edge::new(uid(a), uid(b)).unwrap()
    }

    #[test]
    fn test_three_participants_fresh_graph() {
        let plan = plan_connections(&users(&["a", "b", "c"]), &BTreeSet::new()).unwrap();

        assert_eq!(plan.new_edges.len(), 3);
        assert!(plan.new_edges.contains(&edge("a", "b")));
        assert!(plan.new_edges.contains(&edge("a", "c")));
        assert!(plan.new_edges.contains(&edge("b", "c")));
        assert_eq!(plan.new_nodes.len(), 3);
        assert!(plan.already_connected.is_empty());
    }

    #[test]
    fn test_existing_pair_is_already_connected() {
        let existing = BTreeSet::from([edge("a", "b")]);
        let plan = plan_connections(&users(&["b", "a"]), &existing).unwrap();

        assert!(plan.is_noop());
        assert!(plan.new_nodes.is_empty());
        assert_eq!(plan.already_connected, vec![edge("a", "b")]);
    }

    #[test]
    fn test_partial_overlap_only_adds_new_nodes_from_new_edges() {
        let existing = BTreeSet::from([edge("a", "b")]);
        let plan = plan_connections(&users(&["a", "b", "c"]), &existing).unwrap();

        assert_eq!(plan.new_edges.len(), 2);
        assert_eq!(plan.already_connected, vec![edge("a", "b")]);
        // a and b both still appear in a new edge with c.
        assert_eq!(plan.new_nodes.len(), 3);
    }

    #[test]
    fn test_duplicate_mentions_collapse() {
        let plan = plan_connections(&users(&["a", "a", "b"]), &BTreeSet::new()).unwrap();

        assert_eq!(plan.new_edges.len(), 1);
        assert!(plan.new_edges.contains(&edge("a", "b")));
        assert!(Edge::new(uid("a"), uid("a")).is_none());
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::single(&["a"])]
    #[case::same_user_twice(&["a", "a"])]
    fn test_too_few_participants(#[case] ids: &[&str]) {
        let result = plan_connections(&users(ids), &BTreeSet::new());
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_distinct_participants_keeps_first_occurrence_order() {
        let distinct = distinct_participants(&users(&["c", "a", "c", "b", "a"]));
        assert_eq!(distinct, users(&["c", "a", "b"]));
    }

    proptest! {
        #[test]
        fn prop_plan_ignores_mention_order(
            mut ids in proptest::collection::vec("[0-9]{1,3}", 2..8)
        ) {
            let forward: Vec<UserId> = ids.iter().map(|s| UserId::new(s.clone())).collect();
            ids.reverse();
            let backward: Vec<UserId> = ids.iter().map(|s| UserId::new(s.clone())).collect();

            let a = plan_connections(&forward, &BTreeSet::new());
            let b = plan_connections(&backward, &BTreeSet::new());
            match (a, b) {
                (Ok(a), Ok(b)) => {
                    prop_assert_eq!(a.new_edges, b.new_edges);
                    prop_assert_eq!(a.new_nodes, b.new_nodes);
                }
                (Err(_), Err(_)) => {}
                _ => prop_assert!(false, "plans disagree on validity"),
            }
        }

        #[test]
        fn prop_pair_count_is_n_choose_2(n in 2usize..10) {
            let participants: Vec<UserId> = (0..n).map(|i| UserId::new(i.to_string())).collect();
            let plan = plan_connections(&participants, &BTreeSet::new()).unwrap();
            prop_assert_eq!(plan.new_edges.len(), n * (n - 1) / 2);
        }
    }
}
