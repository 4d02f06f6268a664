//! In-memory graph backend.
//!
//! This is the reference implementation of `GraphBackend`.
//! It keeps sorted parent and child lists per vertex in hash maps.
//!
//! ## Limitations
//!
//! - **No cycle check**: arcs are inserted as given. `Network` performs the
//!   reachability check before calling `add_arc`.
//! - **Linear arc updates**: inserting or removing an arc is O(degree) to
//!   keep the adjacency lists sorted. Fine for the fan-in typical of
//!   Bayesian networks.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::model::NodeId;
use crate::{Error, Result};
use super::GraphBackend;

/// Adjacency list; most nodes in a Bayesian network have a handful of parents.
type Adjacency = SmallVec<[NodeId; 4]>;

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory directed graph storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    /// Live vertices, ascending id order.
    vertices: Vec<NodeId>,
    parents: HashMap<NodeId, Adjacency>,
    children: HashMap<NodeId, Adjacency>,
    arc_count: usize,
    next_id: u64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert_sorted(list: &mut Adjacency, id: NodeId) -> bool {
    match list.binary_search(&id) {
        Ok(_) => false,
        Err(pos) => {
            list.insert(pos, id);
            true
        }
    }
}

fn remove_sorted(list: &mut Adjacency, id: NodeId) -> bool {
    match list.binary_search(&id) {
        Ok(pos) => {
            list.remove(pos);
            true
        }
        Err(_) => false,
    }
}

// ============================================================================
// GraphBackend impl
// ============================================================================

impl GraphBackend for MemoryBackend {
    fn add_vertex(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.vertices.push(id);
        self.parents.insert(id, Adjacency::new());
        self.children.insert(id, Adjacency::new());
        id
    }

    fn remove_vertex(&mut self, id: NodeId) -> bool {
        let Ok(pos) = self.vertices.binary_search(&id) else {
            return false;
        };
        self.vertices.remove(pos);

        let parents = self.parents.remove(&id).unwrap_or_default();
        let children = self.children.remove(&id).unwrap_or_default();
        for p in &parents {
            if let Some(list) = self.children.get_mut(p) {
                remove_sorted(list, id);
            }
        }
        for c in &children {
            if let Some(list) = self.parents.get_mut(c) {
                remove_sorted(list, id);
            }
        }
        self.arc_count -= parents.len() + children.len();
        true
    }

    fn contains_vertex(&self, id: NodeId) -> bool {
        self.parents.contains_key(&id)
    }

    fn vertices(&self) -> Vec<NodeId> {
        self.vertices.clone()
    }

    fn add_arc(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.contains_vertex(parent) {
            return Err(Error::Internal(format!("source vertex {parent} not in backend")));
        }
        if !self.contains_vertex(child) {
            return Err(Error::Internal(format!("target vertex {child} not in backend")));
        }

        let inserted = self
            .children
            .get_mut(&parent)
            .is_some_and(|list| insert_sorted(list, child));
        if let Some(list) = self.parents.get_mut(&child) {
            insert_sorted(list, parent);
        }
        if inserted {
            self.arc_count += 1;
        }
        Ok(())
    }

    fn remove_arc(&mut self, parent: NodeId, child: NodeId) -> bool {
        let removed = self
            .children
            .get_mut(&parent)
            .is_some_and(|list| remove_sorted(list, child));
        if removed {
            if let Some(list) = self.parents.get_mut(&child) {
                remove_sorted(list, parent);
            }
            self.arc_count -= 1;
        }
        removed
    }

    fn has_arc(&self, parent: NodeId, child: NodeId) -> bool {
        self.children
            .get(&parent)
            .is_some_and(|list| list.binary_search(&child).is_ok())
    }

    fn parents(&self, id: NodeId) -> Vec<NodeId> {
        self.parents.get(&id).map(|l| l.to_vec()).unwrap_or_default()
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.children.get(&id).map(|l| l.to_vec()).unwrap_or_default()
    }

    fn arc_count(&self) -> usize {
        self.arc_count
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (MemoryBackend, NodeId, NodeId, NodeId) {
        let mut g = MemoryBackend::new();
        let a = g.add_vertex();
        let b = g.add_vertex();
        let c = g.add_vertex();
        g.add_arc(a, b).unwrap();
        g.add_arc(b, c).unwrap();
        (g, a, b, c)
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut g = MemoryBackend::new();
        let a = g.add_vertex();
        let b = g.add_vertex();
        g.remove_vertex(a);
        let c = g.add_vertex();
        assert!(a < b && b < c);
        assert_eq!(g.vertices(), vec![b, c]);
    }

    #[test]
    fn test_add_and_query_arcs() {
        let (g, a, b, c) = chain();
        assert!(g.has_arc(a, b));
        assert!(!g.has_arc(b, a));
        assert_eq!(g.parents(c), vec![b]);
        assert_eq!(g.children(a), vec![b]);
        assert_eq!(g.arc_count(), 2);
        assert_eq!(g.arcs(), vec![(a, b), (b, c)]);
    }

    #[test]
    fn test_duplicate_arc_counted_once() {
        let (mut g, a, b, _) = chain();
        g.add_arc(a, b).unwrap();
        assert_eq!(g.arc_count(), 2);
    }

    #[test]
    fn test_arc_to_missing_vertex() {
        let (mut g, a, _, _) = chain();
        assert!(g.add_arc(a, NodeId(99)).is_err());
    }

    #[test]
    fn test_remove_vertex_drops_incident_arcs() {
        let (mut g, a, b, c) = chain();
        assert!(g.remove_vertex(b));
        assert_eq!(g.arc_count(), 0);
        assert!(g.children(a).is_empty());
        assert!(g.parents(c).is_empty());
        assert!(!g.remove_vertex(b));
    }

    #[test]
    fn test_remove_arc() {
        let (mut g, a, b, _) = chain();
        assert!(g.remove_arc(a, b));
        assert!(!g.remove_arc(a, b));
        assert_eq!(g.arc_count(), 1);
    }

    #[test]
    fn test_traversal() {
        let (g, a, b, c) = chain();
        assert!(g.has_path(a, c));
        assert!(!g.has_path(c, a));
        assert_eq!(g.ancestors(c), vec![a, b]);
        assert_eq!(g.descendants(a), vec![b, c]);
        assert!(g.ancestors(a).is_empty());
    }

    #[test]
    fn test_topological_order_breaks_ties_by_insertion() {
        let mut g = MemoryBackend::new();
        let a = g.add_vertex();
        let b = g.add_vertex();
        let c = g.add_vertex();
        let d = g.add_vertex();
        // d -> a, c and b are free
        g.add_arc(d, a).unwrap();
        assert_eq!(g.topological_order().unwrap(), vec![b, c, d, a]);
    }

    #[test]
    fn test_topological_order_reports_cycles() {
        let mut g = MemoryBackend::new();
        let a = g.add_vertex();
        let b = g.add_vertex();
        g.add_arc(a, b).unwrap();
        g.add_arc(b, a).unwrap();
        assert!(g.topological_order().is_err());
    }
}
