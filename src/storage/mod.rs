//! # Graph Backend Trait
//!
//! This is THE contract between the network engine and whatever stores the
//! directed graph. The engine only needs a narrow capability set:
//! vertex/arc storage plus the reachability queries built on top of it
//! (topological order, ancestors, descendants, path existence).
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | Adjacency lists in hash maps |
//!
//! Backends store *structure only*. Acyclicity is enforced by
//! [`Network`](crate::Network) before it calls `add_arc`; a backend is free
//! to accept any arc it is handed.

pub mod memory;

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};

use crate::model::NodeId;
use crate::{Error, Result};

pub use memory::MemoryBackend;

// ============================================================================
// GraphBackend Trait
// ============================================================================

/// The structural storage contract.
///
/// Required methods cover raw storage. Traversals have default
/// implementations expressed in terms of `parents`/`children`; backends with
/// native traversal support can override them.
pub trait GraphBackend {
    // ========================================================================
    // Vertices
    // ========================================================================

    /// Allocate a fresh vertex. Ids must be strictly increasing in
    /// allocation order.
    fn add_vertex(&mut self) -> NodeId;

    /// Remove a vertex and every arc touching it. Returns true if it existed.
    fn remove_vertex(&mut self, id: NodeId) -> bool;

    fn contains_vertex(&self, id: NodeId) -> bool;

    /// All vertices in ascending id (insertion) order.
    fn vertices(&self) -> Vec<NodeId>;

    // ========================================================================
    // Arcs
    // ========================================================================

    /// Insert the arc `parent -> child`.
    fn add_arc(&mut self, parent: NodeId, child: NodeId) -> Result<()>;

    /// Remove an arc. Returns true if it existed.
    fn remove_arc(&mut self, parent: NodeId, child: NodeId) -> bool;

    fn has_arc(&self, parent: NodeId, child: NodeId) -> bool;

    /// Direct parents, ascending id order.
    fn parents(&self, id: NodeId) -> Vec<NodeId>;

    /// Direct children, ascending id order.
    fn children(&self, id: NodeId) -> Vec<NodeId>;

    /// Total number of arcs.
    fn arc_count(&self) -> usize;

    // ========================================================================
    // Traversal (provided)
    // ========================================================================

    /// Every arc as `(parent, child)`, grouped by child in id order.
    fn arcs(&self) -> Vec<(NodeId, NodeId)> {
        let mut out = Vec::with_capacity(self.arc_count());
        for child in self.vertices() {
            for parent in self.parents(child) {
                out.push((parent, child));
            }
        }
        out
    }

    /// Whether a directed path leads from `from` to `to`. A vertex reaches
    /// itself.
    fn has_path(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        seen.insert(from);
        while let Some(current) = stack.pop() {
            for next in self.children(current) {
                if next == to {
                    return true;
                }
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        false
    }

    /// Transitive parents, ascending id order.
    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        collect_reachable(id, |n| self.parents(n))
    }

    /// Transitive children, ascending id order.
    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        collect_reachable(id, |n| self.children(n))
    }

    /// Kahn's algorithm; among vertices whose parents are all placed, the one
    /// with the lowest id goes first.
    fn topological_order(&self) -> Result<Vec<NodeId>> {
        let vertices = self.vertices();
        let mut in_degree: HashMap<NodeId, usize> = vertices
            .iter()
            .map(|&v| (v, self.parents(v).len()))
            .collect();

        let mut ready: BinaryHeap<Reverse<NodeId>> = in_degree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&v, _)| Reverse(v))
            .collect();

        let mut order = Vec::with_capacity(vertices.len());
        while let Some(Reverse(v)) = ready.pop() {
            order.push(v);
            for child in self.children(v) {
                if let Some(d) = in_degree.get_mut(&child) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(Reverse(child));
                    }
                }
            }
        }

        if order.len() != vertices.len() {
            return Err(Error::Internal(format!(
                "backend graph is cyclic: ordered {} of {} vertices",
                order.len(),
                vertices.len()
            )));
        }
        Ok(order)
    }
}

fn collect_reachable<F>(start: NodeId, mut step: F) -> Vec<NodeId>
where
    F: FnMut(NodeId) -> Vec<NodeId>,
{
    let mut seen = HashSet::new();
    let mut stack = vec![start];
    while let Some(current) = stack.pop() {
        for next in step(current) {
            if seen.insert(next) {
                stack.push(next);
            }
        }
    }
    seen.remove(&start);
    let mut out: Vec<NodeId> = seen.into_iter().collect();
    out.sort();
    out
}
