//! # Structure Comparison
//!
//! Edge-level agreement between a reference DAG and a candidate over the same
//! variables. Every unordered pair of variables falls into at most one class:
//!
//! | Class | Reference | Candidate |
//! |-------|-----------|-----------|
//! | correct | `a -> b` | `a -> b` |
//! | reversed | `a -> b` | `b -> a` |
//! | missing | `a -> b` | none |
//! | extra | none | `a -> b` |
//!
//! The structural distance is `reversed + missing + extra`.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::model::Edge;
use crate::network::Network;
use crate::storage::GraphBackend;
use crate::{Error, Result};

/// Directed comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Comparison {
    pub correct: usize,
    pub reversed: usize,
    pub missing: usize,
    pub extra: usize,
    pub reference_edges: usize,
    pub candidate_edges: usize,
}

impl Comparison {
    pub fn structural_distance(&self) -> usize {
        self.reversed + self.missing + self.extra
    }

    /// Correctly oriented candidate edges over all candidate edges.
    pub fn precision(&self) -> f64 {
        ratio(self.correct, self.candidate_edges)
    }

    /// Correctly oriented candidate edges over all reference edges.
    pub fn recall(&self) -> f64 {
        ratio(self.correct, self.reference_edges)
    }

    pub fn f1(&self) -> f64 {
        f1(self.precision(), self.recall())
    }
}

/// Comparison of the undirected skeletons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SkeletonComparison {
    pub shared: usize,
    pub missing: usize,
    pub extra: usize,
}

impl SkeletonComparison {
    pub fn structural_distance(&self) -> usize {
        self.missing + self.extra
    }

    pub fn precision(&self) -> f64 {
        ratio(self.shared, self.shared + self.extra)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.shared, self.shared + self.missing)
    }

    pub fn f1(&self) -> f64 {
        f1(self.precision(), self.recall())
    }
}

/// Classify every edge of `reference` and `candidate`. Both networks must
/// declare the same variables.
pub fn compare<D1, B1, D2, B2>(reference: &Network<D1, B1>, candidate: &Network<D2, B2>) -> Result<Comparison>
where
    B1: GraphBackend,
    B2: GraphBackend,
{
    check_same_nodes(reference, candidate)?;
    let ref_edges: HashSet<Edge> = reference.edges().into_iter().collect();
    let cand_edges: HashSet<Edge> = candidate.edges().into_iter().collect();

    let mut out = Comparison {
        reference_edges: ref_edges.len(),
        candidate_edges: cand_edges.len(),
        ..Comparison::default()
    };
    for edge in &ref_edges {
        if cand_edges.contains(edge) {
            out.correct += 1;
        } else if cand_edges.contains(&edge.reversed()) {
            out.reversed += 1;
        } else {
            out.missing += 1;
        }
    }
    out.extra = cand_edges
        .iter()
        .filter(|e| !ref_edges.contains(*e) && !ref_edges.contains(&e.reversed()))
        .count();
    Ok(out)
}

/// Compare the undirected skeletons, ignoring orientation.
pub fn compare_skeletons<D1, B1, D2, B2>(
    reference: &Network<D1, B1>,
    candidate: &Network<D2, B2>,
) -> Result<SkeletonComparison>
where
    B1: GraphBackend,
    B2: GraphBackend,
{
    check_same_nodes(reference, candidate)?;
    let ref_skeleton: HashSet<(String, String)> = reference.skeleton_edges().into_iter().collect();
    let cand_skeleton: HashSet<(String, String)> = candidate.skeleton_edges().into_iter().collect();
    let shared = ref_skeleton.intersection(&cand_skeleton).count();
    Ok(SkeletonComparison {
        shared,
        missing: ref_skeleton.len() - shared,
        extra: cand_skeleton.len() - shared,
    })
}

fn check_same_nodes<D1, B1, D2, B2>(a: &Network<D1, B1>, b: &Network<D2, B2>) -> Result<()>
where
    B1: GraphBackend,
    B2: GraphBackend,
{
    if let Some(name) = a.node_names().into_iter().find(|n| !b.contains(n)) {
        return Err(Error::UnknownIdentity(name.to_string()));
    }
    if let Some(name) = b.node_names().into_iter().find(|n| !a.contains(n)) {
        return Err(Error::UnknownIdentity(name.to_string()));
    }
    Ok(())
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}
