//! Node in the Bayesian network.

use serde::{Deserialize, Serialize};
use super::Domain;

/// Opaque node identifier. Allocated by the backend in insertion order, so
/// comparing two ids compares their insertion rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A variable of the network together with its (optional) conditional
/// distribution. Parents are not stored here; they live in the edge relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<D> {
    pub id: NodeId,
    pub name: String,
    pub domain: Domain,
    pub(crate) distribution: Option<D>,
}

impl<D> Node<D> {
    pub fn new(id: NodeId, name: impl Into<String>, domain: Domain) -> Self {
        Self {
            id,
            name: name.into(),
            domain,
            distribution: None,
        }
    }

    pub fn distribution(&self) -> Option<&D> {
        self.distribution.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.distribution.is_some()
    }
}
