//! Directed edge between two variables.

use serde::{Deserialize, Serialize};

/// A directed edge `parent -> child`, addressed by variable identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub parent: String,
    pub child: String,
}

impl Edge {
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self { parent: parent.into(), child: child.into() }
    }

    /// The same pair with the direction flipped.
    pub fn reversed(&self) -> Self {
        Self { parent: self.child.clone(), child: self.parent.clone() }
    }

    /// Unordered form of the edge (endpoints sorted by name).
    pub fn undirected(&self) -> (String, String) {
        if self.parent <= self.child {
            (self.parent.clone(), self.child.clone())
        } else {
            (self.child.clone(), self.parent.clone())
        }
    }
}

impl<P: Into<String>, C: Into<String>> From<(P, C)> for Edge {
    fn from((parent, child): (P, C)) -> Self {
        Edge::new(parent, child)
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.parent, self.child)
    }
}
