//! # Network Model
//!
//! Plain DTOs shared by every layer: storage ↔ network ↔ sampler ↔ fitter ↔ user.
//!
//! Design rule: this module is pure data. No RNG, no graph traversal, no I/O.

pub mod node;
pub mod edge;
pub mod domain;
pub mod value;

pub use node::{Node, NodeId};
pub use edge::Edge;
pub use domain::Domain;
pub use value::Value;
