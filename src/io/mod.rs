//! # Structural I/O
//!
//! | Format | Module | Carries |
//! |--------|--------|---------|
//! | Modelstring `[A][B|A]` | `modelstring` | structure only |
//! | JSON definition | `definition` | structure, domains, parameters |

pub mod definition;
pub mod modelstring;

pub use definition::{
    dump, from_definition, from_json, load, to_definition, to_json, CptRow, DistributionDefinition,
    NetworkDefinition, NodeDefinition,
};
pub use modelstring::ModelString;
