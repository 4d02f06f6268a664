//! # baynet: Bayesian Networks in Rust
//!
//! Build a DAG over random variables, attach a conditional distribution to
//! every node, then draw synthetic data by ancestral sampling, re-estimate
//! parameters from data, or score one structure against another.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphBackend` is the contract between the engine and
//!    graph storage; `Conditional` is the contract between the sampler and
//!    per-node distributions
//! 2. **The DAG is never cyclic**: every edge insertion is checked before it
//!    takes effect, rejected edges leave the network untouched
//! 3. **Randomness is a parameter**: every sampling entry point takes the RNG
//!    explicitly, so runs are reproducible from a seed
//! 4. **Fail fast**: unfitted or partially fitted networks refuse to sample
//!
//! ## Quick Start
//!
//! ```rust
//! use baynet::{Cpt, Domain, Network, Result};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! # fn main() -> Result<()> {
//! let mut net = Network::new();
//! net.add_node("Cloudy", Domain::binary())?;
//! net.add_node("Rain", Domain::binary())?;
//! net.add_edge("Cloudy", "Rain")?;
//!
//! let mut cloudy = Cpt::new(vec!["0".into(), "1".into()], vec![])?;
//! cloudy.set_row(&[], vec![0.5, 0.5])?;
//! net.attach_distribution("Cloudy", cloudy.into())?;
//!
//! let mut rain = Cpt::new(vec!["0".into(), "1".into()], vec![vec!["0".into(), "1".into()]])?;
//! rain.set_row(&["0"], vec![0.8, 0.2])?;
//! rain.set_row(&["1"], vec![0.2, 0.8])?;
//! net.attach_distribution("Rain", rain.into())?;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let data = net.sample(100, &mut rng)?;
//! assert_eq!(data.len(), 100);
//! assert_eq!(data.columns(), ["Cloudy", "Rain"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Role |
//! |--------|------|
//! | `model` | DTOs: `Value`, `Domain`, `Node`, `Edge` |
//! | `storage` | `GraphBackend` trait + `MemoryBackend` |
//! | `network` | The DAG and its invariants |
//! | `distribution` | `Cpt`, `LinearGaussian`, `Conditional` |
//! | `sampler` / `fitter` | Ancestral sampling / parameter estimation |
//! | `compare` | Structural distance between two DAGs |
//! | `parameters` | Random ground-truth parameters |
//! | `io` | Modelstring and JSON definitions |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod storage;
pub mod config;
pub mod distribution;
pub mod network;
pub mod dataset;
pub mod sampler;
pub mod fitter;
pub mod compare;
pub mod parameters;
pub mod io;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{Node, NodeId, Edge, Domain, Value};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use storage::{GraphBackend, MemoryBackend};
pub use network::{Network, NetworkKind};
pub use distribution::{Conditional, Cpt, Distribution, LinearGaussian, NodeSchema};
pub use dataset::{Dataset, Row};
pub use config::{FallbackPolicy, FitConfig, DiscreteParameters, GaussianParameters, LevelParameters};
pub use fitter::FitReport;
pub use compare::{Comparison, SkeletonComparison, compare, compare_skeletons};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Duplicate identity: node '{0}' already exists")]
    DuplicateIdentity(String),

    #[error("Unknown identity: no node named '{0}'")]
    UnknownIdentity(String),

    #[error("Duplicate edge: {parent} -> {child} already exists")]
    DuplicateEdge { parent: String, child: String },

    #[error("Unknown edge: {parent} -> {child} does not exist")]
    UnknownEdge { parent: String, child: String },

    #[error("Invalid domain for '{node}': {message}")]
    InvalidDomain { node: String, message: String },

    #[error("Cycle error: edge {parent} -> {child} would close a directed cycle")]
    CycleError { parent: String, child: String },

    #[error("Insufficient data for '{node}': {message}")]
    InsufficientData { node: String, message: String },

    #[error("Singular design for '{node}': {message}")]
    SingularDesign { node: String, message: String },

    #[error("Unseen parent combination for '{node}': ({assignment})")]
    UnseenCombination { node: String, assignment: String },

    #[error("Invalid value for '{node}': got {value}, expected {expected}")]
    InvalidValue { node: String, value: String, expected: String },

    #[error("Missing column: dataset has no column '{0}'")]
    MissingColumn(String),

    #[error("Shape mismatch for '{node}': {message}")]
    ShapeMismatch { node: String, message: String },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Unfitted network: no valid distribution for {0:?}")]
    UnfittedNetwork(Vec<String>),

    #[error("Parse error at position {position}: {message}")]
    ParseError { position: usize, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Fill in the node name on node-scoped errors raised below the network
    /// layer, where the name is not known. Already named errors are kept.
    pub fn at_node(self, name: &str) -> Self {
        match self {
            Error::InsufficientData { node, message } if node.is_empty() => {
                Error::InsufficientData { node: name.to_string(), message }
            }
            Error::SingularDesign { node, message } if node.is_empty() => {
                Error::SingularDesign { node: name.to_string(), message }
            }
            Error::UnseenCombination { node, assignment } if node.is_empty() => {
                Error::UnseenCombination { node: name.to_string(), assignment }
            }
            Error::InvalidValue { node, value, expected } if node.is_empty() => {
                Error::InvalidValue { node: name.to_string(), value, expected }
            }
            Error::ShapeMismatch { node, message } if node.is_empty() => {
                Error::ShapeMismatch { node: name.to_string(), message }
            }
            other => other,
        }
    }

    /// Distinct non-zero process exit code per error kind, for command-line
    /// front ends.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::DuplicateIdentity(_) => 10,
            Error::UnknownIdentity(_) => 11,
            Error::DuplicateEdge { .. } => 12,
            Error::UnknownEdge { .. } => 13,
            Error::InvalidDomain { .. } => 14,
            Error::CycleError { .. } => 20,
            Error::InsufficientData { .. } => 30,
            Error::SingularDesign { .. } => 31,
            Error::UnseenCombination { .. } => 32,
            Error::InvalidValue { .. } => 33,
            Error::MissingColumn(_) => 34,
            Error::ShapeMismatch { .. } => 35,
            Error::InvalidParameters(_) => 36,
            Error::UnfittedNetwork(_) => 40,
            Error::ParseError { .. } => 50,
            Error::Serialization(_) => 51,
            Error::Io(_) => 52,
            Error::Internal(_) => 70,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
