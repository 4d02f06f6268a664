//! # Conditional Distributions
//!
//! Each node carries one distribution over its own domain given the values of
//! its parents. The set of variants is closed:
//!
//! | Variant | Type | Parents | Own domain |
//! |---------|------|---------|------------|
//! | `Discrete` | [`Cpt`] | all discrete | discrete |
//! | `Gaussian` | [`LinearGaussian`] | all continuous | continuous |
//!
//! Sampling and lookup go through the [`Conditional`] trait, which is what the
//! sampler is generic over. `Distribution` is the production implementation;
//! tests plug in recording doubles.

pub mod discrete;
pub mod gaussian;

use rand::Rng;

use crate::config::FitConfig;
use crate::model::{Domain, Value};
use crate::{Error, Result};

pub use discrete::{Assignment, Cpt};
pub use gaussian::LinearGaussian;

// ============================================================================
// Schema
// ============================================================================

/// Shape a distribution must agree with: the node's own domain plus its
/// parents' domains, parents in network insertion order.
#[derive(Debug, Clone)]
pub struct NodeSchema<'a> {
    pub name: &'a str,
    pub domain: &'a Domain,
    pub parents: Vec<(&'a str, &'a Domain)>,
}

impl<'a> NodeSchema<'a> {
    pub fn new(name: &'a str, domain: &'a Domain) -> Self {
        Self { name, domain, parents: Vec::new() }
    }

    pub fn with_parent(mut self, name: &'a str, domain: &'a Domain) -> Self {
        self.parents.push((name, domain));
        self
    }

    pub fn parent_names(&self) -> Vec<&'a str> {
        self.parents.iter().map(|(n, _)| *n).collect()
    }

    pub(crate) fn shape_error(&self, message: impl Into<String>) -> Error {
        Error::ShapeMismatch {
            node: self.name.to_string(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Conditional trait
// ============================================================================

/// The sampling half of the distribution contract.
pub trait Conditional {
    /// Check that this distribution's parameter shape matches `schema`.
    fn validate(&self, schema: &NodeSchema<'_>) -> Result<()>;

    /// Draw one realization given concrete parent values (network parent
    /// order).
    fn sample<R: Rng + ?Sized>(&self, parents: &[&Value], rng: &mut R) -> Result<Value>;

    /// Probability mass (discrete) or density (continuous) of `value`.
    fn probability_of(&self, value: &Value, parents: &[&Value]) -> Result<f64>;
}

// ============================================================================
// Distribution
// ============================================================================

/// A node's conditional distribution.
#[derive(Debug, Clone, PartialEq)]
pub enum Distribution {
    Discrete(Cpt),
    Gaussian(LinearGaussian),
}

impl Distribution {
    /// Estimate parameters from paired observations.
    ///
    /// `parent_rows[i]` holds row `i`'s parent values in schema order;
    /// `own[i]` is the node's value in the same row.
    pub fn fit(
        schema: &NodeSchema<'_>,
        parent_rows: &[Vec<&Value>],
        own: &[&Value],
        config: &FitConfig,
    ) -> Result<Self> {
        if parent_rows.len() != own.len() {
            return Err(schema.shape_error(format!(
                "{} parent rows but {} observations",
                parent_rows.len(),
                own.len()
            )));
        }
        match schema.domain {
            Domain::Discrete { .. } => {
                Ok(Distribution::Discrete(Cpt::fit(schema, parent_rows, own, config)?))
            }
            Domain::Continuous => {
                Ok(Distribution::Gaussian(LinearGaussian::fit(schema, parent_rows, own)?))
            }
        }
    }

    /// Degenerate distribution that always yields `value`, with no parents.
    pub fn point_mass(domain: &Domain, value: &Value) -> Result<Self> {
        match (domain, value) {
            (Domain::Discrete { levels }, Value::Level(level)) => {
                Ok(Distribution::Discrete(Cpt::point_mass(levels.clone(), level)?))
            }
            (Domain::Continuous, Value::Number(v)) => {
                Ok(Distribution::Gaussian(LinearGaussian::point_mass(*v)?))
            }
            _ => Err(Error::InvalidValue {
                node: String::new(),
                value: value.to_string(),
                expected: domain_label(domain).into(),
            }),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Distribution::Discrete(_) => "discrete",
            Distribution::Gaussian(_) => "gaussian",
        }
    }

    pub fn as_discrete(&self) -> Option<&Cpt> {
        match self {
            Distribution::Discrete(cpt) => Some(cpt),
            _ => None,
        }
    }

    pub fn as_gaussian(&self) -> Option<&LinearGaussian> {
        match self {
            Distribution::Gaussian(g) => Some(g),
            _ => None,
        }
    }
}

impl Conditional for Distribution {
    fn validate(&self, schema: &NodeSchema<'_>) -> Result<()> {
        match self {
            Distribution::Discrete(cpt) => cpt.validate(schema),
            Distribution::Gaussian(g) => g.validate(schema),
        }
    }

    fn sample<R: Rng + ?Sized>(&self, parents: &[&Value], rng: &mut R) -> Result<Value> {
        match self {
            Distribution::Discrete(cpt) => cpt.sample(parents, rng),
            Distribution::Gaussian(g) => g.sample(parents, rng),
        }
    }

    fn probability_of(&self, value: &Value, parents: &[&Value]) -> Result<f64> {
        match self {
            Distribution::Discrete(cpt) => cpt.probability_of(value, parents),
            Distribution::Gaussian(g) => g.probability_of(value, parents),
        }
    }
}

impl From<Cpt> for Distribution {
    fn from(cpt: Cpt) -> Self { Distribution::Discrete(cpt) }
}

impl From<LinearGaussian> for Distribution {
    fn from(g: LinearGaussian) -> Self { Distribution::Gaussian(g) }
}

pub(crate) fn domain_label(domain: &Domain) -> &'static str {
    match domain {
        Domain::Discrete { .. } => "a declared level",
        Domain::Continuous => "a finite number",
    }
}
