//! Conditional probability table (CPT).
//!
//! A table maps each combination of parent level indices (an [`Assignment`])
//! to a probability vector over the node's own levels. The table may be
//! sparse when built by hand; fitted tables cover every combination.
//!
//! ```text
//! Y ∈ {0, 1}, parents [X ∈ {a, b}, Z ∈ {0, 1}]
//!
//!   [0, 0] → [0.9, 0.1]    P(Y | X=a, Z=0)
//!   [0, 1] → [0.6, 0.4]    P(Y | X=a, Z=1)
//!   [1, 0] → [0.3, 0.7]    P(Y | X=b, Z=0)
//!   [1, 1] → [0.5, 0.5]    P(Y | X=b, Z=1)
//! ```

use std::borrow::Cow;

use hashbrown::HashMap;
use rand::Rng;
use smallvec::SmallVec;

use super::{Conditional, NodeSchema};
use crate::config::{FallbackPolicy, FitConfig};
use crate::model::Value;
use crate::{Error, Result};

/// Parent level indices, one per parent, in network parent order.
pub type Assignment = SmallVec<[usize; 4]>;

/// Tolerance for hand-written rows.
const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Tolerance for rows produced by [`Cpt::fit`].
const FITTED_ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Conditional probability table for a discrete node.
#[derive(Debug, Clone, PartialEq)]
pub struct Cpt {
    levels: Vec<String>,
    parent_levels: Vec<Vec<String>>,
    rows: HashMap<Assignment, Vec<f64>>,
    policy: FallbackPolicy,
}

impl Cpt {
    /// Empty table for a node with `levels`, whose parents have
    /// `parent_levels` (network parent order).
    pub fn new(levels: Vec<String>, parent_levels: Vec<Vec<String>>) -> Result<Self> {
        if levels.is_empty() {
            return Err(Error::InvalidParameters("CPT needs at least one level".into()));
        }
        if parent_levels.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidParameters("CPT parent with no levels".into()));
        }
        Ok(Self {
            levels,
            parent_levels,
            rows: HashMap::new(),
            policy: FallbackPolicy::default(),
        })
    }

    /// Empty table shaped after `schema`. All parents must be discrete.
    pub fn from_schema(schema: &NodeSchema<'_>) -> Result<Self> {
        let levels = schema
            .domain
            .levels()
            .ok_or_else(|| schema.shape_error("CPT on a continuous node"))?
            .to_vec();
        let mut parent_levels = Vec::with_capacity(schema.parents.len());
        for (name, domain) in &schema.parents {
            let pl = domain
                .levels()
                .ok_or_else(|| schema.shape_error(format!("parent '{name}' is continuous")))?;
            parent_levels.push(pl.to_vec());
        }
        Self::new(levels, parent_levels)
    }

    /// Root table that puts all mass on `level`.
    pub fn point_mass(levels: Vec<String>, level: &str) -> Result<Self> {
        let idx = levels.iter().position(|l| l == level).ok_or_else(|| Error::InvalidValue {
            node: String::new(),
            value: level.to_string(),
            expected: "a declared level".into(),
        })?;
        let mut probs = vec![0.0; levels.len()];
        probs[idx] = 1.0;
        let mut cpt = Self::new(levels, Vec::new())?;
        cpt.rows.insert(Assignment::new(), probs);
        Ok(cpt)
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn levels(&self) -> &[String] { &self.levels }
    pub fn parent_levels(&self) -> &[Vec<String>] { &self.parent_levels }
    pub fn policy(&self) -> FallbackPolicy { self.policy }

    /// Number of parent-level combinations the table can address.
    pub fn combinations(&self) -> usize {
        self.parent_levels.iter().map(|p| p.len()).product()
    }

    /// Whether every combination has an explicit row.
    pub fn is_complete(&self) -> bool {
        self.rows.len() == self.combinations()
    }

    /// Explicit row for a parent assignment given as labels.
    pub fn row(&self, parent_labels: &[&str]) -> Option<&[f64]> {
        let assignment = self.resolve_labels(parent_labels).ok()?;
        self.rows.get(&assignment).map(|r| r.as_slice())
    }

    /// Explicit rows in lexicographic assignment order (first parent slowest).
    pub fn sorted_rows(&self) -> Vec<(&Assignment, &[f64])> {
        let mut rows: Vec<_> = self.rows.iter().map(|(a, r)| (a, r.as_slice())).collect();
        rows.sort_by(|x, y| x.0.cmp(y.0));
        rows
    }

    /// Level labels for an assignment.
    pub fn labels_of(&self, assignment: &[usize]) -> Vec<&str> {
        assignment
            .iter()
            .zip(&self.parent_levels)
            .filter_map(|(&i, levels)| levels.get(i).map(String::as_str))
            .collect()
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Set P(self | parents = `parent_labels`).
    pub fn set_row(&mut self, parent_labels: &[&str], probabilities: Vec<f64>) -> Result<()> {
        let assignment = self.resolve_labels(parent_labels)?;
        self.set_row_at(assignment, probabilities)
    }

    pub(crate) fn set_row_at(&mut self, assignment: Assignment, probabilities: Vec<f64>) -> Result<()> {
        if probabilities.len() != self.levels.len() {
            return Err(Error::InvalidParameters(format!(
                "CPT row has {} entries for {} levels",
                probabilities.len(),
                self.levels.len()
            )));
        }
        if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(Error::InvalidParameters(format!(
                "CPT row contains a negative or non-finite probability: {probabilities:?}"
            )));
        }
        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(Error::InvalidParameters(format!("CPT row sums to {sum}, expected 1")));
        }
        self.rows.insert(assignment, probabilities);
        Ok(())
    }

    // ========================================================================
    // Fitting
    // ========================================================================

    /// Maximum-likelihood estimate (plus optional additive smoothing) from
    /// paired observations.
    pub fn fit(
        schema: &NodeSchema<'_>,
        parent_rows: &[Vec<&Value>],
        own: &[&Value],
        config: &FitConfig,
    ) -> Result<Self> {
        config.validate()?;
        let mut cpt = Self::from_schema(schema)?.with_policy(config.policy);
        let n_levels = cpt.levels.len();

        let mut counts: HashMap<Assignment, Vec<f64>> = HashMap::new();
        for (parents, value) in parent_rows.iter().zip(own) {
            let assignment = cpt.resolve(parents).map_err(|e| e.at_node(schema.name))?;
            let idx = cpt.level_of(value).map_err(|e| e.at_node(schema.name))?;
            counts.entry(assignment).or_insert_with(|| vec![0.0; n_levels])[idx] += 1.0;
        }

        for assignment in all_assignments(&cpt.cardinalities()) {
            let row = match counts.remove(&assignment) {
                Some(c) => {
                    let total: f64 = c.iter().sum::<f64>() + config.pseudo_count * n_levels as f64;
                    c.iter().map(|n| (n + config.pseudo_count) / total).collect()
                }
                None => match config.policy {
                    FallbackPolicy::UniformFallback => uniform(n_levels),
                    FallbackPolicy::Strict => {
                        return Err(Error::InsufficientData {
                            node: schema.name.to_string(),
                            message: format!(
                                "no training rows for parent assignment ({})",
                                cpt.labels_of(&assignment).join(", ")
                            ),
                        });
                    }
                },
            };
            debug_assert!(
                (row.iter().sum::<f64>() - 1.0).abs() <= FITTED_ROW_SUM_TOLERANCE,
                "fitted row for '{}' does not sum to 1",
                schema.name
            );
            cpt.rows.insert(assignment, row);
        }
        Ok(cpt)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    fn cardinalities(&self) -> Vec<usize> {
        self.parent_levels.iter().map(|p| p.len()).collect()
    }

    fn resolve_labels(&self, labels: &[&str]) -> Result<Assignment> {
        if labels.len() != self.parent_levels.len() {
            return Err(Error::ShapeMismatch {
                node: String::new(),
                message: format!(
                    "expected {} parent values, got {}",
                    self.parent_levels.len(),
                    labels.len()
                ),
            });
        }
        labels
            .iter()
            .zip(&self.parent_levels)
            .map(|(label, levels)| {
                levels.iter().position(|l| l == label).ok_or_else(|| Error::InvalidValue {
                    node: String::new(),
                    value: label.to_string(),
                    expected: format!("one of {levels:?}"),
                })
            })
            .collect()
    }

    /// Map parent values to level indices.
    fn resolve(&self, parents: &[&Value]) -> Result<Assignment> {
        let mut labels: SmallVec<[&str; 4]> = SmallVec::with_capacity(parents.len());
        for value in parents {
            labels.push(value.as_level().ok_or_else(|| Error::InvalidValue {
                node: String::new(),
                value: value.to_string(),
                expected: "a parent level".into(),
            })?);
        }
        self.resolve_labels(&labels)
    }

    fn level_of(&self, value: &Value) -> Result<usize> {
        value
            .as_level()
            .and_then(|l| self.levels.iter().position(|x| x == l))
            .ok_or_else(|| Error::InvalidValue {
                node: String::new(),
                value: value.to_string(),
                expected: format!("one of {:?}", self.levels),
            })
    }

    /// Probability vector for a parent assignment, applying the fallback
    /// policy to missing rows.
    fn distribution_for(&self, assignment: &Assignment) -> Result<Cow<'_, [f64]>> {
        if let Some(row) = self.rows.get(assignment) {
            return Ok(Cow::Borrowed(row.as_slice()));
        }
        match self.policy {
            FallbackPolicy::UniformFallback => Ok(Cow::Owned(uniform(self.levels.len()))),
            FallbackPolicy::Strict => Err(Error::UnseenCombination {
                node: String::new(),
                assignment: self.labels_of(assignment).join(", "),
            }),
        }
    }
}

impl Conditional for Cpt {
    fn validate(&self, schema: &NodeSchema<'_>) -> Result<()> {
        let levels = schema
            .domain
            .levels()
            .ok_or_else(|| schema.shape_error("CPT attached to a continuous node"))?;
        if levels != self.levels.as_slice() {
            return Err(schema.shape_error(format!(
                "CPT levels {:?} differ from node levels {levels:?}",
                self.levels
            )));
        }
        if schema.parents.len() != self.parent_levels.len() {
            return Err(schema.shape_error(format!(
                "CPT has {} parents, node has {}",
                self.parent_levels.len(),
                schema.parents.len()
            )));
        }
        for ((name, domain), expected) in schema.parents.iter().zip(&self.parent_levels) {
            match domain.levels() {
                Some(actual) if actual == expected.as_slice() => {}
                Some(actual) => {
                    return Err(schema.shape_error(format!(
                        "parent '{name}' has levels {actual:?}, CPT expects {expected:?}"
                    )));
                }
                None => return Err(schema.shape_error(format!("parent '{name}' is continuous"))),
            }
        }
        Ok(())
    }

    /// Cumulative-probability inversion of one uniform draw.
    fn sample<R: Rng + ?Sized>(&self, parents: &[&Value], rng: &mut R) -> Result<Value> {
        let assignment = self.resolve(parents)?;
        let probs = self.distribution_for(&assignment)?;
        let u: f64 = rng.gen_range(0.0..1.0);
        let mut cumulative = 0.0;
        for (idx, p) in probs.iter().enumerate() {
            cumulative += p;
            if u < cumulative {
                return Ok(Value::Level(self.levels[idx].clone()));
            }
        }
        // Rounding left the cumulative sum just short of 1: take the last
        // level with non-zero mass.
        let idx = probs.iter().rposition(|p| *p > 0.0).unwrap_or(self.levels.len() - 1);
        Ok(Value::Level(self.levels[idx].clone()))
    }

    fn probability_of(&self, value: &Value, parents: &[&Value]) -> Result<f64> {
        let assignment = self.resolve(parents)?;
        let idx = self.level_of(value)?;
        Ok(self.distribution_for(&assignment)?[idx])
    }
}

fn uniform(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

/// Every assignment over the given cardinalities, first position slowest.
/// No parents yields the single empty assignment.
pub(crate) fn all_assignments(cardinalities: &[usize]) -> Vec<Assignment> {
    let total: usize = cardinalities.iter().product();
    let mut out = Vec::with_capacity(total);
    let mut current: Assignment = cardinalities.iter().map(|_| 0).collect();
    for _ in 0..total {
        out.push(current.clone());
        for pos in (0..cardinalities.len()).rev() {
            current[pos] += 1;
            if current[pos] < cardinalities[pos] {
                break;
            }
            current[pos] = 0;
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
