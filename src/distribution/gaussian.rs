//! Linear-Gaussian conditional distribution.
//!
//! `Y | parents ~ Normal(intercept + Σ coefficient_i * parent_i, variance)`
//!
//! Fitting is ordinary least squares. Parents are centred and scaled to unit
//! length before the normal equations are solved, so the singularity test
//! is a fixed tolerance on a correlation matrix rather than on raw sums.

use rand::Rng;
use rand_distr::{Distribution as _, Normal};

use super::{Conditional, NodeSchema};
use crate::model::Value;
use crate::{Error, Result};

/// Centred column sum of squares below this fraction of the raw sum of
/// squares counts as a constant column.
const CONSTANT_COLUMN_TOLERANCE: f64 = 1e-12;
/// Smallest acceptable pivot when eliminating the correlation matrix.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Linear-Gaussian conditional for a continuous node with continuous parents.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGaussian {
    intercept: f64,
    coefficients: Vec<f64>,
    variance: f64,
}

impl LinearGaussian {
    pub fn new(intercept: f64, coefficients: Vec<f64>, variance: f64) -> Result<Self> {
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidParameters(
                "linear-Gaussian intercept and coefficients must be finite".into(),
            ));
        }
        if !variance.is_finite() || variance < 0.0 {
            return Err(Error::InvalidParameters(format!(
                "variance must be finite and non-negative, got {variance}"
            )));
        }
        Ok(Self { intercept, coefficients, variance })
    }

    /// Root distribution with zero variance at `value`.
    pub fn point_mass(value: f64) -> Result<Self> {
        Self::new(value, Vec::new(), 0.0)
    }

    pub fn intercept(&self) -> f64 { self.intercept }
    pub fn coefficients(&self) -> &[f64] { &self.coefficients }
    pub fn variance(&self) -> f64 { self.variance }

    /// Linear predictor for the given parent values.
    pub fn mean(&self, parents: &[&Value]) -> Result<f64> {
        if parents.len() != self.coefficients.len() {
            return Err(Error::ShapeMismatch {
                node: String::new(),
                message: format!(
                    "expected {} parent values, got {}",
                    self.coefficients.len(),
                    parents.len()
                ),
            });
        }
        let mut mean = self.intercept;
        for (value, coefficient) in parents.iter().zip(&self.coefficients) {
            mean += coefficient * number(value)?;
        }
        Ok(mean)
    }

    /// Ordinary least squares of `own` on the parent columns plus intercept.
    pub fn fit(schema: &NodeSchema<'_>, parent_rows: &[Vec<&Value>], own: &[&Value]) -> Result<Self> {
        if !schema.domain.is_continuous() {
            return Err(schema.shape_error("linear-Gaussian fit on a discrete node"));
        }
        if let Some((name, _)) = schema.parents.iter().find(|(_, d)| !d.is_continuous()) {
            return Err(schema.shape_error(format!("parent '{name}' is discrete")));
        }

        let k = schema.parents.len();
        let n = own.len();
        let p = k + 1;
        if n <= p {
            return Err(Error::InsufficientData {
                node: schema.name.to_string(),
                message: format!("{n} rows cannot fit {p} parameters plus a variance"),
            });
        }

        let y: Vec<f64> = own
            .iter()
            .map(|v| number(v))
            .collect::<Result<_>>()
            .map_err(|e| e.at_node(schema.name))?;
        let mut x = Vec::with_capacity(n);
        for row in parent_rows {
            if row.len() != k {
                return Err(schema.shape_error(format!("row has {} parent values, expected {k}", row.len())));
            }
            let parsed: Vec<f64> = row
                .iter()
                .map(|v| number(v))
                .collect::<Result<_>>()
                .map_err(|e| e.at_node(schema.name))?;
            x.push(parsed);
        }

        let (intercept, coefficients) = least_squares(&x, &y, k).map_err(|message| Error::SingularDesign {
            node: schema.name.to_string(),
            message,
        })?;

        let rss: f64 = x
            .iter()
            .zip(&y)
            .map(|(row, yi)| {
                let fitted = intercept + row.iter().zip(&coefficients).map(|(a, b)| a * b).sum::<f64>();
                (yi - fitted).powi(2)
            })
            .sum();
        let variance = rss / (n - p) as f64;

        Self::new(intercept, coefficients, variance)
    }
}

impl Conditional for LinearGaussian {
    fn validate(&self, schema: &NodeSchema<'_>) -> Result<()> {
        if !schema.domain.is_continuous() {
            return Err(schema.shape_error("linear-Gaussian attached to a discrete node"));
        }
        if let Some((name, _)) = schema.parents.iter().find(|(_, d)| !d.is_continuous()) {
            return Err(schema.shape_error(format!("parent '{name}' is discrete")));
        }
        if schema.parents.len() != self.coefficients.len() {
            return Err(schema.shape_error(format!(
                "{} coefficients for {} parents",
                self.coefficients.len(),
                schema.parents.len()
            )));
        }
        Ok(())
    }

    fn sample<R: Rng + ?Sized>(&self, parents: &[&Value], rng: &mut R) -> Result<Value> {
        let mean = self.mean(parents)?;
        if self.variance == 0.0 {
            return Ok(Value::Number(mean));
        }
        let normal = Normal::new(mean, self.variance.sqrt())
            .map_err(|e| Error::InvalidParameters(format!("normal({mean}, {}): {e}", self.variance)))?;
        Ok(Value::Number(normal.sample(rng)))
    }

    fn probability_of(&self, value: &Value, parents: &[&Value]) -> Result<f64> {
        let x = number(value)?;
        let mean = self.mean(parents)?;
        if self.variance == 0.0 {
            let hit = (x - mean).abs() <= 1e-12 * mean.abs().max(1.0);
            return Ok(if hit { 1.0 } else { 0.0 });
        }
        let z = (x - mean).powi(2) / (2.0 * self.variance);
        Ok((-z).exp() / (2.0 * std::f64::consts::PI * self.variance).sqrt())
    }
}

fn number(value: &Value) -> Result<f64> {
    match value {
        Value::Number(v) if v.is_finite() => Ok(*v),
        other => Err(Error::InvalidValue {
            node: String::new(),
            value: other.to_string(),
            expected: "a finite number".into(),
        }),
    }
}

/// OLS with intercept on `k` regressors. Returns (intercept, coefficients) or
/// a description of the rank deficiency.
fn least_squares(x: &[Vec<f64>], y: &[f64], k: usize) -> std::result::Result<(f64, Vec<f64>), String> {
    let n = y.len() as f64;
    let y_mean = y.iter().sum::<f64>() / n;
    if k == 0 {
        return Ok((y_mean, Vec::new()));
    }

    let means: Vec<f64> = (0..k).map(|j| x.iter().map(|r| r[j]).sum::<f64>() / n).collect();

    let mut scales = Vec::with_capacity(k);
    for j in 0..k {
        let raw: f64 = x.iter().map(|r| r[j] * r[j]).sum();
        let centred: f64 = x.iter().map(|r| (r[j] - means[j]).powi(2)).sum();
        if centred <= CONSTANT_COLUMN_TOLERANCE * raw.max(f64::MIN_POSITIVE) {
            return Err(format!("parent column {j} is constant and collinear with the intercept"));
        }
        scales.push(centred.sqrt());
    }

    let z: Vec<Vec<f64>> = x
        .iter()
        .map(|r| (0..k).map(|j| (r[j] - means[j]) / scales[j]).collect())
        .collect();

    let mut gram = vec![vec![0.0; k]; k];
    let mut rhs = vec![0.0; k];
    for (row, yi) in z.iter().zip(y) {
        for a in 0..k {
            rhs[a] += row[a] * (yi - y_mean);
            for b in a..k {
                gram[a][b] += row[a] * row[b];
            }
        }
    }
    for a in 0..k {
        for b in 0..a {
            gram[a][b] = gram[b][a];
        }
    }

    let gamma = solve(gram, rhs).ok_or_else(|| "parent columns are linearly dependent".to_string())?;
    let coefficients: Vec<f64> = gamma.iter().zip(&scales).map(|(g, s)| g / s).collect();
    let intercept = y_mean - coefficients.iter().zip(&means).map(|(b, m)| b * m).sum::<f64>();
    Ok((intercept, coefficients))
}

/// Gaussian elimination with partial pivoting. `None` when a pivot falls
/// below tolerance.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot_row][col].abs() < PIVOT_TOLERANCE {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for c in col..n {
                a[row][c] -= factor * a[col][c];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut out = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|c| a[row][c] * out[c]).sum();
        out[row] = (b[row] - tail) / a[row][row];
    }
    Some(out)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Domain;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn nums(xs: &[f64]) -> Vec<Value> {
        xs.iter().map(|x| Value::from(*x)).collect()
    }

    #[test]
    fn test_new_rejects_bad_variance() {
        assert!(LinearGaussian::new(0.0, vec![], -1.0).is_err());
        assert!(LinearGaussian::new(0.0, vec![], f64::NAN).is_err());
        assert!(LinearGaussian::new(f64::INFINITY, vec![], 1.0).is_err());
    }

    #[test]
    fn test_ols_recovers_noiseless_coefficients() {
        let cont = Domain::Continuous;
        let schema = NodeSchema::new("Y", &cont).with_parent("A", &cont).with_parent("B", &cont);

        let a = nums(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let b = nums(&[1.0, -1.0, 2.0, 0.5, 3.0, -2.0]);
        let y: Vec<Value> = a
            .iter()
            .zip(&b)
            .map(|(a, b)| Value::from(1.5 + 2.0 * a.as_number().unwrap() - 0.5 * b.as_number().unwrap()))
            .collect();

        let parents: Vec<Vec<&Value>> = a.iter().zip(&b).map(|(a, b)| vec![a, b]).collect();
        let own: Vec<&Value> = y.iter().collect();
        let g = LinearGaussian::fit(&schema, &parents, &own).unwrap();

        assert!((g.intercept() - 1.5).abs() < 1e-9);
        assert!((g.coefficients()[0] - 2.0).abs() < 1e-9);
        assert!((g.coefficients()[1] + 0.5).abs() < 1e-9);
        assert!(g.variance() < 1e-18);
    }

    #[test]
    fn test_root_fit_is_mean_and_sample_variance() {
        let cont = Domain::Continuous;
        let schema = NodeSchema::new("Y", &cont);
        let y = nums(&[1.0, 2.0, 3.0, 4.0]);
        let own: Vec<&Value> = y.iter().collect();
        let g = LinearGaussian::fit(&schema, &[vec![], vec![], vec![], vec![]], &own).unwrap();
        assert!((g.intercept() - 2.5).abs() < 1e-12);
        assert!((g.variance() - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_parent_is_singular() {
        let cont = Domain::Continuous;
        let schema = NodeSchema::new("Y", &cont).with_parent("A", &cont);
        let a = nums(&[0.1, 0.1, 0.1, 0.1]);
        let y = nums(&[1.0, 2.0, 3.0, 4.0]);
        let parents: Vec<Vec<&Value>> = a.iter().map(|v| vec![v]).collect();
        let own: Vec<&Value> = y.iter().collect();
        let err = LinearGaussian::fit(&schema, &parents, &own).unwrap_err();
        assert!(matches!(err, Error::SingularDesign { .. }));
    }

    #[test]
    fn test_collinear_parents_are_singular() {
        let cont = Domain::Continuous;
        let schema = NodeSchema::new("Y", &cont).with_parent("A", &cont).with_parent("B", &cont);
        let a = nums(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let b = nums(&[2.0, 4.0, 6.0, 8.0, 10.0]);
        let y = nums(&[1.0, 0.0, 2.0, 1.0, 3.0]);
        let parents: Vec<Vec<&Value>> = a.iter().zip(&b).map(|(a, b)| vec![a, b]).collect();
        let own: Vec<&Value> = y.iter().collect();
        let err = LinearGaussian::fit(&schema, &parents, &own).unwrap_err();
        assert!(matches!(err, Error::SingularDesign { .. }));
    }

    #[test]
    fn test_too_few_rows() {
        let cont = Domain::Continuous;
        let schema = NodeSchema::new("Y", &cont).with_parent("A", &cont);
        let a = nums(&[1.0, 2.0]);
        let y = nums(&[1.0, 2.0]);
        let parents: Vec<Vec<&Value>> = a.iter().map(|v| vec![v]).collect();
        let own: Vec<&Value> = y.iter().collect();
        let err = LinearGaussian::fit(&schema, &parents, &own).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { .. }));
    }

    #[test]
    fn test_discrete_parent_rejected() {
        let cont = Domain::Continuous;
        let binary = Domain::binary();
        let schema = NodeSchema::new("Y", &cont).with_parent("A", &binary);
        let g = LinearGaussian::new(0.0, vec![1.0], 1.0).unwrap();
        assert!(g.validate(&schema).is_err());
    }

    #[test]
    fn test_density_and_sampling() {
        let g = LinearGaussian::new(1.0, vec![2.0], 4.0).unwrap();
        let parent = Value::from(1.0);
        let peak = g.probability_of(&Value::from(3.0), &[&parent]).unwrap();
        assert!((peak - 1.0 / (8.0 * std::f64::consts::PI).sqrt()).abs() < 1e-12);

        let mut rng = StdRng::seed_from_u64(11);
        let n = 4000;
        let mean = (0..n)
            .map(|_| g.sample(&[&parent], &mut rng).unwrap().as_number().unwrap())
            .sum::<f64>()
            / n as f64;
        assert!((mean - 3.0).abs() < 0.15, "sample mean {mean}");
    }

    #[test]
    fn test_wrong_parent_count() {
        let g = LinearGaussian::new(0.0, vec![1.0], 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(g.sample(&[], &mut rng).is_err());
    }
}
