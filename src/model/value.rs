//! Realized value of a random variable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single realization: a category label for discrete variables, a real
/// number for continuous ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Level(String),
    Number(f64),
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Level(_) => "LEVEL",
            Value::Number(_) => "NUMBER",
        }
    }

    pub fn is_level(&self) -> bool { matches!(self, Value::Level(_)) }
    pub fn is_number(&self) -> bool { matches!(self, Value::Number(_)) }

    /// Attempt to extract as a level label
    pub fn as_level(&self) -> Option<&str> {
        match self {
            Value::Level(s) => Some(s),
            _ => None,
        }
    }

    /// Attempt to extract as f64
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<f64> for Value { fn from(v: f64) -> Self { Value::Number(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::Level(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::Level(v.to_owned()) } }

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Level(s) => write!(f, "{s}"),
            Value::Number(v) => write!(f, "{v}"),
        }
    }
}
