//! Declared domain of a variable.

use serde::{Deserialize, Serialize};

use super::Value;
use crate::{Error, Result};

/// The set of values a variable may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Domain {
    /// Finite, ordered set of category labels.
    Discrete { levels: Vec<String> },
    /// The real line.
    Continuous,
}

impl Domain {
    pub fn discrete(levels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Domain::Discrete { levels: levels.into_iter().map(Into::into).collect() }
    }

    /// Two-level domain with labels `"0"` and `"1"`.
    pub fn binary() -> Self {
        Self::discrete(["0", "1"])
    }

    pub fn is_discrete(&self) -> bool { matches!(self, Domain::Discrete { .. }) }
    pub fn is_continuous(&self) -> bool { matches!(self, Domain::Continuous) }

    pub fn levels(&self) -> Option<&[String]> {
        match self {
            Domain::Discrete { levels } => Some(levels),
            Domain::Continuous => None,
        }
    }

    /// Number of levels; `None` for continuous domains.
    pub fn cardinality(&self) -> Option<usize> {
        self.levels().map(|l| l.len())
    }

    pub fn level_index(&self, level: &str) -> Option<usize> {
        self.levels()?.iter().position(|l| l == level)
    }

    /// Reject empty or duplicated level sets.
    pub fn validate(&self, name: &str) -> Result<()> {
        if let Domain::Discrete { levels } = self {
            if levels.is_empty() {
                return Err(Error::InvalidDomain {
                    node: name.to_string(),
                    message: "discrete domain needs at least one level".into(),
                });
            }
            for (i, level) in levels.iter().enumerate() {
                if levels[..i].contains(level) {
                    return Err(Error::InvalidDomain {
                        node: name.to_string(),
                        message: format!("level '{level}' declared twice"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether `value` is a member of this domain.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (Domain::Discrete { levels }, Value::Level(l)) => levels.contains(l),
            (Domain::Continuous, Value::Number(v)) => v.is_finite(),
            _ => false,
        }
    }
}
