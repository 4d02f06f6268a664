//! Row-major table of observations keyed by variable name.
//!
//! A `Dataset` is what sampling produces and what fitting consumes. It is
//! independent of any network: column names are plain strings and only have
//! to line up with node names when the dataset is handed to the fitter.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::Value;
use crate::{Error, Result};

/// Ordered columns plus rows of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Empty dataset with the given columns.
    pub fn new(columns: Vec<String>) -> Result<Self> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(Error::InvalidParameters(format!("column '{column}' declared twice")));
            }
        }
        Ok(Self { columns, rows: Vec::new() })
    }

    pub(crate) fn with_capacity(columns: Vec<String>, rows: usize) -> Self {
        Self { columns, rows: Vec::with_capacity(rows) }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut dataset = Self::new(columns)?;
        dataset.rows.reserve(rows.len());
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    /// Build from name → value records. Every record must carry every column;
    /// extra keys are ignored.
    pub fn from_records<I>(columns: Vec<String>, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = HashMap<String, Value>>,
    {
        let mut dataset = Self::new(columns)?;
        for mut record in records {
            let row = dataset
                .columns
                .iter()
                .map(|c| record.remove(c).ok_or_else(|| Error::MissingColumn(c.clone())))
                .collect::<Result<Vec<_>>>()?;
            dataset.rows.push(row);
        }
        Ok(dataset)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InvalidParameters(format!(
                "row has {} values for {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub(crate) fn push_unchecked(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn columns(&self) -> &[String] { &self.columns }
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.column_index(name).ok_or_else(|| Error::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row { columns: &self.columns, values })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(|values| Row { columns: &self.columns, values })
    }

    pub(crate) fn raw_rows(&self) -> &[Vec<Value>] {
        &self.rows
    }
}

/// Borrowed view of one row as a name → value mapping.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.columns.iter().position(|c| c == name).map(|i| &self.values[i])
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_rows_and_lookup() {
        let ds = Dataset::from_rows(
            cols(&["A", "B"]),
            vec![
                vec![Value::from("0"), Value::from(1.5)],
                vec![Value::from("1"), Value::from(-2.0)],
            ],
        )
        .unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.row(1).unwrap().get("B"), Some(&Value::from(-2.0)));
        assert_eq!(ds.row(0).unwrap().get("C"), None);
        assert_eq!(ds.column("A").unwrap(), vec![&Value::from("0"), &Value::from("1")]);
        assert!(matches!(ds.column("C"), Err(Error::MissingColumn(_))));
    }

    #[test]
    fn test_row_width_checked() {
        let mut ds = Dataset::new(cols(&["A", "B"])).unwrap();
        assert!(ds.push_row(vec![Value::from("0")]).is_err());
        assert!(ds.is_empty());
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        assert!(Dataset::new(cols(&["A", "A"])).is_err());
    }

    #[test]
    fn test_from_records() {
        let mut record = HashMap::new();
        record.insert("B".to_string(), Value::from("x"));
        record.insert("A".to_string(), Value::from("y"));
        let ds = Dataset::from_records(cols(&["A", "B"]), vec![record]).unwrap();
        assert_eq!(ds.row(0).unwrap().values(), &[Value::from("y"), Value::from("x")]);

        let mut partial = HashMap::new();
        partial.insert("A".to_string(), Value::from("y"));
        let err = Dataset::from_records(cols(&["A", "B"]), vec![partial]).unwrap_err();
        assert!(matches!(err, Error::MissingColumn(ref c) if c == "B"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let ds = Dataset::from_rows(cols(&["A"]), vec![vec![Value::from("1")], vec![Value::from("0")]]).unwrap();
        let json = serde_json::to_string(&ds).unwrap();
        let back: Dataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ds);
    }
}
