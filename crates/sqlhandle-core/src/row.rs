//! Database row representation.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column name -> index mapping shared across all rows in a result set.
#[derive(Debug, Clone)]
struct ColumnInfo {
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    fn new(names: Vec<String>) -> Self {
        let name_to_index = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();
        Self { name_to_index }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }
}

/// A single row returned from a database query.
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<Value>,
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a new row with the given columns and values.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        let columns = Arc::new(ColumnInfo::new(column_names));
        Self { values, columns }
    }

    /// Get the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Get a column as i64, failing with a type error when absent or not integral.
    pub fn get_i64(&self, name: &str) -> Result<i64> {
        let value = self.get_by_name(name).ok_or_else(|| {
            Error::Type(TypeError {
                expected: "i64",
                actual: format!("column '{}' not found", name),
                column: Some(name.to_string()),
            })
        })?;
        value.as_i64().ok_or_else(|| {
            Error::Type(TypeError {
                expected: "i64",
                actual: value.type_name().to_string(),
                column: Some(name.to_string()),
            })
        })
    }
}
