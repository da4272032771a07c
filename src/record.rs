// Records - the uniform shape every backend response is normalized into
// A record is an unordered mapping from column name to a scalar value

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Column name used when a payload cannot be split into named columns
pub const RAW_VALUE_COLUMN: &str = "value";

/// A single scalar cell value
/// Serialized untagged so records print back out as plain JSON objects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Convert a JSON value into a scalar
    /// Nested arrays and objects are kept as their JSON text
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n
                    .as_f64()
                    .map(Value::Float)
                    .unwrap_or_else(|| Value::Text(n.to_string())),
            },
            serde_json::Value::String(s) => Value::Text(s),
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Value::Text(nested.to_string())
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One row returned by the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Record {
    columns: BTreeMap<String, Value>,
}

impl Record {
    /// Build a record from a JSON object's fields
    pub fn from_json_object(object: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            columns: object
                .into_iter()
                .map(|(name, value)| (name, Value::from_json(value)))
                .collect(),
        }
    }

    /// A record holding one unnamed value under the `value` column
    pub fn single(value: Value) -> Self {
        let mut columns = BTreeMap::new();
        columns.insert(RAW_VALUE_COLUMN.to_string(), value);
        Self { columns }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) -> Option<Value> {
        self.columns.insert(column.into(), value)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Format records as a box-drawn table for display
/// Columns are the sorted union of every record's column names; a record
/// without a given column shows an empty cell
pub fn format_records(records: &[Record]) -> String {
    if records.is_empty() {
        return "No rows found".to_string();
    }

    let column_names: Vec<&str> = records
        .iter()
        .flat_map(|r| r.columns.keys().map(String::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let cells: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            column_names
                .iter()
                .map(|name| record.get(name).map(|v| v.to_string()).unwrap_or_default())
                .collect()
        })
        .collect();

    // Calculate column widths
    let mut widths: Vec<usize> = column_names.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut result = String::new();

    // Header row
    push_border(&mut result, &widths, '┌', '┬', '┐');

    result.push('│');
    for (name, width) in column_names.iter().zip(&widths) {
        result.push_str(&format!(" {:<width$} ", name, width = width));
        result.push('│');
    }
    result.push('\n');

    push_border(&mut result, &widths, '├', '┼', '┤');

    // Data rows
    for row in &cells {
        result.push('│');
        for (cell, width) in row.iter().zip(&widths) {
            result.push_str(&format!(" {:<width$} ", cell, width = width));
            result.push('│');
        }
        result.push('\n');
    }

    push_border(&mut result, &widths, '└', '┴', '┘');

    result.push_str(&format!("\n{} row(s) returned", records.len()));

    result
}

fn push_border(out: &mut String, widths: &[usize], left: char, mid: char, right: char) {
    out.push(left);
    for (i, width) in widths.iter().enumerate() {
        out.push_str(&"─".repeat(width + 2));
        if i < widths.len() - 1 {
            out.push(mid);
        }
    }
    out.push(right);
    out.push('\n');
}
