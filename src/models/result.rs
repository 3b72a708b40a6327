//! Result models for stored-procedure calls.
//!
//! Driver rows are copied into these types at the adapter boundary, so nothing
//! outside `db::mssql` depends on the driver's native representation.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// Affected-row count returned by non-query execution.
pub type AffectedRowCount = i64;

/// Sentinel meaning "no rows reported" (the call never reached the server).
pub const NO_ROWS_REPORTED: AffectedRowCount = -1;

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact decimal text, e.g. "12.50" for DECIMAL(10,2)
    Decimal(String),
    Text(String),
    #[serde(serialize_with = "crate::models::base64_bytes::serialize")]
    Bytes(Vec<u8>),
    Uuid(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Decimal(s) | Self::Uuid(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Decimal(s) | Self::Text(s) | Self::Uuid(s) => write!(f, "{}", s),
            Self::Bytes(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::DateTimeOffset(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

/// A row whose arity does not match its table's columns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("row has {actual} values but the table has {expected} columns")]
pub struct TableShapeError {
    pub expected: usize,
    pub actual: usize,
}

/// One row: column name to value, sharing its column list with the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Get a value by column name (first match for duplicate names).
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Get a value by column position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterate over (column, value) pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// A result table: column names and rows in driver order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    #[serde(serialize_with = "serialize_columns")]
    columns: Arc<[String]>,
    rows: Vec<Row>,
}

fn serialize_columns<S: Serializer>(columns: &Arc<[String]>, serializer: S) -> Result<S::Ok, S::Error> {
    columns.as_ref().serialize(serializer)
}

impl Table {
    /// Create a table with the given columns and no rows.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns: columns.into(),
            rows: Vec::new(),
        }
    }

    /// The empty table: no columns, no rows.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// A one-row table over the row's own columns.
    pub fn from_row(row: &Row) -> Self {
        Self {
            columns: Arc::clone(&row.columns),
            rows: vec![row.clone()],
        }
    }

    /// Append a row, rejecting it if its arity differs from the columns.
    pub fn push_row(&mut self, values: Vec<Value>) -> Result<(), TableShapeError> {
        if values.len() != self.columns.len() {
            return Err(TableShapeError {
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        self.rows.push(Row {
            columns: Arc::clone(&self.columns),
            values,
        });
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::empty()
    }
}

/// All tables produced by one call, plus any output-parameter values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub tables: Vec<Table>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_values: Option<Row>,
}

impl ResultSet {
    pub fn new(tables: Vec<Table>) -> Self {
        Self {
            tables,
            output_values: None,
        }
    }

    pub fn first(&self) -> Option<&Table> {
        self.tables.first()
    }

    /// The first table, or an empty table when there is none.
    pub fn into_first_table(self) -> Table {
        self.tables.into_iter().next().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Detach the trailing table as the output-parameter row.
    pub fn split_output_values(&mut self) {
        if let Some(table) = self.tables.pop() {
            self.output_values = table.into_rows().into_iter().next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut table = Table::new(vec!["id".to_string(), "name".to_string()]);
        table
            .push_row(vec![Value::Int(1), Value::Text("alice".to_string())])
            .unwrap();
        table
            .push_row(vec![Value::Int(2), Value::Null])
            .unwrap();
        table
    }

    #[test]
    fn test_row_lookup() {
        let table = sample_table();
        let row = &table.rows()[0];
        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert_eq!(row.get("name").and_then(Value::as_str), Some("alice"));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.get_index(1), Some(&Value::Text("alice".to_string())));
    }

    #[test]
    fn test_push_row_rejects_ragged_rows() {
        let mut table = Table::new(vec!["a".to_string(), "b".to_string()]);
        let err = table.push_row(vec![Value::Int(1)]).unwrap_err();
        assert_eq!(err, TableShapeError { expected: 2, actual: 1 });
        assert!(table.is_empty());
    }

    #[test]
    fn test_rows_share_column_set() {
        let table = sample_table();
        for row in table.rows() {
            assert_eq!(row.columns(), table.columns());
        }
    }

    #[test]
    fn test_table_from_row() {
        let table = sample_table();
        let single = Table::from_row(&table.rows()[1]);
        assert_eq!(single.columns(), table.columns());
        assert_eq!(single.rows(), &table.rows()[1..]);
    }

    #[test]
    fn test_row_serializes_as_object() {
        let table = sample_table();
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["columns"], serde_json::json!(["id", "name"]));
        assert_eq!(json["rows"][0], serde_json::json!({"id": 1, "name": "alice"}));
        assert_eq!(json["rows"][1]["name"], serde_json::Value::Null);
    }

    #[test]
    fn test_into_first_table_empty() {
        let table = ResultSet::default().into_first_table();
        assert!(table.columns().is_empty());
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_split_output_values() {
        let mut outputs = Table::new(vec!["id".to_string()]);
        outputs.push_row(vec![Value::Int(99)]).unwrap();
        let mut result = ResultSet::new(vec![sample_table(), outputs]);

        result.split_output_values();

        assert_eq!(result.len(), 1);
        let row = result.output_values.as_ref().unwrap();
        assert_eq!(row.get("id"), Some(&Value::Int(99)));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_string(), "0xDEAD");
        assert_eq!(Value::Decimal("12.50".to_string()).to_string(), "12.50");
    }

    #[test]
    fn test_bytes_serialize_as_base64() {
        let json = serde_json::to_value(Value::Bytes(b"hi".to_vec())).unwrap();
        assert_eq!(json, serde_json::json!("aGk="));
    }
}
