//! Result tables: the canonical materialized shape every retrieval path returns.
//!
//! A [`ResultTable`] is an ordered list of uniquely named, equally long,
//! type-homogeneous columns. [`Dataset`] is the looser input accepted from
//! bundles and literals; it is coerced into a `ResultTable` or rejected with
//! [`DalError::DataShape`].

use crate::core::{DalError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// The storage class of a non-null value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Real,
    Text,
    Blob,
}

impl Value {
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(ValueKind::Integer),
            Value::Real(_) => Some(ValueKind::Real),
            Value::Text(_) => Some(ValueKind::Text),
            Value::Blob(_) => Some(ValueKind::Blob),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts a scalar JSON value. Arrays and objects have no cell form.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Integer(i64::from(*b))),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Integer(i)),
                None => n
                    .as_f64()
                    .map(Value::Real)
                    .ok_or_else(|| DalError::DataShape(format!("unrepresentable number {}", n))),
            },
            serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
            other => Err(DalError::DataShape(format!(
                "nested JSON value cannot be stored in a cell: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(t) => write!(f, "{}", t),
            Value::Blob(b) => {
                write!(f, "X'")?;
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                write!(f, "'")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A named, homogeneous sequence of values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The storage class shared by every non-null value, if any.
    pub fn kind(&self) -> Option<ValueKind> {
        self.values.iter().find_map(Value::kind)
    }

    /// Enforces homogeneity. Integers mixed with reals are widened to reals;
    /// any other mix is rejected.
    fn normalize(&mut self) -> std::result::Result<(), String> {
        let kinds: HashSet<ValueKind> = self.values.iter().filter_map(Value::kind).collect();
        if kinds.len() <= 1 {
            return Ok(());
        }
        if kinds.len() == 2 && kinds.contains(&ValueKind::Integer) && kinds.contains(&ValueKind::Real) {
            for value in self.values.iter_mut() {
                if let Value::Integer(i) = *value {
                    *value = Value::Real(i as f64);
                }
            }
            return Ok(());
        }
        let mut names: Vec<String> = kinds.iter().map(|k| format!("{:?}", k)).collect();
        names.sort();
        Err(format!("column '{}' mixes {} values", self.name, names.join(" and ")))
    }
}

/// The canonical materialized tabular output.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ResultTable {
    columns: Vec<Column>,
}

impl ResultTable {
    /// Builds a table, validating unique names, equal lengths and homogeneity.
    pub fn new(mut columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DalError::DataShape(format!("duplicate column name '{}'", column.name)));
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(DalError::DataShape(format!(
                    "column '{}' has {} values, expected {}",
                    bad.name,
                    bad.len(),
                    expected
                )));
            }
        }
        for column in columns.iter_mut() {
            column.normalize().map_err(DalError::DataShape)?;
        }
        Ok(ResultTable { columns })
    }

    /// Builds a table from column names and row-major data.
    pub fn from_rows(names: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut buckets: Vec<Vec<Value>> = names.iter().map(|_| Vec::with_capacity(rows.len())).collect();
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(DalError::DataShape(format!(
                    "row {} has {} values, expected {}",
                    index,
                    row.len(),
                    names.len()
                )));
            }
            for (bucket, value) in buckets.iter_mut().zip(row) {
                bucket.push(value);
            }
        }
        ResultTable::new(names.into_iter().zip(buckets).map(|(n, v)| Column::new(n, v)).collect())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Returns one row in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Concatenates tables row-wise.
    ///
    /// Every table must carry the same set of column names (order may
    /// differ; the first table's order wins). Missing columns are never
    /// filled in.
    pub fn concat(tables: Vec<ResultTable>) -> Result<ResultTable> {
        let mut iter = tables.into_iter();
        let mut combined = iter
            .next()
            .ok_or_else(|| DalError::Combine("no tables to combine".to_string()))?;

        for (offset, mut table) in iter.enumerate() {
            let index = offset + 1;
            let compatible = table.column_count() == combined.column_count()
                && combined.columns.iter().all(|c| table.column(&c.name).is_some());
            if !compatible {
                return Err(DalError::Combine(format!(
                    "table {} has columns [{}], expected [{}]",
                    index,
                    table.column_names().join(", "),
                    combined.column_names().join(", ")
                )));
            }
            for column in combined.columns.iter_mut() {
                let Some(position) = table.columns.iter().position(|c| c.name == column.name) else {
                    return Err(DalError::Combine(format!("table {} lost column '{}'", index, column.name)));
                };
                let other = table.columns.swap_remove(position);
                column.values.extend(other.values);
                column
                    .normalize()
                    .map_err(|e| DalError::Combine(format!("table {}: {}", index, e)))?;
            }
        }

        Ok(combined)
    }
}

/// A tabular value in one of the shapes bundles and literals may hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    /// Already canonical.
    Table(ResultTable),
    /// Column names plus row-major values.
    Rows { columns: Vec<String>, rows: Vec<Vec<Value>> },
    /// JSON objects, one per row. Missing keys become nulls.
    Records(Vec<serde_json::Value>),
}

impl Dataset {
    /// Coerces the value into the canonical table shape.
    pub fn into_table(self) -> Result<ResultTable> {
        match self {
            Dataset::Table(table) => Ok(table),
            Dataset::Rows { columns, rows } => ResultTable::from_rows(columns, rows),
            Dataset::Records(records) => records_to_table(records),
        }
    }
}

impl From<ResultTable> for Dataset {
    fn from(table: ResultTable) -> Self {
        Dataset::Table(table)
    }
}

fn records_to_table(records: Vec<serde_json::Value>) -> Result<ResultTable> {
    let mut names: Vec<String> = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let object = record
            .as_object()
            .ok_or_else(|| DalError::DataShape(format!("record {} is not an object", index)))?;
        for key in object.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let mut rows = Vec::with_capacity(records.len());
    for record in &records {
        let mut row = Vec::with_capacity(names.len());
        for name in &names {
            row.push(match record.get(name) {
                Some(v) => Value::from_json(v)?,
                None => Value::Null,
            });
        }
        rows.push(row);
    }

    ResultTable::from_rows(names, rows)
}
