//! Conversion of JSON records into a [`DataFrame`].

use std::collections::HashSet;

use polars::prelude::*;
use prices_core::{DataError, Result};
use serde_json::{Map, Value};

/// Inferred storage type of a JSON column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int,
    Float,
    Text,
}

impl ColumnKind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Bool(_) => Self::Bool,
            Value::Number(n) if n.is_i64() => Self::Int,
            Value::Number(_) => Self::Float,
            _ => Self::Text,
        }
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => Self::Float,
            _ => Self::Text,
        }
    }
}

/// Builds a table from JSON objects, one row per record.
///
/// Columns appear in first-seen key order and keys absent from a record are
/// null. Column types are inferred from the non-null values: all booleans,
/// all integers, all numbers, or otherwise text (non-string values keep their
/// JSON rendering). A column with no values at all is a null text column.
///
/// # Errors
/// Returns [`DataError::Parse`] if the columns cannot be assembled.
pub fn records_to_frame(records: &[Map<String, Value>]) -> Result<DataFrame> {
    if records.is_empty() {
        return Ok(DataFrame::empty());
    }

    let mut seen = HashSet::new();
    let mut names: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.as_str());
            }
        }
    }

    let columns = names
        .into_iter()
        .map(|name| build_column(name, records))
        .collect::<Vec<_>>();

    DataFrame::new(columns).map_err(|e| DataError::Parse(e.to_string()))
}

fn build_column(name: &str, records: &[Map<String, Value>]) -> Column {
    let values: Vec<Option<&Value>> = records
        .iter()
        .map(|r| r.get(name).filter(|v| !v.is_null()))
        .collect();

    let kind = values
        .iter()
        .flatten()
        .map(|v| ColumnKind::of(v))
        .reduce(ColumnKind::merge);

    let name = PlSmallStr::from(name);
    match kind {
        None => Column::full_null(name, values.len(), &DataType::String),
        Some(ColumnKind::Bool) => Column::new(
            name,
            values
                .iter()
                .map(|v| v.and_then(Value::as_bool))
                .collect::<Vec<_>>(),
        ),
        Some(ColumnKind::Int) => Column::new(
            name,
            values
                .iter()
                .map(|v| v.and_then(Value::as_i64))
                .collect::<Vec<_>>(),
        ),
        Some(ColumnKind::Float) => Column::new(
            name,
            values
                .iter()
                .map(|v| v.and_then(Value::as_f64))
                .collect::<Vec<_>>(),
        ),
        Some(ColumnKind::Text) => Column::new(
            name,
            values
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                })
                .collect::<Vec<_>>(),
        ),
    }
}
