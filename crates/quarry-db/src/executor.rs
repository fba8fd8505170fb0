//! The executor seam and result-row types.
//!
//! [`Executor`] is the minimal async interface the engine needs from a
//! backend: take SQL text plus positional parameters, return rows and an
//! affected-row count. Connection handling, pooling, and the wire protocol
//! live entirely on the implementor's side.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quarry_core::{QuarryError, QuarryResult};

use crate::value::Value;

/// Minimal async database executor trait.
///
/// [`QueryBuilder::execute`](crate::query::QueryBuilder::execute) accepts
/// `&dyn Executor`, which backends implement. Cancellation and retry policy
/// are the implementor's responsibility; the engine never retries.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs one statement and returns its rows and affected-row count.
    async fn execute(&self, sql: &str, params: &[Value]) -> QuarryResult<QueryOutput>;
}

/// The raw result of one statement.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    /// Result rows (empty for statements that return none).
    pub rows: Vec<Row>,
    /// Number of rows affected.
    pub row_count: u64,
}

/// A generic result row: ordered column names and their values, with typed
/// access through [`FromValue`].
#[derive(Debug, Clone)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from column names and values.
    ///
    /// # Panics
    ///
    /// Panics if the number of columns does not match the number of values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    /// The column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a typed value by column name.
    pub fn get<T: FromValue>(&self, column: &str) -> QuarryResult<T> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| {
                QuarryError::Execution(format!("column '{column}' not found in row"))
            })?;
        T::from_value(&self.values[idx])
    }

    /// Gets a typed value by column index.
    pub fn get_by_index<T: FromValue>(&self, idx: usize) -> QuarryResult<T> {
        if idx >= self.values.len() {
            return Err(QuarryError::Execution(format!(
                "column index {idx} out of bounds (row has {} columns)",
                self.values.len()
            )));
        }
        T::from_value(&self.values[idx])
    }

    /// A reference to the raw value at the given column name.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }
}

/// Conversion from a [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts the conversion.
    fn from_value(value: &Value) -> QuarryResult<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            _ => Err(QuarryError::Execution(format!("expected Int, got {value:?}"))),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        match value {
            Value::Int(i) => Self::try_from(*i)
                .map_err(|e| QuarryError::Execution(format!("Int value out of i32 range: {e}"))),
            _ => Err(QuarryError::Execution(format!("expected Int, got {value:?}"))),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as Self),
            _ => Err(QuarryError::Execution(format!(
                "expected Float, got {value:?}"
            ))),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(QuarryError::Execution(format!(
                "expected Bool, got {value:?}"
            ))),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(QuarryError::Execution(format!(
                "expected String, got {value:?}"
            ))),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            _ => Err(QuarryError::Execution(format!(
                "expected DateTime, got {value:?}"
            ))),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}
