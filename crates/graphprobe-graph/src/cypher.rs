use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
/// Failure modes of the Cypher transport.
pub enum GraphError {
    #[error("graph http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("graph endpoint returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("cypher error {code}: {message}")]
    Cypher { code: String, message: String },
    #[error("invalid graph response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A Cypher statement plus its parameters. Values never enter the statement text.
pub struct CypherStatement {
    pub statement: String,
    pub parameters: Map<String, Value>,
}

impl CypherStatement {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            parameters: Map::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Rows returned for one statement, in column order.
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    fn column_index(&self, column: &str) -> Result<usize, GraphError> {
        self.columns
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| GraphError::InvalidResponse(format!("missing column '{column}'")))
    }

    pub fn records(&self) -> Vec<BTreeMap<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<BTreeMap<_, _>>()
            })
            .collect()
    }

    /// Integer in `column` of the only row; count queries always return one.
    pub fn single_i64(&self, column: &str) -> Result<i64, GraphError> {
        let index = self.column_index(column)?;
        let row = match self.rows.as_slice() {
            [row] => row,
            rows => {
                return Err(GraphError::InvalidResponse(format!(
                    "expected exactly one row for '{column}', got {}",
                    rows.len()
                )))
            }
        };
        row.get(index)
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                GraphError::InvalidResponse(format!("column '{column}' is not an integer"))
            })
    }

    pub fn column_strings(&self, column: &str) -> Result<Vec<String>, GraphError> {
        let index = self.column_index(column)?;
        Ok(self
            .rows
            .iter()
            .filter_map(|row| row.get(index).and_then(Value::as_str).map(ToString::to_string))
            .collect())
    }
}

/// Runs statements as one transaction and returns one result per statement.
pub trait CypherExecutor {
    fn execute(&self, statements: &[CypherStatement]) -> Result<Vec<QueryResult>, GraphError>;

    fn execute_one(&self, statement: CypherStatement) -> Result<QueryResult, GraphError> {
        self.execute(std::slice::from_ref(&statement))?
            .into_iter()
            .next()
            .ok_or_else(|| GraphError::InvalidResponse("no result for statement".to_string()))
    }
}

impl<T: CypherExecutor + ?Sized> CypherExecutor for &T {
    fn execute(&self, statements: &[CypherStatement]) -> Result<Vec<QueryResult>, GraphError> {
        (**self).execute(statements)
    }
}

pub fn value_str(record: &BTreeMap<String, Value>, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub fn value_i64(record: &BTreeMap<String, Value>, key: &str) -> i64 {
    record.get(key).and_then(Value::as_i64).unwrap_or_default()
}

/// Decodes a temporal column.
///
/// The HTTP API serializes `DateTime` as ISO-8601 text, optionally followed by
/// a `[Zone/Id]` suffix, and `LocalDateTime` without an offset (read as UTC).
/// Integers are epoch milliseconds, as written by older tooling.
pub fn value_datetime(record: &BTreeMap<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    match record.get(key)? {
        Value::Number(number) => Utc.timestamp_millis_opt(number.as_i64()?).single(),
        Value::String(text) => parse_temporal(text),
        _ => None,
    }
}

fn parse_temporal(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = match text.find('[') {
        Some(index) => &text[..index],
        None => text,
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
