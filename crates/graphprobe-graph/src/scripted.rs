use std::cell::RefCell;

use serde_json::Value;

use crate::cypher::{CypherExecutor, CypherStatement, GraphError, QueryResult};

enum Reply {
    Result(QueryResult),
    Error { code: String, message: String },
}

/// Executor answering statements by substring rules, for offline tests.
///
/// Each statement in a batch is matched against the rules in insertion
/// order; an unmatched statement fails the whole batch.
#[derive(Default)]
pub struct ScriptedCypherExecutor {
    rules: Vec<(String, Reply)>,
    executed: RefCell<Vec<CypherStatement>>,
}

impl ScriptedCypherExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needle: &str, result: QueryResult) -> Self {
        self.rules.push((needle.to_string(), Reply::Result(result)));
        self
    }

    /// Single-row, single-column reply.
    pub fn on_scalar(self, needle: &str, column: &str, value: impl Into<Value>) -> Self {
        self.on(
            needle,
            QueryResult {
                columns: vec![column.to_string()],
                rows: vec![vec![value.into()]],
            },
        )
    }

    pub fn on_error(mut self, needle: &str, code: &str, message: &str) -> Self {
        self.rules.push((
            needle.to_string(),
            Reply::Error {
                code: code.to_string(),
                message: message.to_string(),
            },
        ));
        self
    }

    pub fn executed(&self) -> Vec<CypherStatement> {
        self.executed.borrow().clone()
    }
}

impl CypherExecutor for ScriptedCypherExecutor {
    fn execute(&self, statements: &[CypherStatement]) -> Result<Vec<QueryResult>, GraphError> {
        self.executed
            .borrow_mut()
            .extend(statements.iter().cloned());
        statements
            .iter()
            .map(|statement| {
                let reply = self
                    .rules
                    .iter()
                    .find(|(needle, _)| statement.statement.contains(needle.as_str()))
                    .map(|(_, reply)| reply)
                    .ok_or_else(|| {
                        GraphError::InvalidResponse(format!(
                            "no scripted reply for '{}'",
                            statement.statement
                        ))
                    })?;
                match reply {
                    Reply::Result(result) => Ok(result.clone()),
                    Reply::Error { code, message } => Err(GraphError::Cypher {
                        code: code.clone(),
                        message: message.clone(),
                    }),
                }
            })
            .collect()
    }
}
