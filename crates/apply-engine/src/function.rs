use crate::columns::OutputColumns;
use async_trait::async_trait;
use model::{core::value::Value, records::row::Row};
use std::collections::HashMap;
use thiserror::Error;

/// Structured error surfaced by a user function or batch response parser.
///
/// `kind` carries the qualified error type (module-qualified where the caller
/// can determine it); `details` carries the raw error payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct FunctionError {
    pub kind: String,
    pub message: String,
    pub details: Option<String>,
}

impl FunctionError {
    pub fn new(kind: &str, message: &str) -> Self {
        FunctionError {
            kind: kind.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: &str) -> Self {
        self.details = Some(details.to_string());
        self
    }
}

/// Keyword arguments forwarded verbatim to the user function and the batch
/// response parser. Reserved keys collide with the engine's own call surface
/// and are stripped before forwarding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionArgs {
    values: HashMap<String, Value>,
}

impl FunctionArgs {
    pub const RESERVED_KEYS: [&'static str; 5] = [
        "function",
        "row",
        "batch",
        "output_column_names",
        "batch_response_parser",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop the reserved keys before the args are handed to collaborators.
    pub fn sanitized(mut self) -> Self {
        for key in Self::RESERVED_KEYS {
            self.values.remove(key);
        }
        self
    }
}

/// The user-supplied function applied to every work unit.
///
/// Implementations must be safe to invoke concurrently; the engine never
/// hands out mutable state. A function only needs to implement the call shape
/// matching the configured mode.
#[async_trait]
pub trait ApplyFunction: Send + Sync {
    /// Name used in log lines.
    fn name(&self) -> &str {
        "function"
    }

    async fn call_row(&self, row: &Row, args: &FunctionArgs) -> Result<Value, FunctionError> {
        let _ = (row, args);
        Err(FunctionError::new(
            "Unsupported",
            "this function does not support row mode",
        ))
    }

    async fn call_batch(&self, batch: &[Row], args: &FunctionArgs) -> Result<Value, FunctionError> {
        let _ = (batch, args);
        Err(FunctionError::new(
            "Unsupported",
            "this function does not support batch mode",
        ))
    }
}

/// Maps the raw response of a batch call back onto per-row results.
///
/// The returned rows must have the same length and order as the input batch,
/// with response and/or error columns filled in per row.
pub trait BatchResponseParser: Send + Sync {
    fn parse(
        &self,
        batch: &[Row],
        response: &Value,
        columns: &OutputColumns,
        args: &FunctionArgs,
    ) -> Result<Vec<Row>, FunctionError>;
}
