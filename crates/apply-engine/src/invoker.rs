use crate::{
    columns::OutputColumns,
    config::{ApplyConfig, ErrorHandling, RecoverablePredicate},
    error::{ApplyError, ConfigError},
    function::{ApplyFunction, BatchResponseParser, FunctionArgs, FunctionError},
    metrics::Metrics,
    unit::WorkUnit,
};
use model::{core::value::Value, records::row::Row};
use std::sync::Arc;
use tracing::warn;

/// The row(s) of one completed unit, output columns populated.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitResult {
    pub index: usize,
    pub rows: Vec<Row>,
}

/// Wraps a single call to the user function.
///
/// This is the error-isolation boundary: whatever happens inside the call,
/// the unit either comes back with every output column populated, or the
/// error is fatal and aborts the run.
pub struct Invoker {
    function: Arc<dyn ApplyFunction>,
    parser: Option<Arc<dyn BatchResponseParser>>,
    error_handling: ErrorHandling,
    recoverable: Option<RecoverablePredicate>,
    columns: OutputColumns,
    args: FunctionArgs,
    metrics: Metrics,
}

impl Invoker {
    pub fn new(
        config: &ApplyConfig,
        columns: OutputColumns,
        args: FunctionArgs,
        metrics: Metrics,
    ) -> Self {
        Invoker {
            function: config.function.clone(),
            parser: config.batch.as_ref().map(|b| b.parser.clone()),
            error_handling: config.error_handling,
            recoverable: config.recoverable.clone(),
            columns,
            args,
            metrics,
        }
    }

    pub async fn invoke(&self, unit: WorkUnit) -> Result<UnitResult, ApplyError> {
        match unit {
            WorkUnit::Row { index, row } => self.invoke_row(index, row).await,
            WorkUnit::Batch { index, rows } => self.invoke_batch(index, rows).await,
        }
    }

    async fn invoke_row(&self, index: usize, row: Row) -> Result<UnitResult, ApplyError> {
        // Owned clone per unit: downstream mutation never aliases input data.
        let mut output = row.clone();
        self.init_output_columns(std::slice::from_mut(&mut output));

        match self.function.call_row(&row, &self.args).await {
            Ok(response) => {
                output.set(&self.columns.response, response);
                self.metrics.increment_rows(1);
                Ok(UnitResult {
                    index,
                    rows: vec![output],
                })
            }
            Err(error) => {
                self.recover(index, std::slice::from_ref(&row), vec![output], error, false)
            }
        }
    }

    async fn invoke_batch(&self, index: usize, rows: Vec<Row>) -> Result<UnitResult, ApplyError> {
        let parser = self
            .parser
            .clone()
            .ok_or(ConfigError::UnitModeMismatch)?;

        let mut output: Vec<Row> = rows.clone();
        self.init_output_columns(&mut output);

        let response = match self.function.call_batch(&rows, &self.args).await {
            Ok(response) => response,
            Err(error) => return self.recover(index, &rows, output, error, false),
        };

        let parsed = match parser.parse(&rows, &response, &self.columns, &self.args) {
            Ok(parsed) => parsed,
            Err(error) => return self.recover(index, &rows, output, error, false),
        };
        if parsed.len() != rows.len() {
            return Err(ApplyError::ParserContract {
                expected: rows.len(),
                actual: parsed.len(),
            });
        }

        let row_errors: Vec<String> = parsed
            .iter()
            .map(|r| r.get_value(&self.columns.error_message).to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if row_errors.is_empty() {
            self.metrics.increment_rows(parsed.len() as u64);
            return Ok(UnitResult {
                index,
                rows: parsed,
            });
        }

        // Any row-level error fails the whole batch invocation as one outcome.
        let error = FunctionError::new(
            &format!("{}::BatchError", module_path!()),
            &format!("{row_errors:?}"),
        )
        .with_details(&format!("{row_errors:?}"));
        self.recover(index, &rows, parsed, error, true)
    }

    /// Log-mode recovery: annotate every row of the unit and keep going.
    /// Fail mode and unmatched errors abort the run instead.
    fn recover(
        &self,
        index: usize,
        input: &[Row],
        mut rows: Vec<Row>,
        error: FunctionError,
        batch_error: bool,
    ) -> Result<UnitResult, ApplyError> {
        if self.error_handling == ErrorHandling::Fail {
            return Err(self.fatal(index, error));
        }
        let matched = batch_error || self.recoverable.as_ref().is_some_and(|p| p(&error));
        if !matched {
            return Err(self.fatal(index, error));
        }

        warn!(
            function = self.function.name(),
            unit = index,
            input = %render_rows(input),
            error = %error,
            "Function failed on unit"
        );

        let raw = error
            .details
            .clone()
            .unwrap_or_else(|| error.message.clone());
        for row in &mut rows {
            row.set(
                &self.columns.error_message,
                Value::String(error.message.clone()),
            );
            row.set(&self.columns.error_type, Value::String(error.kind.clone()));
            row.set(&self.columns.error_raw, Value::String(raw.clone()));
        }

        self.metrics.increment_recovered();
        self.metrics.increment_rows(rows.len() as u64);
        Ok(UnitResult { index, rows })
    }

    fn fatal(&self, index: usize, error: FunctionError) -> ApplyError {
        ApplyError::Function {
            function: self.function.name().to_string(),
            unit: index,
            source: error,
        }
    }

    fn init_output_columns(&self, rows: &mut [Row]) {
        for row in rows {
            row.set(&self.columns.response, Value::String(String::new()));
            row.set(&self.columns.error_message, Value::String(String::new()));
            row.set(&self.columns.error_type, Value::String(String::new()));
            row.set(&self.columns.error_raw, Value::String(String::new()));
        }
    }
}

fn render_rows(rows: &[Row]) -> String {
    serde_json::to_string(rows).unwrap_or_else(|_| format!("{rows:?}"))
}
