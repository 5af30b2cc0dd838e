use crate::{
    assembler::assemble,
    columns::OutputColumns,
    config::ApplyConfig,
    dispatcher::dispatch,
    error::{ApplyError, ConfigError},
    function::FunctionArgs,
    invoker::Invoker,
    metrics::{Metrics, RunSummary},
    unit::build_units,
};
use model::records::table::Table;
use std::{sync::Arc, time::Instant};
use tracing::{debug, info};

/// Applies the configured function to every record of a table in parallel,
/// with per-record error isolation and progress tracking.
pub struct ApplyService {
    config: ApplyConfig,
}

impl ApplyService {
    /// Invalid setups are rejected here, before any row is processed.
    pub fn new(config: ApplyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(ApplyService { config })
    }

    /// Run the function over the whole table and return the augmented table.
    ///
    /// `args` is forwarded verbatim to the function and the batch response
    /// parser, minus the reserved keys. In log mode the returned table is
    /// always complete and row-aligned; in fail mode the first error aborts
    /// the run and no table is produced.
    pub async fn run(&self, table: &Table, args: FunctionArgs) -> Result<Table, ApplyError> {
        let start = Instant::now();
        let row_count = table.len();
        match &self.config.batch {
            Some(batch) => info!(
                function = self.config.function.name(),
                rows = row_count,
                batch_size = batch.size,
                "Applying function in parallel by batch"
            ),
            None => info!(
                function = self.config.function.name(),
                rows = row_count,
                "Applying function in parallel"
            ),
        }

        let existing = table.column_names();
        let columns = OutputColumns::unique(&existing, &self.config.output_column_prefix);
        let units = build_units(table, self.config.batch.as_ref().map(|b| b.size));
        let metrics = Metrics::new();
        let invoker = Arc::new(Invoker::new(
            &self.config,
            columns.clone(),
            args.sanitized(),
            metrics.clone(),
        ));

        let results = dispatch(
            invoker,
            units,
            self.config.parallel_workers,
            metrics.clone(),
            self.config.on_progress.clone(),
        )
        .await?;

        let assembled = assemble(
            table,
            results,
            &columns,
            self.config.error_handling,
            self.config.verbose,
        )?;

        let summary = RunSummary {
            succeeded: row_count - assembled.failed_rows,
            failed: assembled.failed_rows,
            elapsed: start.elapsed(),
        };
        debug!(metrics = ?metrics.snapshot(), "Run metrics");
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Applied function in parallel"
        );

        Ok(assembled.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{ApplyFunction, FunctionError};
    use async_trait::async_trait;
    use model::{core::value::Value, records::row::Row};

    struct Noop;

    #[async_trait]
    impl ApplyFunction for Noop {
        async fn call_row(&self, _row: &Row, _args: &FunctionArgs) -> Result<Value, FunctionError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn construction_rejects_invalid_config() {
        let config = ApplyConfig::new(Arc::new(Noop));
        assert!(matches!(
            ApplyService::new(config),
            Err(ConfigError::MissingRecoverablePredicate)
        ));
    }

    #[tokio::test]
    async fn empty_table_yields_empty_augmented_table() {
        use model::{core::data_type::DataType, records::table::Column};

        let config = ApplyConfig::new(Arc::new(Noop)).with_recoverable(|_| true);
        let service = ApplyService::new(config).unwrap();

        let input = Table::new(vec![Column::new("id", DataType::Int)]);
        let output = service.run(&input, FunctionArgs::new()).await.unwrap();

        assert!(output.is_empty());
        assert_eq!(
            output.column_names(),
            vec![
                "id",
                "output_response",
                "output_error_message",
                "output_error_type"
            ]
        );
    }
}
