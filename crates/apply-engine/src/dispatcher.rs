use crate::{
    config::ProgressCallback, error::ApplyError, invoker::Invoker, invoker::UnitResult,
    metrics::Metrics, unit::WorkUnit,
};
use std::sync::Arc;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::debug;

/// Run every unit's invocation with bounded concurrency.
///
/// All units are submitted up front; a semaphore keeps at most `workers`
/// invocations in flight. Results come back in completion order; alignment
/// is the assembler's job. The first error observed is propagated only after
/// the remaining in-flight invocations have settled; already-dispatched units
/// are never cancelled.
pub async fn dispatch(
    invoker: Arc<Invoker>,
    units: Vec<WorkUnit>,
    workers: usize,
    metrics: Metrics,
    on_progress: Option<ProgressCallback>,
) -> Result<Vec<UnitResult>, ApplyError> {
    let total = units.len();
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut pool = JoinSet::new();

    for unit in units {
        let semaphore = semaphore.clone();
        let invoker = invoker.clone();
        pool.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| ApplyError::Worker("worker pool closed".to_string()))?;
            invoker.invoke(unit).await
        });
    }

    let mut results = Vec::with_capacity(total);
    let mut first_error: Option<ApplyError> = None;
    while let Some(joined) = pool.join_next().await {
        match joined {
            Ok(Ok(result)) => results.push(result),
            Ok(Err(error)) => {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
            Err(join_error) => {
                if first_error.is_none() {
                    first_error = Some(ApplyError::Worker(join_error.to_string()));
                }
            }
        }

        let completed = metrics.increment_units() as usize;
        debug!(completed, total, "Unit completed");
        if let Some(callback) = &on_progress {
            callback(completed, total);
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        columns::OutputColumns,
        config::{ApplyConfig, ErrorHandling},
        function::{ApplyFunction, FunctionArgs, FunctionError},
        unit::build_units,
    };
    use async_trait::async_trait;
    use model::{core::value::Value, records::row::Row, records::table::Table};
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    /// Tracks the number of concurrently running calls.
    struct Gauge {
        active: AtomicUsize,
        peak: AtomicUsize,
        fail_ids: Vec<i64>,
    }

    #[async_trait]
    impl ApplyFunction for Gauge {
        async fn call_row(&self, row: &Row, _args: &FunctionArgs) -> Result<Value, FunctionError> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(active, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            match row.get_value("id") {
                Value::Int(id) if self.fail_ids.contains(&id) => {
                    Err(FunctionError::new("ValueError", &format!("bad id {id}")))
                }
                other => Ok(Value::String(other.to_string())),
            }
        }
    }

    fn table(rows: usize) -> Table {
        Table::from_rows(
            (0..rows)
                .map(|i| Row::from_pairs(vec![("id", Value::Int(i as i64))]))
                .collect(),
        )
        .unwrap()
    }

    fn setup(fail_ids: Vec<i64>, error_handling: ErrorHandling) -> (Arc<Invoker>, Arc<Gauge>) {
        let function = Arc::new(Gauge {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fail_ids,
        });
        let config = ApplyConfig::new(function.clone())
            .with_error_handling(error_handling)
            .with_recoverable(|e| e.kind == "ValueError");
        let invoker = Arc::new(Invoker::new(
            &config,
            OutputColumns::unique(&["id"], "output"),
            FunctionArgs::new(),
            Metrics::new(),
        ));
        (invoker, function)
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_worker_count() {
        let (invoker, function) = setup(Vec::new(), ErrorHandling::Log);
        let units = build_units(&table(12), None);

        let results = dispatch(invoker, units, 3, Metrics::new(), None)
            .await
            .unwrap();

        assert_eq!(results.len(), 12);
        assert!(function.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn progress_counts_completions_up_to_total() {
        let (invoker, _) = setup(Vec::new(), ErrorHandling::Log);
        let units = build_units(&table(5), None);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_callback = seen.clone();
        let config_progress: ProgressCallback = Arc::new(move |completed, total| {
            seen_by_callback.lock().unwrap().push((completed, total));
        });

        dispatch(invoker, units, 2, Metrics::new(), Some(config_progress))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert_eq!(*seen.last().unwrap(), (5, 5));
        assert!(seen.iter().all(|(_, total)| *total == 5));
    }

    #[tokio::test]
    async fn fail_mode_error_surfaces_after_all_units_settle() {
        let (invoker, _) = setup(vec![3], ErrorHandling::Fail);
        let units = build_units(&table(8), None);

        let metrics = Metrics::new();
        let err = dispatch(invoker, units, 2, metrics.clone(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApplyError::Function { unit: 3, .. }));
        // Every dispatched unit ran to completion before the error surfaced.
        assert_eq!(metrics.snapshot().units_completed, 8);
    }

    #[tokio::test]
    async fn empty_unit_list_yields_no_results() {
        let (invoker, _) = setup(Vec::new(), ErrorHandling::Log);
        let results = dispatch(invoker, Vec::new(), 4, Metrics::new(), None)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
