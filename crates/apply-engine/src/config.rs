use crate::{
    error::ConfigError,
    function::{ApplyFunction, BatchResponseParser, FunctionError},
};
use std::sync::Arc;

/// How a recoverable function error is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorHandling {
    /// Log the error as a warning and annotate the affected rows; the run
    /// continues. Requires a recoverable-error predicate.
    #[default]
    Log,
    /// The first error aborts the whole run; no partial output is produced.
    Fail,
}

/// Decides whether a function error is recoverable in log mode. Errors the
/// predicate rejects are fatal regardless of the error-handling mode.
pub type RecoverablePredicate = Arc<dyn Fn(&FunctionError) -> bool + Send + Sync>;

/// Completion-count progress callback: `(completed_units, total_units)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Batch mode settings. The parser is part of the settings, so batch mode
/// without a parser is unrepresentable.
#[derive(Clone)]
pub struct BatchSettings {
    pub size: usize,
    pub parser: Arc<dyn BatchResponseParser>,
}

impl BatchSettings {
    pub fn new(parser: Arc<dyn BatchResponseParser>) -> Self {
        BatchSettings {
            size: ApplyConfig::DEFAULT_BATCH_SIZE,
            parser,
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }
}

/// Configuration for one apply run.
#[derive(Clone)]
pub struct ApplyConfig {
    pub function: Arc<dyn ApplyFunction>,
    pub error_handling: ErrorHandling,
    pub recoverable: Option<RecoverablePredicate>,
    pub parallel_workers: usize,
    pub batch: Option<BatchSettings>,
    pub output_column_prefix: String,
    pub verbose: bool,
    pub on_progress: Option<ProgressCallback>,
}

impl ApplyConfig {
    pub const DEFAULT_PARALLEL_WORKERS: usize = 4;
    pub const DEFAULT_BATCH_SIZE: usize = 10;
    pub const DEFAULT_OUTPUT_COLUMN_PREFIX: &'static str = "output";

    pub fn new(function: Arc<dyn ApplyFunction>) -> Self {
        ApplyConfig {
            function,
            error_handling: ErrorHandling::default(),
            recoverable: None,
            parallel_workers: Self::DEFAULT_PARALLEL_WORKERS,
            batch: None,
            output_column_prefix: Self::DEFAULT_OUTPUT_COLUMN_PREFIX.to_string(),
            verbose: false,
            on_progress: None,
        }
    }

    pub fn with_error_handling(mut self, error_handling: ErrorHandling) -> Self {
        self.error_handling = error_handling;
        self
    }

    pub fn with_recoverable<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&FunctionError) -> bool + Send + Sync + 'static,
    {
        self.recoverable = Some(Arc::new(predicate));
        self
    }

    pub fn with_parallel_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = workers;
        self
    }

    pub fn with_batch(mut self, batch: BatchSettings) -> Self {
        self.batch = Some(batch);
        self
    }

    pub fn with_output_column_prefix(mut self, prefix: &str) -> Self {
        self.output_column_prefix = prefix.to_string();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Construction-time validation: every invalid setup is rejected before
    /// any unit is built or dispatched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.error_handling == ErrorHandling::Log && self.recoverable.is_none() {
            return Err(ConfigError::MissingRecoverablePredicate);
        }
        if self.parallel_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if let Some(batch) = &self.batch
            && batch.size == 0
        {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(())
    }
}
