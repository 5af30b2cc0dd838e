use crate::function::FunctionError;
use model::records::table::TableError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("log error handling requires a recoverable-error predicate")]
    MissingRecoverablePredicate,

    #[error("parallel_workers must be greater than zero")]
    ZeroWorkers,

    #[error("batch size must be greater than zero")]
    ZeroBatchSize,

    #[error("work unit kind does not match the configured processing mode")]
    UnitModeMismatch,
}

#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("function '{function}' failed on unit {unit}: {source}")]
    Function {
        function: String,
        unit: usize,
        #[source]
        source: FunctionError,
    },

    #[error("batch response parser returned {actual} row(s) for a batch of {expected}")]
    ParserContract { expected: usize, actual: usize },

    #[error("assembled {actual} row(s) from {expected} input row(s)")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("table error: {0}")]
    Table(#[from] TableError),

    #[error("worker task failed: {0}")]
    Worker(String),
}
