use thiserror::Error;

/// Errors the driver can report to the operator; all are fatal to the run.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{0}")]
    Config(String),

    #[error("failed to load stage library at {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: libloading::Error,
    },

    #[error("stage library at {path} is missing the `{symbol}` export: {source}")]
    MissingSymbol {
        path: String,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("stage `{stage}` item contained an embedded NUL: {source}")]
    Encoding {
        stage: String,
        #[source]
        source: std::ffi::NulError,
    },

    #[error("stage `{stage}` reported an error from `{operation}`: {reason}")]
    StageReported {
        stage: String,
        operation: &'static str,
        reason: String,
    },

    #[error("failed to read stdin: {0}")]
    Io(#[from] std::io::Error),
}
