use thiserror::Error;

/// Errors surfaced by the load and report pipeline. Nothing is caught or
/// retried internally; the first failure aborts the remaining steps and
/// reaches the operator via the process exit.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Tabular input could not be parsed (missing column, bad row).
    #[error("tabular input: {0}")]
    Parse(#[from] csv::Error),

    /// A product container in the catalog is missing an expected child
    /// node or carries text that does not follow the catalog conventions.
    #[error("catalog container {index}: {detail}")]
    Structure { index: usize, detail: String },

    /// Insert or query failure, including constraint violations on
    /// duplicate product/location ids.
    #[error("store: {0}")]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EtlError {
    pub(crate) fn structure(index: usize, detail: impl Into<String>) -> Self {
        EtlError::Structure {
            index,
            detail: detail.into(),
        }
    }
}
