use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    /// A row carried a different number of cells than the table has columns.
    #[error("row {row} has {found} cells but the table has {expected} columns")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
