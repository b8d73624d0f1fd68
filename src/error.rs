use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// Source missing, empty, or not shaped like a channel metrics table.
    /// Fatal for the session: nothing is rendered from a partial table.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::DataUnavailable(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
