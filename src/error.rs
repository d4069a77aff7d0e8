use thiserror::Error;

/// Errors surfaced by persistence and ingestion. Core in-memory mutations do
/// not fail; storage problems are logged and the session state stays
/// authoritative.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
