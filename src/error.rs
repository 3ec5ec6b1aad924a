use thiserror::Error;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<polars::error::PolarsError> for QaError {
    fn from(err: polars::error::PolarsError) -> Self {
        QaError::Query(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QaError>;
