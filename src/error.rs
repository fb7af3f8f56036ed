use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrendError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("degenerate fit: {0}")]
    DegenerateFit(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
