use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Source is not tabular text: {0}")]
    NotTabular(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
