use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid roster cache: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(
        "Column for date {date} not found (headers must be DD/MM/YYYY); existing headers: {headers:?}"
    )]
    DateColumnNotFound { date: String, headers: Vec<String> },

    #[error("Streak column containing '{fragment}' not found")]
    StreakColumnNotFound { fragment: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
