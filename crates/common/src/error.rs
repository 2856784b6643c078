use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Credit score {score} is below the funding floor of {floor}")]
    IneligibleScore { score: u16, floor: u16 },

    #[error("Milestone rewards total {requested} exceeds funding ceiling {ceiling}")]
    BudgetExceeded { ceiling: u64, requested: u64 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid repayment amount {amount}, outstanding loan is {outstanding}")]
    InvalidAmount { amount: u64, outstanding: u64 },

    #[error("Quote is expired or already executed: {0}")]
    StaleQuote(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Invalid developer address: {0}")]
    InvalidAddress(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
