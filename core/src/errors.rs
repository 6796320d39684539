use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("Genesis failed: {0}")]
    Genesis(String),

    #[error("Unexpected response to {function}: {message}")]
    UnexpectedResponse { function: String, message: String },

    #[error("Supply not conserved: expected {expected}, found {actual}")]
    ConservationViolated { expected: i64, actual: i64 },

    #[error("Worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
