use crate::ledger::models::Source;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Command batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Both reward sources are unreachable")]
    BothSourcesUnreachable,

    #[error("No records to export")]
    NoRecords,

    #[error("Round-trip mismatch: {0}")]
    RoundTripMismatch(String),
}

/// Source retrieval and shape errors. Every variant degrades the affected
/// source to an empty ledger; none of them is fatal on its own.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{layer} source unreachable: {message}")]
    Unreachable { layer: Source, message: String },

    #[error("{layer} source returned GraphQL errors: {errors}")]
    GraphQl { layer: Source, errors: String },

    #[error("Malformed {layer} source data: {message}")]
    Malformed { layer: Source, message: String },
}

impl SourceError {
    pub fn layer(&self) -> Source {
        match self {
            SourceError::Unreachable { layer, .. }
            | SourceError::GraphQl { layer, .. }
            | SourceError::Malformed { layer, .. } => *layer,
        }
    }
}

/// Reward amount parsing and arithmetic errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Not a number: {raw:?}")]
    NotANumber { raw: String },

    #[error("Amount out of range: {raw}")]
    OutOfRange { raw: String },

    #[error("Negative amount: {raw}")]
    Negative { raw: String },

    #[error("Amount overflow while aggregating")]
    Overflow,
}

/// Participant identity canonicalization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Identity exceeds 256 bits: {raw}")]
    OutOfRange { raw: String },

    #[error("Identity is not a decimal or hex integer: {raw:?}")]
    Malformed { raw: String },
}

/// Command batch generation and parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("No rows to encode into a command batch")]
    Empty,

    #[error("Amount for {identity} is not a positive integer: {amount}")]
    NonIntegralAmount { identity: String, amount: String },

    #[error("Malformed tabular row {line}: {message}")]
    MalformedRow { line: usize, message: String },
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
