use mongodb::error::ErrorKind;
use thiserror::Error;

/// Persistence layer unreachable or returning data we cannot read.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        match *err.kind {
            ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => {
                StorageError::Corrupt(err.to_string())
            }
            _ => StorageError::Backend(err.to_string()),
        }
    }
}

/// Errors from the price source. All of them are recovered per asset.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("unsupported asset: {0}")]
    UnsupportedAsset(String),

    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("quote request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("malformed quote payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for QuoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QuoteError::Timeout
        } else if err.is_decode() {
            QuoteError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            QuoteError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            QuoteError::Connection(err.to_string())
        }
    }
}

/// Malformed user input. Never a system fault: always turned into a reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("invalid direction: {0}")]
    InvalidDirection(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl ValidationError {
    /// Corrective text shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::MissingArgument("ticker") => "Please add a ticker, e.g. /unalert BTC",
            ValidationError::MissingArgument(_) => {
                "Wrong format. Use: /alert [ticker] [price] [above/below]\nExample: /alert BTC 50000 above"
            }
            ValidationError::InvalidThreshold(_) => {
                "Can't read the price. Make sure it is a positive number."
            }
            ValidationError::InvalidDirection(_) => "The last argument must be 'above' or 'below'.",
            ValidationError::UnknownCommand(_) => "I don't know that command. Try /start",
        }
    }
}

/// Outbound message could not be delivered.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("message rejected: {0}")]
    Rejected(String),

    #[error("connection error: {0}")]
    Connection(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => DeliveryError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => DeliveryError::Connection(err.to_string()),
        }
    }
}

/// Startup configuration problems. The only fatal class.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidVar { name: &'static str, value: String },
}
