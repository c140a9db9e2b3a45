use thiserror::Error;

/// Failure reported by the card terminal while retrieving, collecting or
/// processing a payment intent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TerminalError {
    pub code: TerminalErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalErrorCode {
    Declined,
    ReaderDisconnected,
    Canceled,
    ConnectionToken,
    Unexpected,
}

impl TerminalError {
    pub fn new(code: TerminalErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Raised by a connection-token provider when the backend cannot issue a
/// fresh secret for the terminal session.
#[derive(Error, Debug)]
#[error("failed to fetch connection token")]
pub struct ConnectionTokenError {
    #[source]
    pub source: Box<PosError>,
}

#[derive(Error, Debug)]
pub enum PosError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Authentication(String),
    #[error("please log in first")]
    NotAuthenticated,
    #[error("{message}")]
    Backend { status: u16, message: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Terminal(#[from] TerminalError),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    #[error("a payment is already in progress")]
    PaymentInFlight,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PosError>;
