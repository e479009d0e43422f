use crate::exchange::ExchangeId;
use std::time::Duration;
use thiserror::Error;

/// All errors generated in `radar-data`.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DataError {
    #[error("SocketError: {0}")]
    Socket(String),

    #[error("WebSocket read timeout: no data received for {} seconds", .0.as_secs())]
    ReadTimeout(Duration),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("failed to deserialise payload: {error}")]
    Deserialise { error: String, payload: String },

    #[error("unexpected payload shape: {0}")]
    UnexpectedPayload(String),

    #[error("symbol {symbol} has no {exchange} instrument id")]
    UntranslatableSymbol { exchange: ExchangeId, symbol: String },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl DataError {
    /// Construct a [`DataError::Deserialise`], keeping a bounded excerpt of the offending payload.
    pub fn deserialise(error: serde_json::Error, payload: &str) -> Self {
        Self::Deserialise {
            error: error.to_string(),
            payload: payload.chars().take(160).collect(),
        }
    }

    /// Determine if an error requires the owning connection to be re-established.
    ///
    /// Everything else is scoped to a single message or request and is dropped in place.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_terminal(&self) -> bool {
        match self {
            DataError::Socket(_) | DataError::ReadTimeout(_) => true,
            _ => false,
        }
    }

    /// Determine if retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            DataError::Socket(_) | DataError::ReadTimeout(_) | DataError::Http(_) => true,
            DataError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(value: reqwest::Error) -> Self {
        match value.status() {
            Some(status) => Self::HttpStatus {
                url: value.url().map(ToString::to_string).unwrap_or_default(),
                status: status.as_u16(),
            },
            None => Self::Http(value.to_string()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for DataError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(value.to_string())
    }
}
