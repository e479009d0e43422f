use crate::{
    error::DataError, feed::connection::ReconnectPolicy, symbol::Symbol, ticker::Ticker,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// `Binance` reference exchange adapter and payload types.
pub mod binance;

/// `Bybit` spot peer exchange adapter and payload types.
pub mod bybit;

/// `Okx` spot peer exchange adapter and payload types.
pub mod okx;

/// Unique identifier of a supported exchange.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeId {
    #[display("binance")]
    Binance,
    #[display("bybit")]
    Bybit,
    #[display("okx")]
    Okx,
}

impl ExchangeId {
    /// Every supported exchange, in the fixed order used for deterministic iteration.
    pub const ALL: [ExchangeId; 3] = [ExchangeId::Binance, ExchangeId::Bybit, ExchangeId::Okx];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Binance => "binance",
            ExchangeId::Bybit => "bybit",
            ExchangeId::Okx => "okx",
        }
    }
}

/// Role an exchange plays in the pipeline.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub enum ExchangeRole {
    /// Source of [`Ticker`]s, history and the universe ranking.
    Reference,
    /// Source of bid/ask quotes only.
    Peer,
}

/// Top of book quote published by a peer exchange, already in canonical [`Symbol`] form.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
}

/// Normalised update produced by an [`ExchangeAdapter`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum MarketUpdate {
    Ticker(Ticker),
    Quote(Quote),
}

impl MarketUpdate {
    pub fn symbol(&self) -> &Symbol {
        match self {
            MarketUpdate::Ticker(ticker) => &ticker.symbol,
            MarketUpdate::Quote(quote) => &quote.symbol,
        }
    }
}

/// Application level keep-alive an exchange expects on an idle connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingInterval {
    pub interval: Duration,
    pub payload: String,
}

/// Exchange specific capabilities used by the generic [`FeedManager`](crate::feed::FeedManager).
///
/// Every exchange schema (REST snapshot, subscription framing, stream payloads and instrument
/// ids) is isolated behind this trait.
pub trait ExchangeAdapter: Send + Sync + 'static {
    fn id(&self) -> ExchangeId;

    fn role(&self) -> ExchangeRole {
        ExchangeRole::Peer
    }

    /// REST endpoint returning a snapshot of every requested symbol.
    fn snapshot_url(&self, symbols: &[Symbol]) -> Result<Url, DataError>;

    /// Parse a REST snapshot body into updates. Individual malformed entries are skipped.
    fn parse_snapshot(&self, payload: &str) -> Result<Vec<MarketUpdate>, DataError>;

    /// WebSocket endpoint to connect to.
    fn stream_url(&self) -> Result<Url, DataError>;

    /// Subscription requests to send once connected, each covering at most one batch.
    fn build_subscriptions(&self, symbols: &[Symbol]) -> Vec<String>;

    /// Parse one inbound text frame. Acknowledgements and pongs yield no updates.
    fn parse_stream_message(&self, payload: &str) -> Result<Vec<MarketUpdate>, DataError>;

    /// Translate a canonical [`Symbol`] into this exchange's instrument id.
    fn to_exchange_symbol(&self, symbol: &Symbol) -> Result<String, DataError> {
        Ok(symbol.to_string())
    }

    /// Translate this exchange's instrument id into a canonical [`Symbol`].
    fn to_canonical(&self, instrument: &str) -> Option<Symbol> {
        Some(Symbol::new(instrument))
    }

    fn ping(&self) -> Option<PingInterval> {
        None
    }

    fn reconnect_policy(&self) -> ReconnectPolicy;
}

/// Split `items` into subscription request batches of at most `batch_size` entries.
pub fn batched<T: Clone>(items: &[T], batch_size: usize) -> impl Iterator<Item = Vec<T>> + '_ {
    items.chunks(batch_size.max(1)).map(<[T]>::to_vec)
}

/// Join a base url and a path, tolerating a trailing slash on the base.
pub(crate) fn join_url(base: &str, path: &str) -> Result<Url, DataError> {
    let base = base.trim_end_matches('/');
    Url::parse(&format!("{base}{path}")).map_err(DataError::from)
}
