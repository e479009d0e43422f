use crate::{
    config::{Endpoints, FeedConfig},
    error::DataError,
    exchange::{ExchangeAdapter, ExchangeId, ExchangeRole, MarketUpdate, join_url},
    feed::connection::ReconnectPolicy,
    symbol::Symbol,
};
use itertools::Itertools;
use url::Url;

/// Kline REST and stream types for [`Binance`].
pub mod kline;

/// 24h ticker REST and mini ticker stream types for [`Binance`].
pub mod ticker;

/// All-market mini ticker stream name.
///
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#all-market-mini-tickers-stream>
pub const MINI_TICKER_ARR_STREAM: &str = "!miniTicker@arr";

/// REST 24h ticker statistics path.
pub const TICKER_24H_PATH: &str = "/api/v3/ticker/24hr";

/// [`Binance`] spot, the reference exchange.
///
/// Publishes [`Ticker`](crate::ticker::Ticker)s from the all-market mini ticker stream, so no
/// per-symbol subscription requests are required.
#[derive(Debug, Clone, PartialEq)]
pub struct Binance {
    endpoints: Endpoints,
    reconnect: ReconnectPolicy,
}

impl Binance {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            endpoints: config.binance.clone(),
            reconnect: config.reference_reconnect,
        }
    }

    /// Full market 24h ticker snapshot used to rank the universe.
    pub fn market_snapshot_url(&self) -> Result<Url, DataError> {
        join_url(&self.endpoints.rest, TICKER_24H_PATH)
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

impl ExchangeAdapter for Binance {
    fn id(&self) -> ExchangeId {
        ExchangeId::Binance
    }

    fn role(&self) -> ExchangeRole {
        ExchangeRole::Reference
    }

    fn snapshot_url(&self, symbols: &[Symbol]) -> Result<Url, DataError> {
        let mut url = self.market_snapshot_url()?;
        if !symbols.is_empty() {
            let symbols = format!(
                "[{}]",
                symbols
                    .iter()
                    .map(|symbol| format!("\"{symbol}\""))
                    .join(",")
            );
            url.query_pairs_mut().append_pair("symbols", &symbols);
        }
        Ok(url)
    }

    fn parse_snapshot(&self, payload: &str) -> Result<Vec<MarketUpdate>, DataError> {
        ticker::parse_tickers_24h(payload)
            .map(|tickers| tickers.into_iter().map(MarketUpdate::Ticker).collect())
    }

    fn stream_url(&self) -> Result<Url, DataError> {
        join_url(&self.endpoints.ws, &format!("/{MINI_TICKER_ARR_STREAM}"))
    }

    fn build_subscriptions(&self, _: &[Symbol]) -> Vec<String> {
        Vec::new()
    }

    fn parse_stream_message(&self, payload: &str) -> Result<Vec<MarketUpdate>, DataError> {
        ticker::parse_mini_tickers(payload)
            .map(|tickers| tickers.into_iter().map(MarketUpdate::Ticker).collect())
    }

    fn reconnect_policy(&self) -> ReconnectPolicy {
        self.reconnect
    }
}
