use crate::{
    config::{Endpoints, FeedConfig},
    error::DataError,
    exchange::{ExchangeAdapter, ExchangeId, MarketUpdate, PingInterval, batched, join_url},
    feed::connection::ReconnectPolicy,
    symbol::Symbol,
};
use serde_json::json;
use std::time::Duration;
use url::Url;

/// Spot ticker REST and stream types for [`Bybit`].
pub mod ticker;

/// [`Bybit`] server [`PingInterval`] duration.
///
/// See docs: <https://bybit-exchange.github.io/docs/v5/ws/connect#how-to-send-the-heartbeat-packet>
pub const PING_INTERVAL_BYBIT: Duration = Duration::from_secs(20);

/// [`Bybit`] tickers channel prefix.
pub const TICKERS_CHANNEL: &str = "tickers";

/// REST spot tickers path.
pub const TICKERS_PATH: &str = "/v5/market/tickers";

/// [`Bybit`] spot peer exchange.
///
/// See docs: <https://bybit-exchange.github.io/docs/v5/ws/connect>
#[derive(Debug, Clone, PartialEq)]
pub struct Bybit {
    endpoints: Endpoints,
    batch_size: usize,
    reconnect: ReconnectPolicy,
}

impl Bybit {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            endpoints: config.bybit.clone(),
            batch_size: config.subscription_batch_size,
            reconnect: config.peer_reconnect,
        }
    }
}

impl ExchangeAdapter for Bybit {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bybit
    }

    fn snapshot_url(&self, _: &[Symbol]) -> Result<Url, DataError> {
        let mut url = join_url(&self.endpoints.rest, TICKERS_PATH)?;
        url.query_pairs_mut().append_pair("category", "spot");
        Ok(url)
    }

    fn parse_snapshot(&self, payload: &str) -> Result<Vec<MarketUpdate>, DataError> {
        ticker::parse_snapshot(payload).map(|tickers| {
            tickers
                .into_iter()
                .map(|ticker| MarketUpdate::Quote(ticker.into_quote()))
                .collect()
        })
    }

    fn stream_url(&self) -> Result<Url, DataError> {
        Url::parse(&self.endpoints.ws).map_err(DataError::from)
    }

    fn build_subscriptions(&self, symbols: &[Symbol]) -> Vec<String> {
        let channels = symbols
            .iter()
            .filter_map(|symbol| self.to_exchange_symbol(symbol).ok())
            .map(|instrument| format!("{TICKERS_CHANNEL}.{instrument}"))
            .collect::<Vec<_>>();

        batched(&channels, self.batch_size)
            .map(|args| json!({"op": "subscribe", "args": args}).to_string())
            .collect()
    }

    fn parse_stream_message(&self, payload: &str) -> Result<Vec<MarketUpdate>, DataError> {
        match ticker::parse_message(payload)? {
            ticker::BybitMessage::Ticker(ticker) => {
                Ok(vec![MarketUpdate::Quote(ticker.into_quote())])
            }
            ticker::BybitMessage::Ignore => Ok(Vec::new()),
        }
    }

    fn ping(&self) -> Option<PingInterval> {
        Some(PingInterval {
            interval: PING_INTERVAL_BYBIT,
            payload: json!({"op": "ping"}).to_string(),
        })
    }

    fn reconnect_policy(&self) -> ReconnectPolicy {
        self.reconnect
    }
}
