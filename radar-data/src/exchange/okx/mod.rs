use crate::{
    config::{Endpoints, FeedConfig},
    error::DataError,
    exchange::{
        ExchangeAdapter, ExchangeId, MarketUpdate, PingInterval, Quote, batched, join_url,
    },
    feed::connection::ReconnectPolicy,
    symbol::{QUOTE_ASSET, Symbol},
};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Spot ticker REST and stream types for [`Okx`].
pub mod ticker;

/// [`Okx`] server [`PingInterval`] duration.
///
/// See docs: <https://www.okx.com/docs-v5/en/#websocket-api-connect>
pub const PING_INTERVAL_OKX: Duration = Duration::from_secs(29);

/// [`Okx`] tickers channel name.
pub const TICKERS_CHANNEL: &str = "tickers";

/// REST spot tickers path.
pub const TICKERS_PATH: &str = "/api/v5/market/tickers";

/// [`Okx`] spot peer exchange.
///
/// Uses `BASE-QUOTE` instrument ids, translated to and from canonical `BASEQUOTE` symbols.
///
/// See docs: <https://www.okx.com/docs-v5/en/#websocket-api>
#[derive(Debug, Clone, PartialEq)]
pub struct Okx {
    endpoints: Endpoints,
    batch_size: usize,
    reconnect: ReconnectPolicy,
}

impl Okx {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            endpoints: config.okx.clone(),
            batch_size: config.subscription_batch_size,
            reconnect: config.peer_reconnect,
        }
    }

    fn quotes(&self, tickers: Vec<ticker::OkxTicker>) -> Vec<MarketUpdate> {
        tickers
            .into_iter()
            .filter_map(|ticker| match self.to_canonical(&ticker.inst_id) {
                Some(symbol) => Some(MarketUpdate::Quote(Quote {
                    symbol,
                    bid: ticker.bid,
                    ask: ticker.ask,
                    last: ticker.last,
                })),
                None => {
                    debug!(inst_id = %ticker.inst_id, "skipping untranslatable Okx instrument");
                    None
                }
            })
            .collect()
    }
}

impl ExchangeAdapter for Okx {
    fn id(&self) -> ExchangeId {
        ExchangeId::Okx
    }

    fn snapshot_url(&self, _: &[Symbol]) -> Result<Url, DataError> {
        let mut url = join_url(&self.endpoints.rest, TICKERS_PATH)?;
        url.query_pairs_mut().append_pair("instType", "SPOT");
        Ok(url)
    }

    fn parse_snapshot(&self, payload: &str) -> Result<Vec<MarketUpdate>, DataError> {
        ticker::parse_tickers(payload).map(|tickers| self.quotes(tickers))
    }

    fn stream_url(&self) -> Result<Url, DataError> {
        Url::parse(&self.endpoints.ws).map_err(DataError::from)
    }

    fn build_subscriptions(&self, symbols: &[Symbol]) -> Vec<String> {
        let args = symbols
            .iter()
            .filter_map(|symbol| match self.to_exchange_symbol(symbol) {
                Ok(inst_id) => Some(json!({"channel": TICKERS_CHANNEL, "instId": inst_id})),
                Err(error) => {
                    debug!(%error, "skipping Okx subscription");
                    None
                }
            })
            .collect::<Vec<_>>();

        batched(&args, self.batch_size)
            .map(|args| json!({"op": "subscribe", "args": args}).to_string())
            .collect()
    }

    fn parse_stream_message(&self, payload: &str) -> Result<Vec<MarketUpdate>, DataError> {
        ticker::parse_tickers(payload).map(|tickers| self.quotes(tickers))
    }

    fn to_exchange_symbol(&self, symbol: &Symbol) -> Result<String, DataError> {
        symbol
            .base()
            .map(|base| format!("{base}-{QUOTE_ASSET}"))
            .ok_or_else(|| DataError::UntranslatableSymbol {
                exchange: ExchangeId::Okx,
                symbol: symbol.to_string(),
            })
    }

    fn to_canonical(&self, instrument: &str) -> Option<Symbol> {
        let (base, quote) = instrument.split_once('-')?;
        if base.is_empty() || quote.is_empty() || quote.contains('-') {
            return None;
        }
        Some(Symbol::new(format!("{base}{quote}")))
    }

    fn ping(&self) -> Option<PingInterval> {
        Some(PingInterval {
            interval: PING_INTERVAL_OKX,
            payload: "ping".to_string(),
        })
    }

    fn reconnect_policy(&self) -> ReconnectPolicy {
        self.reconnect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_okx_symbol_translation() {
        struct TestCase {
            input: &'static str,
            expected: Option<&'static str>,
        }

        let okx = Okx::new(&FeedConfig::default());

        let tests = vec![
            TestCase {
                // TC0: spot instrument
                input: "BTC-USDT",
                expected: Some("BTCUSDT"),
            },
            TestCase {
                // TC1: lowercase is normalised
                input: "eth-usdt",
                expected: Some("ETHUSDT"),
            },
            TestCase {
                // TC2: derivative instrument is untranslatable
                input: "BTC-USDT-SWAP",
                expected: None,
            },
            TestCase {
                // TC3: no separator
                input: "BTCUSDT",
                expected: None,
            },
            TestCase {
                // TC4: empty base
                input: "-USDT",
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = okx.to_canonical(test.input);
            assert_eq!(actual, test.expected.map(Symbol::new), "TC{} failed", index);
        }
    }

    #[test]
    fn test_okx_symbol_round_trip() {
        let okx = Okx::new(&FeedConfig::default());
        for raw in ["BTCUSDT", "ETHUSDT", "1000SATSUSDT", "PEPEUSDT"] {
            let symbol = Symbol::new(raw);
            let inst_id = okx.to_exchange_symbol(&symbol).unwrap();
            assert_eq!(okx.to_canonical(&inst_id), Some(symbol));
        }

        assert!(matches!(
            okx.to_exchange_symbol(&Symbol::new("ETHBTC")),
            Err(DataError::UntranslatableSymbol { exchange: ExchangeId::Okx, .. })
        ));
    }

    #[test]
    fn test_okx_build_subscriptions() {
        let okx = Okx::new(&FeedConfig::default());
        let requests = okx.build_subscriptions(&[
            Symbol::new("BTCUSDT"),
            Symbol::new("ETHBTC"),
            Symbol::new("SOLUSDT"),
        ]);

        assert_eq!(requests.len(), 1);
        let request = serde_json::from_str::<serde_json::Value>(&requests[0]).unwrap();
        assert_eq!(
            request,
            json!({
                "op": "subscribe",
                "args": [
                    {"channel": "tickers", "instId": "BTC-USDT"},
                    {"channel": "tickers", "instId": "SOL-USDT"}
                ]
            })
        );
    }

    #[test]
    fn test_okx_parse_stream_message_translates_symbols() {
        let okx = Okx::new(&FeedConfig::default());
        let updates = okx
            .parse_stream_message(
                r#"{"arg":{"channel":"tickers","instId":"BTC-USDT"},"data":[
                    {"instId":"BTC-USDT","bidPx":"100","askPx":"100.4","last":"100.1"},
                    {"instId":"BTC-USDT-SWAP","bidPx":"100","askPx":"100.4","last":"100.1"}
                ]}"#,
            )
            .unwrap();

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].symbol().as_str(), "BTCUSDT");
        assert_eq!(okx.ping().unwrap().interval, PING_INTERVAL_OKX);
    }
}
