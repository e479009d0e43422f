use crate::{error::DataError, exchange::Quote, symbol::Symbol};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// [`Bybit`](super::Bybit) spot ticker, shared by the REST snapshot list and the `tickers.{symbol}`
/// stream.
///
/// The spot stream omits top of book, in which case the quote falls back to `lastPrice`.
///
/// ### Raw Payload Examples
/// See docs: <https://bybit-exchange.github.io/docs/v5/market/tickers>
/// ```json
/// {
///     "symbol": "BTCUSDT",
///     "bid1Price": "20517.96",
///     "bid1Size": "2",
///     "ask1Price": "20527.77",
///     "ask1Size": "1.862172",
///     "lastPrice": "20533.13",
///     "volume24h": "2.8738",
///     "turnover24h": "58896.6"
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitTicker {
    pub symbol: String,

    #[serde(rename = "bid1Price", default, deserialize_with = "crate::de::de_opt_str_f64")]
    pub bid: Option<f64>,

    #[serde(rename = "ask1Price", default, deserialize_with = "crate::de::de_opt_str_f64")]
    pub ask: Option<f64>,

    #[serde(rename = "lastPrice", default, deserialize_with = "crate::de::de_opt_str_f64")]
    pub last: Option<f64>,
}

impl BybitTicker {
    pub fn into_quote(self) -> Quote {
        Quote {
            symbol: Symbol::new(&self.symbol),
            bid: self.bid,
            ask: self.ask,
            last: self.last,
        }
    }
}

/// Messages received on the [`Bybit`](super::Bybit) public spot stream.
#[derive(Clone, PartialEq, Debug)]
pub enum BybitMessage {
    /// Subscription acknowledgement, pong or any other control frame.
    Ignore,
    Ticker(BybitTicker),
}

/// Parse one stream frame.
///
/// ### Raw Payload Examples
/// See docs: <https://bybit-exchange.github.io/docs/v5/websocket/public/ticker>
/// ```json
/// {"success": true, "ret_msg": "subscribe", "conn_id": "2324d924", "op": "subscribe"}
/// ```
/// ```json
/// {
///     "topic": "tickers.BTCUSDT",
///     "ts": 1673853746003,
///     "type": "snapshot",
///     "cs": 2588407389,
///     "data": {"symbol": "BTCUSDT", "lastPrice": "21109.77", "highPrice24h": "21426.99"}
/// }
/// ```
pub fn parse_message(payload: &str) -> Result<BybitMessage, DataError> {
    let value = serde_json::from_str::<Value>(payload)
        .map_err(|error| DataError::deserialise(error, payload))?;

    if value.get("op").is_some() {
        return Ok(BybitMessage::Ignore);
    }

    let is_ticker_topic = value
        .get("topic")
        .and_then(Value::as_str)
        .is_some_and(|topic| topic.starts_with("tickers."));

    match value.get("data") {
        Some(data) if is_ticker_topic => serde_json::from_value::<BybitTicker>(data.clone())
            .map(BybitMessage::Ticker)
            .map_err(|error| DataError::deserialise(error, payload)),
        _ => Ok(BybitMessage::Ignore),
    }
}

/// Parse a REST `/v5/market/tickers` response, skipping malformed entries.
///
/// ```json
/// {"retCode": 0, "retMsg": "OK", "result": {"category": "spot", "list": [..]}, "time": 1673859087947}
/// ```
pub fn parse_snapshot(payload: &str) -> Result<Vec<BybitTicker>, DataError> {
    let value = serde_json::from_str::<Value>(payload)
        .map_err(|error| DataError::deserialise(error, payload))?;

    let list = value
        .get("result")
        .and_then(|result| result.get("list"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            DataError::UnexpectedPayload("Bybit tickers response missing result.list".to_string())
        })?;

    Ok(list
        .iter()
        .filter_map(|item| match serde_json::from_value::<BybitTicker>(item.clone()) {
            Ok(ticker) => Some(ticker),
            Err(error) => {
                debug!(%error, "dropping malformed Bybit ticker entry");
                None
            }
        })
        .collect())
}
