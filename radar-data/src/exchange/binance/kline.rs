use crate::{
    candle::{Candle, KlineInterval},
    error::DataError,
    exchange::join_url,
    symbol::Symbol,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// [`Binance`](super::Binance) REST kline, published as a positional array.
///
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/rest-api/market-data-endpoints#klinecandlestick-data>
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct BinanceKline(
    i64,    // 0: Open time
    String, // 1: Open
    String, // 2: High
    String, // 3: Low
    String, // 4: Close
    String, // 5: Volume
    i64,    // 6: Close time
    String, // 7: Quote asset volume
    i64,    // 8: Number of trades
    String, // 9: Taker buy base asset volume
    String, // 10: Taker buy quote asset volume
    String, // 11: Ignore
);

impl BinanceKline {
    fn into_candle(self) -> Option<Candle> {
        Some(Candle {
            open_time: DateTime::from_timestamp_millis(self.0)?,
            open: self.1.parse().ok()?,
            high: self.2.parse().ok()?,
            low: self.3.parse().ok()?,
            close: self.4.parse().ok()?,
        })
    }
}

/// [`Binance`](super::Binance) real-time kline stream event.
///
/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#klinecandlestick-streams-for-utc>
/// ```json
/// {
///     "e": "kline",
///     "E": 1672515782136,
///     "s": "BTCUSDT",
///     "k": {
///         "t": 1672515780000,
///         "T": 1672515839999,
///         "s": "BTCUSDT",
///         "i": "1m",
///         "o": "16500.00",
///         "c": "16578.50",
///         "h": "16600.00",
///         "l": "16400.00",
///         "x": false
///     }
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct BinanceKlineEvent {
    #[serde(rename = "s")]
    pub symbol: Symbol,

    #[serde(rename = "k")]
    pub kline: BinanceKlineInner,
}

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct BinanceKlineInner {
    #[serde(
        rename = "t",
        deserialize_with = "crate::de::de_u64_epoch_ms_as_datetime_utc"
    )]
    pub open_time: DateTime<Utc>,

    #[serde(rename = "i")]
    pub interval: KlineInterval,

    #[serde(rename = "o", deserialize_with = "crate::de::de_str")]
    pub open: f64,

    #[serde(rename = "h", deserialize_with = "crate::de::de_str")]
    pub high: f64,

    #[serde(rename = "l", deserialize_with = "crate::de::de_str")]
    pub low: f64,

    #[serde(rename = "c", deserialize_with = "crate::de::de_str")]
    pub close: f64,
}

impl From<BinanceKlineInner> for Candle {
    fn from(value: BinanceKlineInner) -> Self {
        Self {
            open_time: value.open_time,
            open: value.open,
            high: value.high,
            low: value.low,
            close: value.close,
        }
    }
}

/// REST klines endpoint for `symbol` and `interval`.
pub fn klines_url(
    rest_base: &str,
    symbol: &Symbol,
    interval: KlineInterval,
    limit: usize,
) -> Result<Url, DataError> {
    let mut url = join_url(rest_base, "/api/v3/klines")?;
    url.query_pairs_mut()
        .append_pair("symbol", symbol.as_str())
        .append_pair("interval", interval.as_str())
        .append_pair("limit", &limit.to_string());
    Ok(url)
}

/// Kline stream endpoint for `symbol` and `interval`, eg/ `.../ws/btcusdt@kline_1m`.
pub fn kline_stream_url(
    ws_base: &str,
    symbol: &Symbol,
    interval: KlineInterval,
) -> Result<Url, DataError> {
    join_url(
        ws_base,
        &format!(
            "/{}@kline_{}",
            symbol.as_str().to_ascii_lowercase(),
            interval.as_str()
        ),
    )
}

/// Parse a REST klines array, skipping rows that fail to parse.
pub fn parse_klines(payload: &str) -> Result<Vec<Candle>, DataError> {
    let rows = serde_json::from_str::<Vec<serde_json::Value>>(payload)
        .map_err(|error| DataError::deserialise(error, payload))?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let candle = serde_json::from_value::<BinanceKline>(row)
                .ok()
                .and_then(BinanceKline::into_candle);
            if candle.is_none() {
                debug!("dropping malformed Binance kline row");
            }
            candle
        })
        .collect())
}

/// Parse a kline stream frame. Frames without a kline (eg/ subscription results) yield `None`.
pub fn parse_kline_message(payload: &str) -> Result<Option<BinanceKlineEvent>, DataError> {
    let value = serde_json::from_str::<serde_json::Value>(payload)
        .map_err(|error| DataError::deserialise(error, payload))?;

    if value.get("k").is_none() {
        return Ok(None);
    }

    serde_json::from_value::<BinanceKlineEvent>(value)
        .map(Some)
        .map_err(|error| DataError::deserialise(error, payload))
}
