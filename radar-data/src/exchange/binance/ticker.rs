use crate::{error::DataError, symbol::Symbol, ticker::Ticker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// [`Binance`](super::Binance) real-time 24h rolling window mini ticker, as published on the
/// `!miniTicker@arr` all-market stream.
///
/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#all-market-mini-tickers-stream>
/// ```json
/// {
///     "e": "24hrMiniTicker",
///     "E": 1672515782136,
///     "s": "BTCUSDT",
///     "c": "16578.50",
///     "o": "16500.00",
///     "h": "16600.00",
///     "l": "16400.00",
///     "v": "1000.5",
///     "q": "16550000.1"
/// }
/// ```
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct BinanceMiniTicker {
    #[serde(
        alias = "E",
        deserialize_with = "crate::de::de_u64_epoch_ms_as_datetime_utc"
    )]
    pub time: DateTime<Utc>,

    #[serde(rename = "s")]
    pub symbol: Symbol,

    #[serde(alias = "c", deserialize_with = "crate::de::de_str")]
    pub last: f64,

    #[serde(alias = "o", deserialize_with = "crate::de::de_str")]
    pub open: f64,

    #[serde(alias = "h", deserialize_with = "crate::de::de_str")]
    pub high: f64,

    #[serde(alias = "l", deserialize_with = "crate::de::de_str")]
    pub low: f64,

    #[serde(alias = "v", deserialize_with = "crate::de::de_str")]
    pub volume: f64,

    #[serde(alias = "q", deserialize_with = "crate::de::de_str")]
    pub quote_volume: f64,
}

impl From<BinanceMiniTicker> for Ticker {
    fn from(value: BinanceMiniTicker) -> Self {
        Self {
            symbol: value.symbol,
            last: value.last,
            open: value.open,
            high: value.high,
            low: value.low,
            volume: value.volume,
            quote_volume: value.quote_volume,
            event_time: value.time,
        }
    }
}

/// [`Binance`](super::Binance) REST 24h ticker statistics.
///
/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/rest-api/market-data-endpoints#24hr-ticker-price-change-statistics>
/// ```json
/// {
///     "symbol": "BTCUSDT",
///     "priceChangePercent": "0.473",
///     "lastPrice": "16578.50",
///     "openPrice": "16500.00",
///     "highPrice": "16600.00",
///     "lowPrice": "16400.00",
///     "volume": "1000.5",
///     "quoteVolume": "16550000.1",
///     "openTime": 1672429382136,
///     "closeTime": 1672515782136
/// }
/// ```
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceTicker24h {
    pub symbol: Symbol,

    #[serde(deserialize_with = "crate::de::de_str")]
    pub last_price: f64,

    #[serde(deserialize_with = "crate::de::de_str")]
    pub open_price: f64,

    #[serde(deserialize_with = "crate::de::de_str")]
    pub high_price: f64,

    #[serde(deserialize_with = "crate::de::de_str")]
    pub low_price: f64,

    #[serde(deserialize_with = "crate::de::de_str")]
    pub volume: f64,

    #[serde(deserialize_with = "crate::de::de_str")]
    pub quote_volume: f64,

    #[serde(deserialize_with = "crate::de::de_u64_epoch_ms_as_datetime_utc")]
    pub close_time: DateTime<Utc>,
}

impl From<BinanceTicker24h> for Ticker {
    fn from(value: BinanceTicker24h) -> Self {
        Self {
            symbol: value.symbol,
            last: value.last_price,
            open: value.open_price,
            high: value.high_price,
            low: value.low_price,
            volume: value.volume,
            quote_volume: value.quote_volume,
            event_time: value.close_time,
        }
    }
}

/// Parse a REST `ticker/24hr` array. Entries that fail to deserialise are skipped.
pub fn parse_tickers_24h(payload: &str) -> Result<Vec<Ticker>, DataError> {
    parse_array::<BinanceTicker24h>(payload)
}

/// Parse a `!miniTicker@arr` frame. Non-array frames (eg/ subscription results) yield nothing.
pub fn parse_mini_tickers(payload: &str) -> Result<Vec<Ticker>, DataError> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(items)) => Ok(deserialise_items::<BinanceMiniTicker>(items)),
        Ok(_) => Ok(Vec::new()),
        Err(error) => Err(DataError::deserialise(error, payload)),
    }
}

fn parse_array<T>(payload: &str) -> Result<Vec<Ticker>, DataError>
where
    T: for<'de> Deserialize<'de> + Into<Ticker>,
{
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(items)) => Ok(deserialise_items::<T>(items)),
        Ok(_) => Err(DataError::UnexpectedPayload(
            "Binance ticker snapshot is not an array".to_string(),
        )),
        Err(error) => Err(DataError::deserialise(error, payload)),
    }
}

fn deserialise_items<T>(items: Vec<Value>) -> Vec<Ticker>
where
    T: for<'de> Deserialize<'de> + Into<Ticker>,
{
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(ticker) => Some(ticker.into()),
            Err(error) => {
                debug!(%error, "dropping malformed Binance ticker entry");
                None
            }
        })
        .collect()
}
