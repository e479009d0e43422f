#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::useless_conversion,
    clippy::wildcard_imports,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Radar-Data
//! Resilient ingestion of spot ticker data from a reference exchange (Binance) and two peer
//! exchanges (Bybit, OKX).
//!
//! * **Universe**: top N USDT pairs by 24h quote volume, refreshed on a fixed cadence.
//! * **Feeds**: one generic [`FeedManager`](feed::FeedManager) per exchange, parameterised by
//!   an [`ExchangeAdapter`](exchange::ExchangeAdapter), combining periodic REST snapshots with a
//!   reconnecting WebSocket stream.
//! * **Stores**: a merged [`PriceBook`](book::PriceBook), the reference
//!   [`TickerStore`](ticker::TickerStore) and bounded per-symbol
//!   [`HistoryStore`](history::HistoryStore), all behind short-lived locks.
//! * **Candles**: a bounded OHLC series for one selected symbol, fed by the reference kline stream.

/// All [`Error`](std::error::Error)s generated in Radar-Data.
pub mod error;

/// Deserialisation helpers for exchange payloads that encode numbers as strings.
pub mod de;

/// Canonical [`Symbol`](symbol::Symbol) identifier.
pub mod symbol;

/// Feed endpoints, cadences and reconnect policies.
pub mod config;

/// Exchange adapters: REST snapshot and WebSocket stream schemas per exchange.
pub mod exchange;

/// Merged per (symbol, exchange) price state.
pub mod book;

/// Reference exchange 24h tickers.
pub mod ticker;

/// Bounded rolling history of reference last prices.
pub mod history;

/// Shared store bundle that feed managers write into.
pub mod state;

/// Connection state machine and the generic reconnecting [`FeedManager`](feed::FeedManager).
pub mod feed;

/// Tracked symbol [`Universe`](universe::Universe) and its periodic refresh.
pub mod universe;

/// Candle series and the reference kline feed.
pub mod candle;

/// Shared HTTP client used for every REST snapshot.
pub fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, error::DataError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(error::DataError::from)
}

/// Fetch `url` and return the response body, treating non-success status codes as errors.
pub async fn fetch_text(client: &reqwest::Client, url: &url::Url) -> Result<String, error::DataError> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(error::DataError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}
