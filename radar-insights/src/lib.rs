#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cast_lossless,
    clippy::useless_conversion,
    clippy::wildcard_imports,
    rust_2018_idioms
)]

//! # Radar-Insights
//! Scoring layer over the stores maintained by [`radar_data`].
//!
//! * **Indicators**: EMA, RSI, standard deviation, slope and a volatility proxy.
//! * **Arbitrage**: gross cross-exchange edges between the Binance, Bybit and OKX mids.
//! * **Signals**: spot momentum / mean-reversion, leverage and 5-10 minute prediction ideas.
//! * **Radar**: the pipeline wiring universe tracking, exchange feeds, the candle feed and a
//!   periodic scorer behind read accessors.

/// [`RadarConfig`](config::RadarConfig) with environment overrides.
pub mod config;

/// Pure technical indicators.
pub mod indicators;

/// Per-symbol scorer inputs.
pub mod row;

/// Cross-exchange [`Opportunity`](arbitrage::Opportunity) detection.
pub mod arbitrage;

/// Spot, leverage and prediction [`Idea`](signals::Idea) generators.
pub mod signals;

/// Output of a scoring pass.
pub mod snapshot;

/// Running [`Radar`](radar::Radar) pipeline.
pub mod radar;

pub use config::RadarConfig;
pub use radar::{Radar, Selection};
pub use snapshot::InsightSnapshot;
