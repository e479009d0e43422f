use crate::symbol::Symbol;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, str::FromStr};

/// Reference kline feed: REST history load followed by a reconnecting kline stream.
pub mod feed;

/// Maximum number of candles retained per series.
pub const CANDLE_CAPACITY: usize = 140;

/// OHLC bar for the selected symbol and [`KlineInterval`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Supported chart timeframes.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Display, Deserialize, Serialize,
)]
pub enum KlineInterval {
    #[default]
    #[display("1m")]
    #[serde(rename = "1m")]
    M1,
    #[display("5m")]
    #[serde(rename = "5m")]
    M5,
    #[display("15m")]
    #[serde(rename = "15m")]
    M15,
    #[display("1h")]
    #[serde(rename = "1h")]
    H1,
}

impl KlineInterval {
    pub const ALL: [KlineInterval; 4] = [
        KlineInterval::M1,
        KlineInterval::M5,
        KlineInterval::M15,
        KlineInterval::H1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::M1 => "1m",
            KlineInterval::M5 => "5m",
            KlineInterval::M15 => "15m",
            KlineInterval::H1 => "1h",
        }
    }
}

impl FromStr for KlineInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KlineInterval::ALL
            .into_iter()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| format!("unsupported kline interval: {s}"))
    }
}

/// Chart feed state exposed for display.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Display, Deserialize, Serialize)]
pub enum ChartStatus {
    #[default]
    Idle,
    Loading,
    Live,
    Error,
}

/// Bounded, time ordered candle series for one symbol and interval.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    pub symbol: Symbol,
    pub interval: KlineInterval,
    capacity: usize,
    candles: VecDeque<Candle>,
}

impl CandleSeries {
    pub fn new(symbol: Symbol, interval: KlineInterval) -> Self {
        Self::with_capacity(symbol, interval, CANDLE_CAPACITY)
    }

    pub fn with_capacity(symbol: Symbol, interval: KlineInterval, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            symbol,
            interval,
            capacity,
            candles: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Replace the series contents with a REST history load, keeping the newest candles.
    pub fn load<I>(&mut self, candles: I)
    where
        I: IntoIterator<Item = Candle>,
    {
        self.candles.clear();
        for candle in candles {
            self.apply(candle);
        }
    }

    /// Apply a kline update.
    ///
    /// Same open time as the last candle mutates it in place, a later open time appends and
    /// evicts the oldest beyond capacity, an earlier open time is ignored. Returns whether the
    /// series changed.
    pub fn apply(&mut self, candle: Candle) -> bool {
        match self.candles.back_mut() {
            Some(last) if last.open_time == candle.open_time => {
                *last = candle;
                true
            }
            Some(last) if last.open_time > candle.open_time => false,
            _ => {
                self.candles.push_back(candle);
                while self.candles.len() > self.capacity {
                    self.candles.pop_front();
                }
                true
            }
        }
    }

    pub fn candles(&self) -> Vec<Candle> {
        self.candles.iter().copied().collect()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open_ms: i64, close: f64) -> Candle {
        Candle {
            open_time: DateTime::from_timestamp_millis(open_ms).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
        }
    }

    #[test]
    fn test_kline_interval_from_str() {
        for interval in KlineInterval::ALL {
            assert_eq!(interval.as_str().parse::<KlineInterval>(), Ok(interval));
            assert_eq!(interval.to_string(), interval.as_str());
        }
        assert!("2m".parse::<KlineInterval>().is_err());
    }

    #[test]
    fn test_candle_series_apply() {
        struct TestCase {
            input: Candle,
            expected_changed: bool,
            expected_len: usize,
            expected_last_close: f64,
        }

        let mut series = CandleSeries::new(Symbol::new("BTCUSDT"), KlineInterval::M1);
        series.apply(candle(60_000, 1.0));

        let tests = vec![
            TestCase {
                // TC0: same open time mutates last candle in place
                input: candle(60_000, 2.0),
                expected_changed: true,
                expected_len: 1,
                expected_last_close: 2.0,
            },
            TestCase {
                // TC1: new open time appends
                input: candle(120_000, 3.0),
                expected_changed: true,
                expected_len: 2,
                expected_last_close: 3.0,
            },
            TestCase {
                // TC2: older open time is ignored
                input: candle(60_000, 9.0),
                expected_changed: false,
                expected_len: 2,
                expected_last_close: 3.0,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let changed = series.apply(test.input);
            assert_eq!(changed, test.expected_changed, "TC{} failed", index);
            assert_eq!(series.len(), test.expected_len, "TC{} failed", index);
            assert_eq!(
                series.last().unwrap().close,
                test.expected_last_close,
                "TC{} failed",
                index
            );
        }
    }

    #[test]
    fn test_candle_series_never_exceeds_capacity() {
        let mut series = CandleSeries::new(Symbol::new("ETHUSDT"), KlineInterval::M5);
        series.load((0..120).map(|minute| candle(minute * 60_000, minute as f64)));
        assert_eq!(series.len(), 120);

        for minute in 120..200 {
            series.apply(candle(minute * 60_000, minute as f64));
            assert!(series.len() <= CANDLE_CAPACITY);
        }

        assert_eq!(series.len(), CANDLE_CAPACITY);
        let candles = series.candles();
        assert_eq!(candles.first().unwrap().close, 60.0);
        assert_eq!(candles.last().unwrap().close, 199.0);
    }
}
