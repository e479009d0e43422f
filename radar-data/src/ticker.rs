use crate::symbol::Symbol;
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Reference exchange rolling 24h ticker for one [`Symbol`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Ticker {
    pub symbol: Symbol,
    pub last: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub quote_volume: f64,
    pub event_time: DateTime<Utc>,
}

impl Ticker {
    /// 24h percent change of `last` relative to `open`, 0 when `open` is 0.
    pub fn change_pct(&self) -> f64 {
        if self.open != 0.0 {
            (self.last - self.open) / self.open * 100.0
        } else {
            0.0
        }
    }

    /// 24h high/low range as a percentage of `last`, 0 when `last` is 0.
    pub fn range_pct(&self) -> f64 {
        if self.last != 0.0 {
            (self.high - self.low) / self.last * 100.0
        } else {
            0.0
        }
    }
}

/// Latest [`Ticker`] per [`Symbol`].
///
/// Records are replaced whole. An update older than the stored record is rejected.
#[derive(Debug, Default)]
pub struct TickerStore {
    tickers: RwLock<FnvHashMap<Symbol, Ticker>>,
}

impl TickerStore {
    /// Insert or replace the [`Ticker`] for its symbol, returning `false` if it was rejected
    /// for being older than the stored record.
    pub fn upsert(&self, ticker: Ticker) -> bool {
        let mut tickers = self.tickers.write();
        match tickers.get(&ticker.symbol) {
            Some(existing) if existing.event_time > ticker.event_time => false,
            _ => {
                tickers.insert(ticker.symbol.clone(), ticker);
                true
            }
        }
    }

    pub fn get(&self, symbol: &str) -> Option<Ticker> {
        self.tickers.read().get(symbol).cloned()
    }

    pub fn len(&self) -> usize {
        self.tickers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.read().is_empty()
    }
}
