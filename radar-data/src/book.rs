use crate::{exchange::ExchangeId, symbol::Symbol};
use fnv::FnvHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Latest top of book for one (symbol, exchange) pair.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ExchangePrice {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub mid: f64,
}

impl ExchangePrice {
    /// Derive an [`ExchangePrice`] from a quote.
    ///
    /// `mid` is the bid/ask average when both sides are usable, otherwise the last trade price.
    /// Returns `None` if neither yields a usable price.
    pub fn from_quote(bid: Option<f64>, ask: Option<f64>, last: Option<f64>) -> Option<Self> {
        let bid = bid.filter(|px| is_usable(*px));
        let ask = ask.filter(|px| is_usable(*px));

        let mid = match (bid, ask) {
            (Some(bid), Some(ask)) => (bid + ask) / 2.0,
            _ => last.filter(|px| is_usable(*px))?,
        };

        Some(Self { bid, ask, mid })
    }

    /// Ticker-derived price of the reference exchange, `mid == last`.
    pub fn from_last(last: f64) -> Option<Self> {
        is_usable(last).then_some(Self {
            bid: None,
            ask: None,
            mid: last,
        })
    }
}

fn is_usable(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Canonical (symbol, exchange) to [`ExchangePrice`] map. Last write wins per key.
#[derive(Debug, Default)]
pub struct PriceBook {
    prices: RwLock<FnvHashMap<(Symbol, ExchangeId), ExchangePrice>>,
}

impl PriceBook {
    pub fn upsert(&self, symbol: Symbol, exchange: ExchangeId, price: ExchangePrice) {
        self.prices.write().insert((symbol, exchange), price);
    }

    pub fn get(&self, symbol: &Symbol, exchange: ExchangeId) -> Option<ExchangePrice> {
        self.prices.read().get(&(symbol.clone(), exchange)).copied()
    }

    /// Mid price, absent if nothing was written for the pair yet.
    pub fn mid(&self, symbol: &Symbol, exchange: ExchangeId) -> Option<f64> {
        self.get(symbol, exchange).map(|price| price.mid)
    }

    /// Mids of every exchange for one symbol, in [`ExchangeId::ALL`] order, read under one lock.
    pub fn mids(&self, symbol: &Symbol) -> [Option<f64>; 3] {
        let prices = self.prices.read();
        ExchangeId::ALL.map(|exchange| {
            prices
                .get(&(symbol.clone(), exchange))
                .map(|price| price.mid)
        })
    }

    pub fn len(&self) -> usize {
        self.prices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.read().is_empty()
    }
}
