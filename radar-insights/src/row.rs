use crate::indicators::{slope, volatility};
use radar_data::{state::MarketState, symbol::Symbol, universe::Universe};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Per-symbol inputs of the signal scorers, derived from the reference ticker and history.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MarketRow {
    pub symbol: Symbol,
    pub last: f64,
    pub open: f64,
    /// 24h change, percent.
    pub change: f64,
    /// 24h high-low range relative to last, percent.
    pub range24: f64,
    pub quote_volume: f64,
    /// Volatility proxy over the rolling history, percent.
    pub vol: f64,
    /// First-to-last move over the rolling history, percent.
    pub slope: f64,
    pub history: Vec<f64>,
}

impl MarketRow {
    pub fn new(
        symbol: Symbol,
        last: f64,
        open: f64,
        high: f64,
        low: f64,
        quote_volume: f64,
        history: Vec<f64>,
    ) -> Self {
        let change = if open != 0.0 {
            (last - open) / open * 100.0
        } else {
            0.0
        };
        let range24 = if last != 0.0 {
            (high - low) / last * 100.0
        } else {
            0.0
        };

        Self {
            symbol,
            last,
            open,
            change,
            range24,
            quote_volume,
            vol: volatility(&history),
            slope: slope(&history),
            history,
        }
    }
}

/// Build one [`MarketRow`] per universe symbol that has a ticker with a finite last price,
/// ordered by quote volume descending.
pub fn market_rows(universe: &Universe, state: &MarketState) -> Vec<MarketRow> {
    let mut rows = universe
        .iter()
        .filter_map(|symbol| {
            let ticker = state.tickers.get(symbol.as_str())?;
            if !ticker.last.is_finite() {
                return None;
            }
            Some(MarketRow::new(
                symbol.clone(),
                ticker.last,
                ticker.open,
                ticker.high,
                ticker.low,
                ticker.quote_volume,
                state.history.read(symbol.as_str()),
            ))
        })
        .collect::<Vec<_>>();

    rows.sort_by(|a, b| {
        b.quote_volume
            .partial_cmp(&a.quote_volume)
            .unwrap_or(Ordering::Equal)
    });
    rows
}
