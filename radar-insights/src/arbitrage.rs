use crate::indicators::clamp;
use radar_data::{book::PriceBook, exchange::ExchangeId, symbol::Symbol, universe::Universe};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Minimum gross edge, in percent, for a cross-exchange spread to be reported.
pub const MIN_ARBITRAGE_EDGE_PCT: f64 = 0.06;

/// Maximum number of [`Opportunity`]s reported per scoring pass.
pub const MAX_OPPORTUNITIES: usize = 10;

/// Buy on one exchange, sell on another. The edge ignores fees and transfer costs.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Opportunity {
    pub buy_exchange: ExchangeId,
    pub sell_exchange: ExchangeId,
    pub symbol: Symbol,
    pub edge_pct: f64,
    pub buy_mid: f64,
    pub sell_mid: f64,
    /// `clamp(edge / 1.2, 0.35, 0.9)`.
    pub confidence: f64,
}

/// Gross edge of buying at `buy_mid` and selling at `sell_mid`, in percent.
pub fn edge_pct(buy_mid: f64, sell_mid: f64) -> f64 {
    (sell_mid - buy_mid) / buy_mid * 100.0
}

/// Confidence attached to an [`Opportunity`] with the given gross edge.
pub fn arbitrage_confidence(edge_pct: f64) -> f64 {
    clamp(edge_pct / 1.2, 0.35, 0.9)
}

/// Score every ordered exchange pair of every universe symbol.
///
/// Pairs with a missing mid on either side are skipped. Ties keep universe order, then
/// [`ExchangeId::ALL`] order.
pub fn score_arbitrage(universe: &Universe, book: &PriceBook) -> Vec<Opportunity> {
    let mut opportunities = Vec::new();

    for symbol in universe.iter() {
        let mids = book.mids(symbol);
        for (buy_index, buy_exchange) in ExchangeId::ALL.iter().enumerate() {
            for (sell_index, sell_exchange) in ExchangeId::ALL.iter().enumerate() {
                if buy_index == sell_index {
                    continue;
                }
                let (Some(buy_mid), Some(sell_mid)) = (mids[buy_index], mids[sell_index]) else {
                    continue;
                };

                let edge = edge_pct(buy_mid, sell_mid);
                if edge > MIN_ARBITRAGE_EDGE_PCT {
                    opportunities.push(Opportunity {
                        buy_exchange: *buy_exchange,
                        sell_exchange: *sell_exchange,
                        symbol: symbol.clone(),
                        edge_pct: edge,
                        buy_mid,
                        sell_mid,
                        confidence: arbitrage_confidence(edge),
                    });
                }
            }
        }
    }

    // Vec::sort_by is stable
    opportunities.sort_by(|a, b| b.edge_pct.partial_cmp(&a.edge_pct).unwrap_or(Ordering::Equal));
    opportunities.truncate(MAX_OPPORTUNITIES);
    opportunities
}
