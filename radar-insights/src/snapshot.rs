use crate::{
    arbitrage::{Opportunity, score_arbitrage},
    row::{MarketRow, market_rows},
    signals::{Idea, leverage_ideas, prediction_ideas, spot_ideas},
};
use chrono::{DateTime, Utc};
use radar_data::{state::MarketState, universe::Universe};
use serde::{Deserialize, Serialize};

/// Output of one scoring pass over the shared stores.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct InsightSnapshot {
    pub computed_at: Option<DateTime<Utc>>,
    pub rows: Vec<MarketRow>,
    pub opportunities: Vec<Opportunity>,
    pub spot_ideas: Vec<Idea>,
    pub leverage_ideas: Vec<Idea>,
    pub prediction_longs: Vec<Idea>,
    pub prediction_shorts: Vec<Idea>,
}

impl InsightSnapshot {
    /// Score whatever is currently visible in `state` for the symbols of `universe`.
    pub fn compute(universe: &Universe, state: &MarketState, now: DateTime<Utc>) -> Self {
        let rows = market_rows(universe, state);
        let predictions = prediction_ideas(&rows);

        Self {
            computed_at: Some(now),
            opportunities: score_arbitrage(universe, &state.book),
            spot_ideas: spot_ideas(&rows),
            leverage_ideas: leverage_ideas(&rows),
            prediction_longs: predictions.longs,
            prediction_shorts: predictions.shorts,
            rows,
        }
    }

    pub fn idea_count(&self) -> usize {
        self.spot_ideas.len()
            + self.leverage_ideas.len()
            + self.prediction_longs.len()
            + self.prediction_shorts.len()
    }
}
