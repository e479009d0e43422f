use crate::{
    indicators::{RSI_PERIOD, clamp, ema, rsi, sigmoid},
    row::MarketRow,
};
use derive_more::Display;
use itertools::Itertools;
use radar_data::symbol::Symbol;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Maximum number of spot or leverage ideas per scoring pass.
pub const MAX_IDEAS: usize = 8;

/// Maximum number of leverage ideas per direction.
pub const MAX_LEVERAGE_PER_SIDE: usize = 4;

/// Maximum number of prediction ideas per direction.
pub const MAX_PREDICTIONS: usize = 6;

/// Prediction requires strictly more history samples than this.
pub const MIN_PREDICTION_HISTORY: usize = 20;

/// EMA inputs use at most this many trailing history samples.
pub const PREDICTION_EMA_WINDOW: usize = 30;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, Deserialize, Serialize)]
pub enum IdeaCategory {
    #[display("SPOT")]
    Spot,
    #[display("LEV")]
    Leverage,
    #[display("PRED")]
    Prediction,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, Deserialize, Serialize)]
pub enum Direction {
    #[display("LONG")]
    Long,
    #[display("SHORT")]
    Short,
}

/// Rule that produced an [`Idea`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum IdeaKind {
    SpotMomentum,
    SpotMeanReversion,
    LeverageLong,
    LeverageShort,
    PredictionLong,
    PredictionShort,
}

impl IdeaKind {
    pub fn category(&self) -> IdeaCategory {
        match self {
            IdeaKind::SpotMomentum | IdeaKind::SpotMeanReversion => IdeaCategory::Spot,
            IdeaKind::LeverageLong | IdeaKind::LeverageShort => IdeaCategory::Leverage,
            IdeaKind::PredictionLong | IdeaKind::PredictionShort => IdeaCategory::Prediction,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            IdeaKind::SpotMomentum
            | IdeaKind::SpotMeanReversion
            | IdeaKind::LeverageLong
            | IdeaKind::PredictionLong => Direction::Long,
            IdeaKind::LeverageShort | IdeaKind::PredictionShort => Direction::Short,
        }
    }

    /// Short label, eg/ `SPOT MOM`.
    pub fn badge(&self) -> &'static str {
        match self {
            IdeaKind::SpotMomentum => "SPOT MOM",
            IdeaKind::SpotMeanReversion => "SPOT MRV",
            IdeaKind::LeverageLong => "LEV LONG",
            IdeaKind::LeverageShort => "LEV SHORT",
            IdeaKind::PredictionLong => "PRED LONG",
            IdeaKind::PredictionShort => "PRED SHORT",
        }
    }
}

/// Suggested leverage band, tighter as volatility rises.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, Deserialize, Serialize)]
pub enum LeverageTier {
    #[display("2–3x")]
    TwoToThree,
    #[display("3–5x")]
    ThreeToFive,
    #[display("5–7x")]
    FiveToSeven,
    #[display("5–8x")]
    FiveToEight,
}

impl LeverageTier {
    pub fn for_volatility(vol: f64, direction: Direction) -> Self {
        if vol > 0.6 {
            LeverageTier::TwoToThree
        } else if vol > 0.35 {
            LeverageTier::ThreeToFive
        } else {
            match direction {
                Direction::Long => LeverageTier::FiveToEight,
                Direction::Short => LeverageTier::FiveToSeven,
            }
        }
    }
}

/// Explanatory values behind an [`Idea`]. Prediction-only fields are `None` elsewhere.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct IdeaMetrics {
    pub change: f64,
    pub slope: f64,
    pub range24: f64,
    pub vol: f64,
    pub entry: f64,
    pub leverage_tier: Option<LeverageTier>,
    pub prob_up: Option<f64>,
    pub rsi: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
}

/// Gross-edge trade idea. Recomputed on every scoring pass.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Idea {
    pub kind: IdeaKind,
    pub category: IdeaCategory,
    pub symbol: Symbol,
    pub direction: Direction,
    pub edge_pct: f64,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub metrics: IdeaMetrics,
}

impl Idea {
    fn new(kind: IdeaKind, row: &MarketRow, edge_pct: f64, confidence: f64) -> Self {
        Self {
            kind,
            category: kind.category(),
            symbol: row.symbol.clone(),
            direction: kind.direction(),
            edge_pct,
            confidence: clamp(confidence, 0.0, 1.0),
            metrics: IdeaMetrics {
                change: row.change,
                slope: row.slope,
                range24: row.range24,
                vol: row.vol,
                entry: row.last,
                ..IdeaMetrics::default()
            },
        }
    }

    pub fn badge(&self) -> &'static str {
        self.kind.badge()
    }

    pub fn title(&self) -> String {
        let symbol = &self.symbol;
        match self.kind {
            IdeaKind::SpotMomentum => format!("{symbol} breakout continuation"),
            IdeaKind::SpotMeanReversion => format!("{symbol} dip-buy mean reversion"),
            IdeaKind::LeverageLong => format!("{symbol} momentum leverage long"),
            IdeaKind::LeverageShort => format!("{symbol} trend leverage short"),
            IdeaKind::PredictionLong => format!("{symbol} · next 5–10m up-bias"),
            IdeaKind::PredictionShort => format!("{symbol} · next 5–10m down-bias"),
        }
    }

    /// One line summary of the metrics.
    pub fn meta(&self) -> String {
        let m = &self.metrics;
        let tier = m
            .leverage_tier
            .map(|tier| tier.to_string())
            .unwrap_or_default();
        let prob_up = m.prob_up.unwrap_or(0.5);
        let rsi = m.rsi.unwrap_or(50.0);
        let fast = m.ema_fast.unwrap_or_default();
        let slow = m.ema_slow.unwrap_or_default();

        match self.kind {
            IdeaKind::SpotMomentum | IdeaKind::SpotMeanReversion => format!(
                "24h {:+.2}% · microtrend {:+.2}% · range {:.2}%",
                m.change, m.slope, m.range24
            ),
            IdeaKind::LeverageLong | IdeaKind::LeverageShort => format!(
                "micro vol {:.2}% · slope {:+.2}% · 24h {:+.2}% · suggested {tier}",
                m.vol, m.slope, m.change
            ),
            IdeaKind::PredictionLong => format!(
                "P(up) {:.0}% · EMA9>EMA21 {} · RSI {rsi:.0} · micro vol {:.2}%",
                prob_up * 100.0,
                yes_no(fast > slow),
                m.vol
            ),
            IdeaKind::PredictionShort => format!(
                "P(down) {:.0}% · EMA9<EMA21 {} · RSI {rsi:.0} · micro vol {:.2}%",
                (1.0 - prob_up) * 100.0,
                yes_no(fast < slow),
                m.vol
            ),
        }
    }

    pub fn note(&self) -> String {
        match self.kind {
            IdeaKind::SpotMomentum => {
                "Estimate uses 24h range proxy; not fee/slippage adjusted.".to_string()
            }
            IdeaKind::SpotMeanReversion => "Watch liquidity + spread during rebounds.".to_string(),
            IdeaKind::LeverageLong => {
                "Gross edge estimate from recent micro-vol. Use tight stops.".to_string()
            }
            IdeaKind::LeverageShort => {
                "Estimate ignores funding/spread. Confirm basis before sizing.".to_string()
            }
            IdeaKind::PredictionLong | IdeaKind::PredictionShort => format!(
                "Entry near {} · horizon ~5–10m.",
                format_price(self.metrics.entry)
            ),
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Format a price with precision scaled to its magnitude, trimming trailing zeros.
pub fn format_price(price: f64) -> String {
    if !price.is_finite() {
        return "—".to_string();
    }
    let decimals = if price >= 1000.0 {
        2
    } else if price >= 1.0 {
        4
    } else {
        8
    };
    let formatted = format!("{price:.decimals$}");
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Stable descending sort by `edge_pct`, truncated to `max`.
fn top_by_edge(ideas: impl IntoIterator<Item = Idea>, max: usize) -> Vec<Idea> {
    ideas
        .into_iter()
        .sorted_by(|a, b| descending(a.edge_pct, b.edge_pct))
        .take(max)
        .collect()
}

/// Spot momentum continuations and mean-reversion dip buys, best edge first.
pub fn spot_ideas(rows: &[MarketRow]) -> Vec<Idea> {
    let momentum = rows
        .iter()
        .filter(|r| r.slope > 0.6 && r.change > 1.2)
        .sorted_by(|a, b| descending(a.slope + a.change, b.slope + b.change))
        .take(MAX_IDEAS.div_ceil(2))
        .map(|r| {
            Idea::new(
                IdeaKind::SpotMomentum,
                r,
                clamp(r.range24 * 0.35, 0.6, 8.0),
                clamp((r.slope + r.change) / 15.0, 0.35, 0.85),
            )
        });

    let mean_reversion = rows
        .iter()
        .filter(|r| r.change < -2.0 && r.slope > 0.1)
        .sorted_by(|a, b| descending(a.slope - a.change, b.slope - b.change))
        .take(MAX_IDEAS / 2)
        .map(|r| {
            Idea::new(
                IdeaKind::SpotMeanReversion,
                r,
                clamp(r.range24 * 0.3, 0.5, 6.0),
                clamp((r.slope - r.change) / 18.0, 0.3, 0.8),
            )
        });

    top_by_edge(momentum.chain(mean_reversion), MAX_IDEAS)
}

/// Volatile trend followers with a suggested [`LeverageTier`], best edge first.
pub fn leverage_ideas(rows: &[MarketRow]) -> Vec<Idea> {
    let longs = rows
        .iter()
        .filter(|r| r.vol > 0.18 && r.slope > 0.7 && r.change > 0.8)
        .sorted_by(|a, b| descending(a.vol + a.slope, b.vol + b.slope))
        .take(MAX_LEVERAGE_PER_SIDE)
        .map(|r| {
            let mut idea = Idea::new(
                IdeaKind::LeverageLong,
                r,
                clamp(r.vol * 2.4, 0.8, 10.0),
                clamp((r.vol + r.slope) / 3.5, 0.35, 0.8),
            );
            idea.metrics.leverage_tier = Some(LeverageTier::for_volatility(r.vol, Direction::Long));
            idea
        });

    let shorts = rows
        .iter()
        .filter(|r| r.vol > 0.18 && r.slope < -0.6 && r.change < -0.8)
        .sorted_by(|a, b| descending(a.vol + a.slope.abs(), b.vol + b.slope.abs()))
        .take(MAX_LEVERAGE_PER_SIDE)
        .map(|r| {
            let mut idea = Idea::new(
                IdeaKind::LeverageShort,
                r,
                clamp(r.vol * 2.1, 0.8, 9.0),
                clamp((r.vol + r.slope.abs()) / 3.6, 0.35, 0.78),
            );
            idea.metrics.leverage_tier =
                Some(LeverageTier::for_volatility(r.vol, Direction::Short));
            idea
        });

    top_by_edge(longs.chain(shorts), MAX_IDEAS)
}

/// Short horizon directional estimate for one [`MarketRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub prob_up: f64,
    pub expected_move: f64,
    pub rsi: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
}

/// Composite of EMA cross, RSI, slope and volatility. `None` without enough history.
pub fn predict(row: &MarketRow) -> Option<Prediction> {
    let history = &row.history;
    if history.len() <= MIN_PREDICTION_HISTORY {
        return None;
    }

    let last = history.last().copied().filter(|last| *last != 0.0).unwrap_or(1.0);
    let recent = &history[history.len().saturating_sub(PREDICTION_EMA_WINDOW)..];
    let ema_fast = ema(recent, 9);
    let ema_slow = ema(recent, 21);
    let cross = (ema_fast - ema_slow) / last;

    let rsi = rsi(history, RSI_PERIOD);
    let rsi_signal = (rsi - 50.0) / 50.0;
    let nslope = clamp(row.slope / 2.5, -2.0, 2.0);
    let nvol = clamp(row.vol / 1.2, 0.0, 2.0);

    let score = 0.8 * nslope + 0.6 * cross + 0.35 * rsi_signal - 0.25 * nvol;

    Some(Prediction {
        prob_up: sigmoid(score),
        expected_move: clamp(row.vol * 1.8 + row.slope.abs() * 0.6, 0.4, 6.0),
        rsi,
        ema_fast,
        ema_slow,
    })
}

/// Prediction ideas split by direction.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Predictions {
    pub longs: Vec<Idea>,
    pub shorts: Vec<Idea>,
}

pub fn prediction_ideas(rows: &[MarketRow]) -> Predictions {
    let scored = rows
        .iter()
        .filter_map(|row| predict(row).map(|prediction| (row, prediction)))
        .collect::<Vec<_>>();

    let longs = scored
        .iter()
        .filter(|(_, p)| p.prob_up > 0.6)
        .sorted_by(|(_, a), (_, b)| {
            descending(a.expected_move * a.prob_up, b.expected_move * b.prob_up)
        })
        .take(MAX_PREDICTIONS)
        .map(|(row, p)| prediction_idea(IdeaKind::PredictionLong, row, p, clamp(p.prob_up, 0.55, 0.9)))
        .collect();

    let shorts = scored
        .iter()
        .filter(|(_, p)| p.prob_up < 0.4)
        .sorted_by(|(_, a), (_, b)| {
            descending(
                a.expected_move * (1.0 - a.prob_up),
                b.expected_move * (1.0 - b.prob_up),
            )
        })
        .take(MAX_PREDICTIONS)
        .map(|(row, p)| {
            prediction_idea(IdeaKind::PredictionShort, row, p, clamp(1.0 - p.prob_up, 0.55, 0.9))
        })
        .collect();

    Predictions { longs, shorts }
}

fn prediction_idea(
    kind: IdeaKind,
    row: &MarketRow,
    prediction: &Prediction,
    confidence: f64,
) -> Idea {
    let mut idea = Idea::new(kind, row, prediction.expected_move, confidence);
    idea.metrics.prob_up = Some(prediction.prob_up);
    idea.metrics.rsi = Some(prediction.rsi);
    idea.metrics.ema_fast = Some(prediction.ema_fast);
    idea.metrics.ema_slow = Some(prediction.ema_slow);
    idea
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::tests::row;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn with_history(symbol: &str, history: Vec<f64>) -> MarketRow {
        let last = history.last().copied().unwrap_or(100.0);
        MarketRow::new(Symbol::new(symbol), last, last, last, last, 1.0, history)
    }

    #[test]
    fn test_spot_ideas_rules() {
        struct TestCase {
            row: MarketRow,
            expected: Option<(IdeaKind, f64, f64)>,
        }

        let tests = vec![
            TestCase {
                // TC0: momentum, edge from range, confidence (0.8+1.5)/15 floored to 0.35
                row: row("AUSDT", 1.5, 10.0, 0.0, 0.8),
                expected: Some((IdeaKind::SpotMomentum, 3.5, 0.35)),
            },
            TestCase {
                // TC1: momentum, edge capped at 8 and confidence capped at 0.85
                row: row("BUSDT", 12.0, 40.0, 0.0, 2.0),
                expected: Some((IdeaKind::SpotMomentum, 8.0, 0.85)),
            },
            TestCase {
                // TC2: mean reversion, (0.5+4)/18 = 0.25 floored to 0.3, edge floored to 0.5
                row: row("CUSDT", -4.0, 1.0, 0.0, 0.5),
                expected: Some((IdeaKind::SpotMeanReversion, 0.5, 0.3)),
            },
            TestCase {
                // TC3: momentum needs slope > 0.6
                row: row("DUSDT", 5.0, 10.0, 0.0, 0.6),
                expected: None,
            },
            TestCase {
                // TC4: dip without positive slope
                row: row("EUSDT", -5.0, 10.0, 0.0, 0.0),
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = spot_ideas(std::slice::from_ref(&test.row))
                .into_iter()
                .next()
                .map(|idea| (idea.kind, idea.edge_pct, idea.confidence));

            match (actual, test.expected) {
                (Some((kind, edge, confidence)), Some((e_kind, e_edge, e_confidence))) => {
                    assert_eq!(kind, e_kind, "TC{} failed", index);
                    assert!(approx(edge, e_edge), "TC{} failed: edge {}", index, edge);
                    assert!(
                        approx(confidence, e_confidence),
                        "TC{} failed: confidence {}",
                        index,
                        confidence
                    );
                }
                (actual, expected) => assert_eq!(
                    actual.map(|a| a.0),
                    expected.map(|e| e.0),
                    "TC{} failed",
                    index
                ),
            }
        }
    }

    #[test]
    fn test_spot_ideas_caps_each_rule_and_sorts_by_edge() {
        let mut rows = (0..6)
            .map(|i| row(&format!("M{i}USDT"), 2.0 + f64::from(i), 2.0 + f64::from(i), 0.0, 1.0))
            .collect::<Vec<_>>();
        rows.extend((0..6).map(|i| {
            row(&format!("R{i}USDT"), -3.0 - f64::from(i), 20.0, 0.0, 0.5)
        }));

        let ideas = spot_ideas(&rows);
        assert_eq!(ideas.len(), MAX_IDEAS);

        let momentum = ideas
            .iter()
            .filter(|idea| idea.kind == IdeaKind::SpotMomentum)
            .count();
        assert_eq!(momentum, 4);
        assert!(ideas.windows(2).all(|pair| pair[0].edge_pct >= pair[1].edge_pct));

        // Highest ranked momentum rows survive: M5, M4, M3, M2
        assert!(ideas.iter().any(|idea| idea.symbol == Symbol::new("M5USDT")));
        assert!(!ideas.iter().any(|idea| idea.symbol == Symbol::new("M0USDT")));
    }

    #[test]
    fn test_leverage_ideas_tiers() {
        struct TestCase {
            row: MarketRow,
            expected_kind: IdeaKind,
            expected_tier: LeverageTier,
            expected_edge: f64,
        }

        let tests = vec![
            TestCase {
                // TC0: calm long
                row: row("AUSDT", 1.0, 5.0, 0.2, 0.8),
                expected_kind: IdeaKind::LeverageLong,
                expected_tier: LeverageTier::FiveToEight,
                expected_edge: 0.8,
            },
            TestCase {
                // TC1: mid vol long
                row: row("BUSDT", 1.0, 5.0, 0.5, 0.8),
                expected_kind: IdeaKind::LeverageLong,
                expected_tier: LeverageTier::ThreeToFive,
                expected_edge: 1.2,
            },
            TestCase {
                // TC2: high vol short
                row: row("CUSDT", -1.0, 5.0, 0.7, -0.7),
                expected_kind: IdeaKind::LeverageShort,
                expected_tier: LeverageTier::TwoToThree,
                expected_edge: 1.47,
            },
            TestCase {
                // TC3: calm short uses the narrower band
                row: row("DUSDT", -1.0, 5.0, 0.2, -0.7),
                expected_kind: IdeaKind::LeverageShort,
                expected_tier: LeverageTier::FiveToSeven,
                expected_edge: 0.8,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let ideas = leverage_ideas(std::slice::from_ref(&test.row));
            assert_eq!(ideas.len(), 1, "TC{} failed", index);
            let idea = &ideas[0];
            assert_eq!(idea.kind, test.expected_kind, "TC{} failed", index);
            assert_eq!(idea.category, IdeaCategory::Leverage, "TC{} failed", index);
            assert_eq!(
                idea.metrics.leverage_tier,
                Some(test.expected_tier),
                "TC{} failed",
                index
            );
            assert!(approx(idea.edge_pct, test.expected_edge), "TC{} failed", index);
            assert!((0.35..=0.8).contains(&idea.confidence), "TC{} failed", index);
        }

        // Low volatility never qualifies
        assert!(leverage_ideas(&[row("EUSDT", 5.0, 5.0, 0.18, 3.0)]).is_empty());
    }

    #[test]
    fn test_leverage_ideas_top_four_per_side() {
        let rows = (0..6)
            .map(|i| row(&format!("L{i}USDT"), 1.0, 5.0, 0.2 + f64::from(i) * 0.1, 1.0))
            .chain((0..6).map(|i| row(&format!("S{i}USDT"), -1.0, 5.0, 0.3, -1.0)))
            .collect::<Vec<_>>();

        let ideas = leverage_ideas(&rows);
        assert_eq!(ideas.len(), MAX_IDEAS);
        assert_eq!(
            ideas
                .iter()
                .filter(|idea| idea.direction == Direction::Short)
                .count(),
            MAX_LEVERAGE_PER_SIDE
        );
    }

    #[test]
    fn test_predict_requires_history() {
        assert!(predict(&with_history("AUSDT", vec![100.0; 20])).is_none());
        assert!(predict(&with_history("AUSDT", vec![100.0; 21])).is_some());
    }

    #[test]
    fn test_predict_flat_history_is_neutral_up() {
        // Flat: slope 0, vol 0, cross 0, rsi 100 -> score 0.35
        let prediction = predict(&with_history("AUSDT", vec![100.0; 30])).unwrap();
        assert!(approx(prediction.rsi, 100.0));
        assert!(approx(prediction.prob_up, sigmoid(0.35)));
        assert!(approx(prediction.expected_move, 0.4));
    }

    #[test]
    fn test_prediction_ideas_split_by_direction() {
        let rising = (0..40).map(|i| 100.0 + f64::from(i) * 0.2).collect::<Vec<_>>();
        let falling = (0..40).map(|i| 100.0 - f64::from(i) * 0.2).collect::<Vec<_>>();
        let rows = vec![
            with_history("UPUSDT", rising),
            with_history("DNUSDT", falling),
            with_history("SHORTUSDT", vec![100.0; 10]),
        ];

        let predictions = prediction_ideas(&rows);

        assert_eq!(predictions.longs.len(), 1);
        assert_eq!(predictions.shorts.len(), 1);

        let long = &predictions.longs[0];
        assert_eq!(long.symbol, Symbol::new("UPUSDT"));
        assert_eq!(long.kind, IdeaKind::PredictionLong);
        assert!((0.55..=0.9).contains(&long.confidence));
        assert!(long.metrics.prob_up.unwrap() > 0.6);
        assert!(long.metrics.ema_fast.unwrap() > long.metrics.ema_slow.unwrap());

        let short = &predictions.shorts[0];
        assert_eq!(short.symbol, Symbol::new("DNUSDT"));
        assert_eq!(short.direction, Direction::Short);
        assert!(short.metrics.prob_up.unwrap() < 0.4);
        assert!(approx(short.confidence, clamp(1.0 - short.metrics.prob_up.unwrap(), 0.55, 0.9)));
    }

    #[test]
    fn test_idea_text() {
        let idea = Idea::new(
            IdeaKind::SpotMomentum,
            &row("BTCUSDT", 1.5, 10.0, 0.0, 0.8),
            3.5,
            0.5,
        );
        assert_eq!(idea.badge(), "SPOT MOM");
        assert_eq!(idea.title(), "BTCUSDT breakout continuation");
        assert_eq!(idea.meta(), "24h +1.50% · microtrend +0.80% · range 10.00%");

        let mut idea = Idea::new(
            IdeaKind::PredictionShort,
            &row("ETHUSDT", -1.0, 1.0, 0.5, -1.0),
            1.0,
            0.7,
        );
        idea.metrics.entry = 2345.5;
        assert_eq!(idea.title(), "ETHUSDT · next 5–10m down-bias");
        assert_eq!(idea.note(), "Entry near 2345.5 · horizon ~5–10m.");
    }

    #[test]
    fn test_format_price() {
        struct TestCase {
            input: f64,
            expected: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: large price, 2 decimals
                input: 64250.129,
                expected: "64250.13",
            },
            TestCase {
                // TC1: mid price, 4 decimals trimmed
                input: 1.5,
                expected: "1.5",
            },
            TestCase {
                // TC2: sub-unit price, 8 decimals
                input: 0.000012345678,
                expected: "0.00001235",
            },
            TestCase {
                // TC3: integer
                input: 2000.0,
                expected: "2000",
            },
            TestCase {
                // TC4: non-finite
                input: f64::NAN,
                expected: "—",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(format_price(test.input), test.expected, "TC{} failed", index);
        }
    }
}
