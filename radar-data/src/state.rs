use crate::{
    book::{ExchangePrice, PriceBook},
    exchange::{ExchangeId, MarketUpdate},
    history::HistoryStore,
    ticker::{Ticker, TickerStore},
};

/// Where a [`MarketUpdate`] came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Periodic REST snapshot (or universe seed). Not appended to history.
    Snapshot,
    /// Live stream frame.
    Stream,
}

/// Shared stores written by the feed managers and read by scorers.
///
/// Each store guards its own map, so a write to one never blocks readers of another.
#[derive(Debug, Default)]
pub struct MarketState {
    pub book: PriceBook,
    pub tickers: TickerStore,
    pub history: HistoryStore,
}

impl MarketState {
    /// Apply one update from `exchange`, returning whether anything was written.
    ///
    /// A [`Ticker`] is written whole, mirrored into the [`PriceBook`] as a last-price mid and,
    /// when streamed, appended to the symbol's history. A ticker older than the stored one is
    /// rejected entirely. A quote without any usable price is skipped.
    pub fn apply(&self, exchange: ExchangeId, update: MarketUpdate, origin: Origin) -> bool {
        match update {
            MarketUpdate::Ticker(ticker) => self.apply_ticker(exchange, ticker, origin),
            MarketUpdate::Quote(quote) => {
                match ExchangePrice::from_quote(quote.bid, quote.ask, quote.last) {
                    Some(price) => {
                        self.book.upsert(quote.symbol, exchange, price);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    fn apply_ticker(&self, exchange: ExchangeId, ticker: Ticker, origin: Origin) -> bool {
        if !ticker.last.is_finite() {
            return false;
        }

        let symbol = ticker.symbol.clone();
        let last = ticker.last;
        if !self.tickers.upsert(ticker) {
            return false;
        }

        if let Some(price) = ExchangePrice::from_last(last) {
            self.book.upsert(symbol.clone(), exchange, price);
        }

        if origin == Origin::Stream {
            self.history.append(&symbol, last);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{exchange::Quote, symbol::Symbol, ticker::tests::ticker};

    #[test]
    fn test_apply_stream_ticker_writes_all_stores() {
        let state = MarketState::default();
        let applied = state.apply(
            ExchangeId::Binance,
            MarketUpdate::Ticker(ticker("BTCUSDT", 101.0, 1_000)),
            Origin::Stream,
        );

        let symbol = Symbol::new("BTCUSDT");
        assert!(applied);
        assert_eq!(state.tickers.get("BTCUSDT").unwrap().last, 101.0);
        assert_eq!(state.book.mid(&symbol, ExchangeId::Binance), Some(101.0));
        assert_eq!(state.history.read("BTCUSDT"), vec![101.0]);
    }

    #[test]
    fn test_apply_snapshot_ticker_skips_history() {
        let state = MarketState::default();
        state.apply(
            ExchangeId::Binance,
            MarketUpdate::Ticker(ticker("ETHUSDT", 10.0, 1_000)),
            Origin::Snapshot,
        );

        assert!(state.tickers.get("ETHUSDT").is_some());
        assert!(state.history.read("ETHUSDT").is_empty());
    }

    #[test]
    fn test_apply_stale_ticker_is_rejected() {
        let state = MarketState::default();
        state.apply(
            ExchangeId::Binance,
            MarketUpdate::Ticker(ticker("BTCUSDT", 101.0, 2_000)),
            Origin::Stream,
        );
        let applied = state.apply(
            ExchangeId::Binance,
            MarketUpdate::Ticker(ticker("BTCUSDT", 99.0, 1_000)),
            Origin::Stream,
        );

        assert!(!applied);
        assert_eq!(state.tickers.get("BTCUSDT").unwrap().last, 101.0);
        assert_eq!(
            state.book.mid(&Symbol::new("BTCUSDT"), ExchangeId::Binance),
            Some(101.0)
        );
        assert_eq!(state.history.read("BTCUSDT"), vec![101.0]);
    }

    #[test]
    fn test_apply_quote() {
        struct TestCase {
            input: Quote,
            expected_applied: bool,
            expected_mid: Option<f64>,
        }

        let tests = vec![
            TestCase {
                // TC0: full top of book
                input: Quote {
                    symbol: Symbol::new("BTCUSDT"),
                    bid: Some(100.0),
                    ask: Some(100.4),
                    last: None,
                },
                expected_applied: true,
                expected_mid: Some(100.2),
            },
            TestCase {
                // TC1: last price only
                input: Quote {
                    symbol: Symbol::new("ETHUSDT"),
                    bid: None,
                    ask: None,
                    last: Some(10.0),
                },
                expected_applied: true,
                expected_mid: Some(10.0),
            },
            TestCase {
                // TC2: nothing usable
                input: Quote {
                    symbol: Symbol::new("SOLUSDT"),
                    bid: None,
                    ask: None,
                    last: None,
                },
                expected_applied: false,
                expected_mid: None,
            },
        ];

        let state = MarketState::default();
        for (index, test) in tests.into_iter().enumerate() {
            let symbol = test.input.symbol.clone();
            let applied = state.apply(
                ExchangeId::Bybit,
                MarketUpdate::Quote(test.input),
                Origin::Stream,
            );
            assert_eq!(applied, test.expected_applied, "TC{} failed", index);
            let mid = state.book.mid(&symbol, ExchangeId::Bybit);
            match (mid, test.expected_mid) {
                (Some(actual), Some(expected)) => {
                    assert!((actual - expected).abs() < 1e-9, "TC{} failed", index)
                }
                (actual, expected) => assert_eq!(actual, expected, "TC{} failed", index),
            }
        }

        assert!(state.history.read("BTCUSDT").is_empty());
    }
}
