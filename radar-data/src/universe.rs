use crate::{
    error::DataError,
    exchange::{ExchangeAdapter, MarketUpdate, binance::Binance},
    fetch_text,
    state::{MarketState, Origin},
    symbol::Symbol,
    ticker::Ticker,
};
use indexmap::IndexSet;
use itertools::Itertools;
use std::{cmp::Ordering, sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default number of tracked symbols.
pub const DEFAULT_UNIVERSE_SIZE: usize = 10;

/// Default interval between universe refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Fallback selection when the universe is empty.
pub const DEFAULT_SYMBOL: &str = "BTCUSDT";

/// Ordered set of tracked symbols, ranked by 24h quote volume (index 0 is the top rank).
///
/// Equality is order sensitive. Use [`Universe::same_members`] to ignore rank changes.
#[derive(Debug, Clone, Default)]
pub struct Universe(IndexSet<Symbol>);

impl PartialEq for Universe {
    fn eq(&self, other: &Self) -> bool {
        self.0.iter().eq(other.0.iter())
    }
}

impl Eq for Universe {}

impl Universe {
    pub fn new<I>(symbols: I) -> Self
    where
        I: IntoIterator<Item = Symbol>,
    {
        Self(symbols.into_iter().collect())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.0.contains(symbol)
    }

    pub fn top(&self) -> Option<&Symbol> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.0.iter()
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.0.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Determine if both universes track the same symbols, regardless of rank.
    pub fn same_members(&self, other: &Self) -> bool {
        self.len() == other.len() && self.0.iter().all(|symbol| other.0.contains(symbol))
    }

    /// Selection to use once this universe is active: `current` if tracked, else the top ranked
    /// symbol, else [`DEFAULT_SYMBOL`].
    pub fn reconcile_selection(&self, current: &Symbol) -> Symbol {
        if self.contains(current.as_str()) {
            return current.clone();
        }
        self.top()
            .cloned()
            .unwrap_or_else(|| Symbol::new(DEFAULT_SYMBOL))
    }
}

/// Result of one successful universe refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct UniverseRefresh {
    pub universe: Universe,
    /// Seed tickers of the admitted symbols, in rank order.
    pub seeds: Vec<Ticker>,
}

/// Rank a full market snapshot: keep tracked USDT pairs, sort by quote volume descending and
/// keep the top `size`.
///
/// Ties keep their snapshot order. Non-finite quote volumes rank last.
pub fn rank_universe(tickers: Vec<Ticker>, size: usize) -> UniverseRefresh {
    let seeds = tickers
        .into_iter()
        .filter(|ticker| ticker.symbol.is_tracked_pair())
        .sorted_by(|a, b| compare_quote_volume(b.quote_volume, a.quote_volume))
        .unique_by(|ticker| ticker.symbol.clone())
        .take(size)
        .collect::<Vec<_>>();

    UniverseRefresh {
        universe: Universe::new(seeds.iter().map(|ticker| ticker.symbol.clone())),
        seeds,
    }
}

fn compare_quote_volume(a: f64, b: f64) -> Ordering {
    match (a.is_finite(), b.is_finite()) {
        (true, true) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => Ordering::Equal,
    }
}

/// Periodically refreshes the [`Universe`] from the reference exchange's full market snapshot.
///
/// The tracker is the only writer of the universe. It also seeds the [`MarketState`] with the
/// admitted tickers so consumers have data before the first stream frame.
#[derive(Debug)]
pub struct UniverseTracker {
    binance: Binance,
    client: reqwest::Client,
    state: Arc<MarketState>,
    size: usize,
    interval: Duration,
    universe: watch::Sender<Universe>,
}

impl UniverseTracker {
    pub fn new(
        binance: Binance,
        client: reqwest::Client,
        state: Arc<MarketState>,
        size: usize,
        interval: Duration,
    ) -> Self {
        let (universe, _) = watch::channel(Universe::default());
        Self {
            binance,
            client,
            state,
            size,
            interval,
            universe,
        }
    }

    pub fn universe(&self) -> Universe {
        self.universe.borrow().clone()
    }

    /// Receiver notified only when the universe actually changes.
    pub fn subscribe(&self) -> watch::Receiver<Universe> {
        self.universe.subscribe()
    }

    /// Fetch, rank and publish once.
    ///
    /// On error the previous universe is left untouched.
    pub async fn refresh(&self) -> Result<UniverseRefresh, DataError> {
        let url = self.binance.market_snapshot_url()?;
        let body = fetch_text(&self.client, &url).await?;
        let tickers = self
            .binance
            .parse_snapshot(&body)?
            .into_iter()
            .filter_map(|update| match update {
                MarketUpdate::Ticker(ticker) => Some(ticker),
                MarketUpdate::Quote(_) => None,
            })
            .collect::<Vec<_>>();

        let refresh = rank_universe(tickers, self.size);
        self.apply(&refresh);
        Ok(refresh)
    }

    /// Seed the stores and publish the refreshed universe if it changed.
    pub fn apply(&self, refresh: &UniverseRefresh) {
        for seed in &refresh.seeds {
            self.state.apply(
                self.binance.id(),
                MarketUpdate::Ticker(seed.clone()),
                Origin::Snapshot,
            );
        }

        let changed = self.universe.send_if_modified(|universe| {
            if *universe == refresh.universe {
                false
            } else {
                *universe = refresh.universe.clone();
                true
            }
        });

        if changed {
            info!(
                symbols = %refresh.universe.iter().join(","),
                "universe updated"
            );
        }
    }

    /// Refresh once now and then on every interval until `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    result = self.refresh() => result,
                };

                match result {
                    Ok(refresh) => debug!(size = refresh.universe.len(), "universe refreshed"),
                    Err(error) if error.is_transient() => {
                        warn!(%error, "universe refresh failed, keeping previous universe")
                    }
                    Err(error) => {
                        error!(%error, "universe refresh rejected, keeping previous universe")
                    }
                }
            }

            debug!("universe tracker stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::FeedConfig, ticker::tests::ticker};

    fn with_volume(symbol: &str, quote_volume: f64) -> Ticker {
        Ticker {
            quote_volume,
            ..ticker(symbol, 100.0, 1_000)
        }
    }

    #[test]
    fn test_rank_universe() {
        let tickers = vec![
            with_volume("ETHUSDT", 500.0),
            with_volume("BTCUPUSDT", 10_000.0),
            with_volume("BTCUSDT", 900.0),
            with_volume("ETHBTC", 5_000.0),
            with_volume("SOLUSDT", 300.0),
            with_volume("ETHDOWNUSDT", 8_000.0),
            with_volume("NANUSDT", f64::NAN),
            with_volume("XRPUSDT", 400.0),
        ];

        let refresh = rank_universe(tickers, 3);

        assert_eq!(
            refresh.universe.symbols(),
            vec![
                Symbol::new("BTCUSDT"),
                Symbol::new("ETHUSDT"),
                Symbol::new("XRPUSDT")
            ]
        );
        assert_eq!(refresh.seeds.len(), 3);
        assert_eq!(refresh.seeds[0].quote_volume, 900.0);
    }

    #[test]
    fn test_rank_universe_fewer_than_size() {
        let refresh = rank_universe(vec![with_volume("BTCUSDT", 1.0)], 10);
        assert_eq!(refresh.universe.len(), 1);
        assert!(rank_universe(Vec::new(), 10).universe.is_empty());
    }

    #[test]
    fn test_universe_equality_is_rank_sensitive() {
        let a = Universe::new([Symbol::new("BTCUSDT"), Symbol::new("ETHUSDT")]);
        let b = Universe::new([Symbol::new("ETHUSDT"), Symbol::new("BTCUSDT")]);
        let c = Universe::new([Symbol::new("ETHUSDT"), Symbol::new("SOLUSDT")]);

        assert_ne!(a, b);
        assert!(a.same_members(&b));
        assert!(!a.same_members(&c));
    }

    #[test]
    fn test_reconcile_selection() {
        struct TestCase {
            universe: Universe,
            current: &'static str,
            expected: &'static str,
        }

        let ranked = Universe::new([Symbol::new("ETHUSDT"), Symbol::new("BTCUSDT")]);

        let tests = vec![
            TestCase {
                // TC0: selection still tracked
                universe: ranked.clone(),
                current: "BTCUSDT",
                expected: "BTCUSDT",
            },
            TestCase {
                // TC1: selection dropped, falls back to top rank
                universe: ranked,
                current: "DOGEUSDT",
                expected: "ETHUSDT",
            },
            TestCase {
                // TC2: empty universe falls back to default
                universe: Universe::default(),
                current: "DOGEUSDT",
                expected: DEFAULT_SYMBOL,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.universe.reconcile_selection(&Symbol::new(test.current));
            assert_eq!(actual, Symbol::new(test.expected), "TC{} failed", index);
        }
    }

    fn tracker(rest: &str) -> UniverseTracker {
        let mut config = FeedConfig::default();
        config.binance.rest = rest.to_string();
        UniverseTracker::new(
            Binance::new(&config),
            reqwest::Client::new(),
            Arc::new(MarketState::default()),
            DEFAULT_UNIVERSE_SIZE,
            DEFAULT_REFRESH_INTERVAL,
        )
    }

    #[test]
    fn test_tracker_apply_notifies_only_on_change() {
        let tracker = tracker(crate::config::BINANCE_REST);
        let mut receiver = tracker.subscribe();

        let refresh = rank_universe(vec![with_volume("BTCUSDT", 2.0), with_volume("ETHUSDT", 1.0)], 10);
        tracker.apply(&refresh);
        assert!(receiver.has_changed().unwrap());
        assert_eq!(receiver.borrow_and_update().len(), 2);

        tracker.apply(&refresh);
        assert!(!receiver.has_changed().unwrap());

        assert_eq!(tracker.state.tickers.len(), 2);
        assert_eq!(
            tracker.state.book.mid(&Symbol::new("BTCUSDT"), crate::exchange::ExchangeId::Binance),
            Some(100.0)
        );
        assert!(tracker.state.history.read("BTCUSDT").is_empty());
    }

    #[tokio::test]
    async fn test_tracker_refresh_failure_keeps_previous_universe() {
        let tracker = tracker("http://127.0.0.1:1");
        tracker.apply(&rank_universe(vec![with_volume("BTCUSDT", 1.0)], 10));

        assert!(tracker.refresh().await.is_err());
        assert_eq!(tracker.universe().symbols(), vec![Symbol::new("BTCUSDT")]);
    }
}
