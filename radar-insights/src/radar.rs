use crate::{
    arbitrage::Opportunity, config::RadarConfig, signals::Idea, snapshot::InsightSnapshot,
};
use chrono::Utc;
use radar_data::{
    candle::{
        Candle, ChartStatus, KlineInterval,
        feed::{CandleStore, KlineFeed},
    },
    error::DataError,
    exchange::{ExchangeId, binance::Binance, bybit::Bybit, okx::Okx},
    feed::{FeedHandle, FeedManager, connection::FeedStatus},
    http_client,
    state::MarketState,
    symbol::Symbol,
    ticker::Ticker,
    universe::{Universe, UniverseTracker},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Symbol and timeframe followed by the candle feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Selection {
    pub symbol: Symbol,
    pub interval: KlineInterval,
}

/// State shared between the [`Radar`] handle and its background tasks.
#[derive(Debug)]
struct Shared {
    state: Arc<MarketState>,
    tracker: Arc<UniverseTracker>,
    candles: Arc<CandleStore>,
    insights: watch::Sender<Arc<InsightSnapshot>>,
    selection: watch::Sender<Selection>,
}

impl Shared {
    fn score(&self) -> Arc<InsightSnapshot> {
        let universe = self.tracker.universe();
        let snapshot = Arc::new(InsightSnapshot::compute(&universe, &self.state, Utc::now()));
        self.insights.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    /// Move the selection into `universe`, returning whether it changed.
    fn reconcile_selection(&self, universe: &Universe) -> bool {
        self.selection.send_if_modified(|selection| {
            let symbol = universe.reconcile_selection(&selection.symbol);
            if symbol == selection.symbol {
                return false;
            }
            info!(from = %selection.symbol, to = %symbol, "selection left the universe");
            selection.symbol = symbol;
            true
        })
    }
}

/// One [`FeedManager`] per exchange.
#[derive(Debug)]
struct Feeds {
    binance: FeedManager<Binance>,
    bybit: FeedManager<Bybit>,
    okx: FeedManager<Okx>,
}

impl Feeds {
    fn start(&self, symbols: Vec<Symbol>, cancel: &CancellationToken) -> Vec<FeedHandle> {
        vec![
            self.binance.start(symbols.clone(), cancel),
            self.bybit.start(symbols.clone(), cancel),
            self.okx.start(symbols, cancel),
        ]
    }

    fn subscribe_status(&self) -> Vec<watch::Receiver<FeedStatus>> {
        vec![
            self.binance.subscribe_status(),
            self.bybit.subscribe_status(),
            self.okx.subscribe_status(),
        ]
    }
}

/// Running ingestion and scoring pipeline.
///
/// Spawns the universe tracker, a feed supervisor that restarts every exchange feed when the
/// universe membership changes, a candle supervisor following the [`Selection`] and a scorer
/// publishing an [`InsightSnapshot`] on a fixed cadence.
#[derive(Debug)]
pub struct Radar {
    shared: Arc<Shared>,
    feed_status: Vec<watch::Receiver<FeedStatus>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Radar {
    /// Start the pipeline. Must be called from within a tokio runtime.
    pub fn start(config: RadarConfig) -> Result<Self, DataError> {
        let client = http_client(config.feed.request_timeout)?;
        let state = Arc::new(MarketState::default());
        let cancel = CancellationToken::new();

        let tracker = Arc::new(UniverseTracker::new(
            Binance::new(&config.feed),
            client.clone(),
            Arc::clone(&state),
            config.universe_size,
            config.universe_refresh_interval,
        ));

        let feeds = Feeds {
            binance: FeedManager::new(
                Binance::new(&config.feed),
                Arc::clone(&state),
                client.clone(),
                config.feed.clone(),
            ),
            bybit: FeedManager::new(
                Bybit::new(&config.feed),
                Arc::clone(&state),
                client.clone(),
                config.feed.clone(),
            ),
            okx: FeedManager::new(
                Okx::new(&config.feed),
                Arc::clone(&state),
                client.clone(),
                config.feed.clone(),
            ),
        };
        let feed_status = feeds.subscribe_status();

        let selection = Selection {
            symbol: config.symbol.clone(),
            interval: config.interval,
        };
        let candles = Arc::new(CandleStore::new(selection.symbol.clone(), selection.interval));
        let kline_feed = KlineFeed::new(&config.feed, client, Arc::clone(&candles));

        let (insights, _) = watch::channel(Arc::new(InsightSnapshot::default()));
        let (selection, _) = watch::channel(selection);

        let shared = Arc::new(Shared {
            state,
            tracker: Arc::clone(&tracker),
            candles,
            insights,
            selection,
        });

        let tasks = vec![
            Arc::clone(&tracker).spawn(cancel.child_token()),
            tokio::spawn(supervise_feeds(
                Arc::clone(&shared),
                feeds,
                cancel.child_token(),
            )),
            tokio::spawn(supervise_candles(
                Arc::clone(&shared),
                kline_feed,
                cancel.child_token(),
            )),
            tokio::spawn(run_scorer(
                Arc::clone(&shared),
                config.score_interval,
                cancel.child_token(),
            )),
        ];

        info!(
            universe_size = config.universe_size,
            symbol = %config.symbol,
            interval = %config.interval,
            "radar started"
        );

        Ok(Self {
            shared,
            feed_status,
            cancel,
            tasks,
        })
    }

    pub fn universe(&self) -> Universe {
        self.shared.tracker.universe()
    }

    /// Receiver notified whenever the universe changes.
    pub fn subscribe_universe(&self) -> watch::Receiver<Universe> {
        self.shared.tracker.subscribe()
    }

    pub fn ticker(&self, symbol: &str) -> Option<Ticker> {
        self.shared.state.tickers.get(symbol)
    }

    pub fn history(&self, symbol: &str) -> Vec<f64> {
        self.shared.state.history.read(symbol)
    }

    /// Latest [`InsightSnapshot`], empty until the first scoring pass.
    pub fn insights(&self) -> Arc<InsightSnapshot> {
        self.shared.insights.borrow().clone()
    }

    /// Receiver notified after every scoring pass.
    pub fn subscribe_insights(&self) -> watch::Receiver<Arc<InsightSnapshot>> {
        self.shared.insights.subscribe()
    }

    pub fn opportunities(&self) -> Vec<Opportunity> {
        self.insights().opportunities.clone()
    }

    pub fn spot_ideas(&self) -> Vec<Idea> {
        self.insights().spot_ideas.clone()
    }

    pub fn leverage_ideas(&self) -> Vec<Idea> {
        self.insights().leverage_ideas.clone()
    }

    pub fn prediction_longs(&self) -> Vec<Idea> {
        self.insights().prediction_longs.clone()
    }

    pub fn prediction_shorts(&self) -> Vec<Idea> {
        self.insights().prediction_shorts.clone()
    }

    pub fn candles(&self) -> Vec<Candle> {
        self.shared.candles.candles()
    }

    pub fn chart_status(&self) -> ChartStatus {
        self.shared.candles.status()
    }

    /// Connectivity of each exchange, in [`ExchangeId::ALL`] order.
    pub fn feed_status(&self) -> Vec<FeedStatus> {
        self.feed_status
            .iter()
            .map(|status| status.borrow().clone())
            .collect()
    }

    pub fn feed_status_of(&self, exchange: ExchangeId) -> Option<FeedStatus> {
        self.feed_status()
            .into_iter()
            .find(|status| status.exchange == exchange)
    }

    pub fn selection(&self) -> Selection {
        self.shared.selection.borrow().clone()
    }

    /// Follow `symbol` on the chart, keeping the current interval.
    pub fn select_symbol(&self, symbol: Symbol) -> bool {
        self.shared.selection.send_if_modified(|selection| {
            if selection.symbol == symbol {
                return false;
            }
            selection.symbol = symbol;
            true
        })
    }

    pub fn select_interval(&self, interval: KlineInterval) -> bool {
        self.shared.selection.send_if_modified(|selection| {
            if selection.interval == interval {
                return false;
            }
            selection.interval = interval;
            true
        })
    }

    /// Run a scoring pass now instead of waiting for the next tick.
    pub fn score_now(&self) -> Arc<InsightSnapshot> {
        self.shared.score()
    }

    /// Shared stores, eg/ for seeding in tests or embedding consumers.
    pub fn market_state(&self) -> &Arc<MarketState> {
        &self.shared.state
    }

    pub fn universe_tracker(&self) -> &Arc<UniverseTracker> {
        &self.shared.tracker
    }

    /// Cancel every task and wait for feeds to close.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(error) = task.await {
                error!(%error, "radar task panicked");
            }
        }
        info!("radar stopped");
    }
}

/// Restart every exchange feed when universe membership changes and keep the selection inside
/// the universe. A pure rank change does not reconnect.
async fn supervise_feeds(shared: Arc<Shared>, feeds: Feeds, cancel: CancellationToken) {
    let mut universe_rx = shared.tracker.subscribe();
    let mut current = Universe::default();
    let mut handles = Vec::<FeedHandle>::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = universe_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let next = universe_rx.borrow_and_update().clone();
        shared.reconcile_selection(&next);

        if next.same_members(&current) {
            current = next;
            continue;
        }

        for handle in handles.drain(..) {
            handle.shutdown().await;
        }
        info!(symbols = next.len(), "restarting exchange feeds");
        handles = feeds.start(next.symbols(), &cancel);
        current = next;
    }

    for handle in handles {
        handle.shutdown().await;
    }
    debug!("feed supervisor stopped");
}

/// Start a kline feed for the current selection and replace it whenever the selection changes.
async fn supervise_candles(shared: Arc<Shared>, kline_feed: KlineFeed, cancel: CancellationToken) {
    let mut selection_rx = shared.selection.subscribe();
    let mut current = selection_rx.borrow_and_update().clone();
    let mut handle = kline_feed.start(current.symbol.clone(), current.interval, &cancel);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = selection_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let next = selection_rx.borrow_and_update().clone();
        if next == current {
            continue;
        }

        handle.shutdown().await;
        handle = kline_feed.start(next.symbol.clone(), next.interval, &cancel);
        current = next;
    }

    handle.shutdown().await;
    debug!("candle supervisor stopped");
}

async fn run_scorer(shared: Arc<Shared>, interval: std::time::Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let snapshot = shared.score();
        debug!(
            rows = snapshot.rows.len(),
            opportunities = snapshot.opportunities.len(),
            ideas = snapshot.idea_count(),
            "scored"
        );
    }

    debug!("scorer stopped");
}
