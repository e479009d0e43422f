use radar_data::{
    candle::KlineInterval,
    config::FeedConfig,
    symbol::Symbol,
    universe::{DEFAULT_REFRESH_INTERVAL, DEFAULT_SYMBOL, DEFAULT_UNIVERSE_SIZE},
};
use std::time::Duration;
use tracing::warn;

/// Default cadence of the scoring pass.
pub const DEFAULT_SCORE_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for a [`Radar`](crate::radar::Radar) pipeline.
#[derive(Debug, Clone)]
pub struct RadarConfig {
    pub feed: FeedConfig,
    /// Number of symbols admitted to the universe.
    pub universe_size: usize,
    pub universe_refresh_interval: Duration,
    pub score_interval: Duration,
    /// Initial chart selection.
    pub symbol: Symbol,
    pub interval: KlineInterval,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            universe_size: DEFAULT_UNIVERSE_SIZE,
            universe_refresh_interval: DEFAULT_REFRESH_INTERVAL,
            score_interval: DEFAULT_SCORE_INTERVAL,
            symbol: Symbol::new(DEFAULT_SYMBOL),
            interval: KlineInterval::default(),
        }
    }
}

impl RadarConfig {
    /// Default configuration with overrides read from the environment.
    ///
    /// Recognised variables: `RADAR_TOP_N`, `RADAR_SCORE_INTERVAL_MS`, `RADAR_SYMBOL`,
    /// `RADAR_INTERVAL` and the endpoint variables of [`FeedConfig::from_env`].
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides provided by `lookup`. Unparsable values are logged and ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.feed = self.feed.with_overrides(&lookup);

        if let Some(top_n) = parse_var::<usize, _>(&lookup, "RADAR_TOP_N").filter(|n| *n > 0) {
            self.universe_size = top_n;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "RADAR_SCORE_INTERVAL_MS").filter(|ms| *ms > 0)
        {
            self.score_interval = Duration::from_millis(ms);
        }
        if let Some(symbol) = lookup("RADAR_SYMBOL").filter(|v| !v.trim().is_empty()) {
            self.symbol = Symbol::new(symbol.trim());
        }
        if let Some(interval) = parse_var::<KlineInterval, _>(&lookup, "RADAR_INTERVAL") {
            self.interval = interval;
        }

        self
    }

    /// Set number of tracked symbols (minimum 1)
    pub fn with_universe_size(mut self, size: usize) -> Self {
        self.universe_size = size.max(1);
        self
    }

    /// Set universe refresh interval
    pub fn with_universe_refresh_interval(mut self, interval: Duration) -> Self {
        self.universe_refresh_interval = interval;
        self
    }

    /// Set scoring interval
    pub fn with_score_interval(mut self, interval: Duration) -> Self {
        self.score_interval = interval;
        self
    }

    /// Set initial chart selection
    pub fn with_selection(mut self, symbol: Symbol, interval: KlineInterval) -> Self {
        self.symbol = symbol;
        self.interval = interval;
        self
    }

    pub fn with_feed(mut self, feed: FeedConfig) -> Self {
        self.feed = feed;
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
