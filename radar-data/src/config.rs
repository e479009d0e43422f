use crate::{exchange::ExchangeId, feed::connection::ReconnectPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Binance spot REST base url.
pub const BINANCE_REST: &str = "https://api.binance.com";

/// Binance public market data WebSocket base url.
pub const BINANCE_WS: &str = "wss://data-stream.binance.vision/ws";

/// Bybit REST base url.
pub const BYBIT_REST: &str = "https://api.bybit.com";

/// Bybit public spot WebSocket url.
pub const BYBIT_WS: &str = "wss://stream.bybit.com/v5/public/spot";

/// OKX REST base url.
pub const OKX_REST: &str = "https://www.okx.com";

/// OKX public WebSocket url.
pub const OKX_WS: &str = "wss://ws.okx.com:8443/ws/v5/public";

/// Read timeout for WebSocket streams (2 minutes).
///
/// If no frame is received within this period the connection is treated as dead.
pub const DEFAULT_WS_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// REST and WebSocket endpoints of one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Endpoints {
    pub rest: String,
    pub ws: String,
}

impl Endpoints {
    pub fn new(rest: impl Into<String>, ws: impl Into<String>) -> Self {
        Self {
            rest: rest.into(),
            ws: ws.into(),
        }
    }
}

/// Feed manager configuration shared by every exchange.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedConfig {
    pub binance: Endpoints,
    pub bybit: Endpoints,
    pub okx: Endpoints,
    /// Interval between drift-correcting REST snapshots.
    pub snapshot_interval: Duration,
    /// Maximum symbols per subscription request.
    pub subscription_batch_size: usize,
    /// Timeout applied to every REST request.
    pub request_timeout: Duration,
    /// Maximum silence tolerated on a live stream before reconnecting.
    pub read_timeout: Duration,
    /// Reconnect policy of the reference exchange.
    pub reference_reconnect: ReconnectPolicy,
    /// Reconnect policy of the peer exchanges and the kline feed.
    pub peer_reconnect: ReconnectPolicy,
    /// Number of candles requested when loading kline history.
    pub kline_history_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            binance: Endpoints::new(BINANCE_REST, BINANCE_WS),
            bybit: Endpoints::new(BYBIT_REST, BYBIT_WS),
            okx: Endpoints::new(OKX_REST, OKX_WS),
            snapshot_interval: Duration::from_secs(15),
            subscription_batch_size: 20,
            request_timeout: Duration::from_secs(10),
            read_timeout: DEFAULT_WS_READ_TIMEOUT,
            reference_reconnect: ReconnectPolicy::new(
                Duration::from_secs(1),
                Duration::from_secs(15),
            ),
            peer_reconnect: ReconnectPolicy::fixed(Duration::from_secs(2)),
            kline_history_limit: 120,
        }
    }
}

impl FeedConfig {
    /// Default configuration with endpoint overrides read from the environment.
    ///
    /// Recognised variables: `RADAR_{BINANCE,BYBIT,OKX}_{REST,WS}`.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply endpoint overrides provided by `lookup`, ignoring empty values.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for exchange in ExchangeId::ALL {
            let prefix = format!("RADAR_{}", exchange.as_str().to_ascii_uppercase());
            let endpoints = self.endpoints_mut(exchange);
            if let Some(rest) = lookup(&format!("{prefix}_REST")).filter(|v| !v.trim().is_empty()) {
                endpoints.rest = rest;
            }
            if let Some(ws) = lookup(&format!("{prefix}_WS")).filter(|v| !v.trim().is_empty()) {
                endpoints.ws = ws;
            }
        }
        self
    }

    pub fn endpoints(&self, exchange: ExchangeId) -> &Endpoints {
        match exchange {
            ExchangeId::Binance => &self.binance,
            ExchangeId::Bybit => &self.bybit,
            ExchangeId::Okx => &self.okx,
        }
    }

    fn endpoints_mut(&mut self, exchange: ExchangeId) -> &mut Endpoints {
        match exchange {
            ExchangeId::Binance => &mut self.binance,
            ExchangeId::Bybit => &mut self.bybit,
            ExchangeId::Okx => &mut self.okx,
        }
    }

    /// Set snapshot polling interval
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = interval;
        self
    }

    /// Set subscription batch size (minimum 1)
    pub fn with_subscription_batch_size(mut self, size: usize) -> Self {
        self.subscription_batch_size = size.max(1);
        self
    }

    /// Set REST request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set WebSocket read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set reference exchange reconnect policy
    pub fn with_reference_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reference_reconnect = policy;
        self
    }

    /// Set peer exchange reconnect policy
    pub fn with_peer_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.peer_reconnect = policy;
        self
    }
}
