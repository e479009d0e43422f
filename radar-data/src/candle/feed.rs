use crate::{
    candle::{Candle, CandleSeries, ChartStatus, KlineInterval},
    config::{Endpoints, FeedConfig},
    error::DataError,
    exchange::{
        ExchangeId,
        binance::kline::{kline_stream_url, klines_url, parse_kline_message, parse_klines},
    },
    feed::{
        FeedHandle,
        connection::{FeedConnection, ReconnectPolicy},
    },
    fetch_text,
    symbol::Symbol,
};
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Candle series of the current chart selection plus its [`ChartStatus`].
#[derive(Debug)]
pub struct CandleStore {
    series: RwLock<CandleSeries>,
    status: watch::Sender<ChartStatus>,
}

impl CandleStore {
    pub fn new(symbol: Symbol, interval: KlineInterval) -> Self {
        let (status, _) = watch::channel(ChartStatus::Idle);
        Self {
            series: RwLock::new(CandleSeries::new(symbol, interval)),
            status,
        }
    }

    /// Switch to a new selection, discarding the previous series.
    pub fn reset(&self, symbol: Symbol, interval: KlineInterval) {
        *self.series.write() = CandleSeries::new(symbol, interval);
        self.set_status(ChartStatus::Idle);
    }

    /// Replace the series with a REST history load. Ignored if the selection moved on.
    pub fn load(&self, symbol: &Symbol, interval: KlineInterval, candles: Vec<Candle>) -> bool {
        let mut series = self.series.write();
        if series.symbol != *symbol || series.interval != interval {
            return false;
        }
        series.load(candles);
        true
    }

    /// Apply a streamed kline. Ignored if it belongs to another symbol or interval.
    pub fn apply(&self, symbol: &Symbol, interval: KlineInterval, candle: Candle) -> bool {
        let mut series = self.series.write();
        if series.symbol != *symbol || series.interval != interval {
            return false;
        }
        series.apply(candle)
    }

    pub fn series(&self) -> CandleSeries {
        self.series.read().clone()
    }

    pub fn candles(&self) -> Vec<Candle> {
        self.series.read().candles()
    }

    pub fn status(&self) -> ChartStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ChartStatus> {
        self.status.subscribe()
    }

    fn set_status(&self, next: ChartStatus) {
        self.status.send_if_modified(|status| {
            let modified = *status != next;
            *status = next;
            modified
        });
    }
}

/// Reference kline feed for one chart selection: loads recent candles over REST, then follows
/// the kline stream, reconnecting with the peer policy.
#[derive(Debug, Clone)]
pub struct KlineFeed {
    endpoints: Endpoints,
    client: reqwest::Client,
    store: Arc<CandleStore>,
    policy: ReconnectPolicy,
    history_limit: usize,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl KlineFeed {
    pub fn new(config: &FeedConfig, client: reqwest::Client, store: Arc<CandleStore>) -> Self {
        Self {
            endpoints: config.binance.clone(),
            client,
            store,
            policy: config.peer_reconnect,
            history_limit: config.kline_history_limit,
            connect_timeout: config.request_timeout,
            read_timeout: config.read_timeout,
        }
    }

    pub fn store(&self) -> &Arc<CandleStore> {
        &self.store
    }

    /// Reset the [`CandleStore`] to the selection and start following it.
    pub fn start(
        &self,
        symbol: Symbol,
        interval: KlineInterval,
        parent: &CancellationToken,
    ) -> FeedHandle {
        let cancel = parent.child_token();
        self.store.reset(symbol.clone(), interval);

        info!(%symbol, %interval, "starting kline feed");
        let task = tokio::spawn(self.clone().run(symbol, interval, cancel.clone()));

        FeedHandle::new(ExchangeId::Binance, cancel, vec![task])
    }

    async fn load_history(&self, symbol: &Symbol, interval: KlineInterval) -> Result<usize, DataError> {
        let url = klines_url(&self.endpoints.rest, symbol, interval, self.history_limit)?;
        let body = fetch_text(&self.client, &url).await?;
        let candles = parse_klines(&body)?;
        let loaded = candles.len();
        self.store.load(symbol, interval, candles);
        Ok(loaded)
    }

    async fn run(self, symbol: Symbol, interval: KlineInterval, cancel: CancellationToken) {
        self.store.set_status(ChartStatus::Loading);

        let loaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            loaded = self.load_history(&symbol, interval) => loaded,
        };
        match loaded {
            Ok(loaded) => {
                debug!(%symbol, %interval, loaded, "loaded kline history");
                self.store.set_status(ChartStatus::Live);
            }
            Err(error) => {
                warn!(%symbol, %interval, %error, "kline history load failed");
                self.store.set_status(ChartStatus::Error);
            }
        }

        let url = match kline_stream_url(&self.endpoints.ws, &symbol, interval) {
            Ok(url) => url,
            Err(error) => {
                warn!(%symbol, %error, "invalid kline stream url");
                self.store.set_status(ChartStatus::Error);
                return;
            }
        };

        let mut connection = FeedConnection::new(self.policy);
        while connection.on_connecting() {
            let connect = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                connect = tokio::time::timeout(self.connect_timeout, connect_async(url.as_str())) => connect,
            };

            match connect {
                Ok(Ok((websocket, _))) => {
                    connection.on_connected();
                    self.store.set_status(ChartStatus::Live);

                    let (mut write, mut read) = websocket.split();
                    let error = loop {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => {
                                let _ = write.send(Message::Close(None)).await;
                                connection.close();
                                break None;
                            }
                            frame = tokio::time::timeout(self.read_timeout, read.next()) => match frame {
                                Err(_) => break Some(DataError::ReadTimeout(self.read_timeout)),
                                Ok(None) | Ok(Some(Ok(Message::Close(_)))) => break None,
                                Ok(Some(Err(error))) => break Some(DataError::from(error)),
                                Ok(Some(Ok(Message::Text(text)))) => match parse_kline_message(text.as_str()) {
                                    Ok(Some(event)) => {
                                        self.store.apply(&event.symbol, event.kline.interval, event.kline.into());
                                    }
                                    Ok(None) => {}
                                    Err(error) => debug!(%symbol, %error, "dropping kline message"),
                                },
                                Ok(Some(Ok(_))) => {}
                            },
                        }
                    };

                    if let Some(error) = error {
                        connection.on_error();
                        self.store.set_status(ChartStatus::Error);
                        warn!(%symbol, %interval, %error, "kline stream disconnected");
                    }
                }
                Ok(Err(error)) => {
                    connection.on_error();
                    self.store.set_status(ChartStatus::Error);
                    warn!(%symbol, error = %DataError::from(error), "kline stream connect failed");
                }
                Err(_) => {
                    connection.on_error();
                    self.store.set_status(ChartStatus::Error);
                    warn!(%symbol, "kline stream connect timed out");
                }
            }

            let Some(delay) = connection.schedule_reconnect() else {
                break;
            };
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!(%symbol, %interval, "kline feed stopped");
    }
}
