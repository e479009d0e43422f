use self::connection::{FeedConnection, FeedStatus};
use crate::{
    config::FeedConfig,
    error::DataError,
    exchange::{ExchangeAdapter, ExchangeId, MarketUpdate},
    fetch_text,
    state::{MarketState, Origin},
    symbol::Symbol,
};
use chrono::Utc;
use fnv::FnvHashSet;
use futures::{SinkExt, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle, time::Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// [`ReconnectPolicy`](connection::ReconnectPolicy), [`FeedConnection`] state machine and
/// published [`FeedStatus`].
pub mod connection;

/// Keeps one exchange's slice of the [`MarketState`] in sync with its REST snapshot and
/// WebSocket stream.
///
/// A manager lives for the whole pipeline and publishes its [`FeedStatus`] on a watch channel.
/// Each call to [`FeedManager::start`] opens a session for one symbol set. A changed universe
/// is handled by shutting the session down and starting a new one.
#[derive(Debug)]
pub struct FeedManager<A> {
    adapter: Arc<A>,
    state: Arc<MarketState>,
    client: reqwest::Client,
    config: FeedConfig,
    status: watch::Sender<FeedStatus>,
}

impl<A> FeedManager<A>
where
    A: ExchangeAdapter,
{
    pub fn new(
        adapter: A,
        state: Arc<MarketState>,
        client: reqwest::Client,
        config: FeedConfig,
    ) -> Self {
        let (status, _) = watch::channel(FeedStatus::new(adapter.id()));
        Self {
            adapter: Arc::new(adapter),
            state,
            client,
            config,
            status,
        }
    }

    pub fn exchange(&self) -> ExchangeId {
        self.adapter.id()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Current [`FeedStatus`].
    pub fn status(&self) -> FeedStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every [`FeedStatus`] change.
    pub fn subscribe_status(&self) -> watch::Receiver<FeedStatus> {
        self.status.subscribe()
    }

    /// Start a session for `symbols`: a snapshot polling task and a reconnecting stream task,
    /// both cancelled by a child of `parent`.
    ///
    /// An empty symbol set starts nothing and leaves the status untouched.
    pub fn start(&self, symbols: Vec<Symbol>, parent: &CancellationToken) -> FeedHandle {
        let cancel = parent.child_token();
        let exchange = self.exchange();

        if symbols.is_empty() {
            debug!(%exchange, "no symbols to track, feed session not started");
            return FeedHandle::new(exchange, cancel, Vec::new());
        }

        info!(%exchange, symbols = symbols.len(), "starting feed session");
        self.status.send_modify(|status| status.sessions += 1);

        let session = Session {
            adapter: Arc::clone(&self.adapter),
            state: Arc::clone(&self.state),
            watch: symbols.iter().cloned().collect(),
            symbols,
            status: self.status.clone(),
            cancel: cancel.clone(),
        };

        let snapshot = tokio::spawn(session.clone().run_snapshots(
            self.client.clone(),
            self.config.snapshot_interval,
        ));
        let stream = tokio::spawn(session.run_stream(
            self.config.request_timeout,
            self.config.read_timeout,
        ));

        FeedHandle::new(exchange, cancel, vec![snapshot, stream])
    }
}

/// Running session returned by [`FeedManager::start`] or [`KlineFeed::start`](crate::candle::feed::KlineFeed::start).
#[derive(Debug)]
pub struct FeedHandle {
    exchange: ExchangeId,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl FeedHandle {
    pub(crate) fn new(
        exchange: ExchangeId,
        cancel: CancellationToken,
        tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            exchange,
            cancel,
            tasks,
        }
    }

    pub fn exchange(&self) -> ExchangeId {
        self.exchange
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Cancel the session and wait for its tasks, closing the socket and dropping any pending
    /// reconnect or snapshot timer.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(error) = task.await {
                error!(exchange = %self.exchange, %error, "feed task panicked");
            }
        }
    }
}

/// Why a live stream session ended.
#[derive(Debug)]
enum SessionEnd {
    Cancelled,
    Disconnected(Option<DataError>),
}

#[derive(Debug)]
struct Session<A> {
    adapter: Arc<A>,
    state: Arc<MarketState>,
    symbols: Vec<Symbol>,
    watch: FnvHashSet<Symbol>,
    status: watch::Sender<FeedStatus>,
    cancel: CancellationToken,
}

impl<A> Clone for Session<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            state: Arc::clone(&self.state),
            symbols: self.symbols.clone(),
            watch: self.watch.clone(),
            status: self.status.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<A> Session<A>
where
    A: ExchangeAdapter,
{
    fn exchange(&self) -> ExchangeId {
        self.adapter.id()
    }

    /// Apply parsed updates for tracked symbols, returning how many were written.
    fn apply(&self, updates: Vec<MarketUpdate>, origin: Origin) -> usize {
        let exchange = self.exchange();
        updates
            .into_iter()
            .filter(|update| self.watch.contains(update.symbol()))
            .map(|update| self.state.apply(exchange, update, origin))
            .filter(|applied| *applied)
            .count()
    }

    /// Parse and apply one stream frame.
    fn process_frame(&self, payload: &str) -> Result<usize, DataError> {
        let updates = self.adapter.parse_stream_message(payload)?;
        let applied = self.apply(updates, Origin::Stream);
        if applied > 0 {
            self.status
                .send_modify(|status| status.last_event = Some(Utc::now()));
        }
        Ok(applied)
    }

    fn publish(&self, connection: &FeedConnection) {
        self.status.send_if_modified(|status| {
            let modified =
                status.status != connection.status() || status.attempt != connection.attempt();
            status.status = connection.status();
            status.attempt = connection.attempt();
            modified
        });
    }

    async fn run_snapshots(self, client: reqwest::Client, interval: Duration) {
        let exchange = self.exchange();
        let url = match self.adapter.snapshot_url(&self.symbols) {
            Ok(url) => url,
            Err(error) => {
                error!(%exchange, %error, "invalid snapshot url, snapshot polling disabled");
                return;
            }
        };

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let body = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                body = fetch_text(&client, &url) => body,
            };

            match body.and_then(|body| self.adapter.parse_snapshot(&body)) {
                Ok(updates) => {
                    let received = updates.len();
                    let applied = self.apply(updates, Origin::Snapshot);
                    debug!(%exchange, received, applied, "applied snapshot");
                }
                Err(error) if error.is_transient() => {
                    warn!(%exchange, %error, "snapshot failed, keeping previous state");
                }
                Err(error) => {
                    error!(%exchange, %error, "snapshot rejected, keeping previous state");
                }
            }
        }

        debug!(%exchange, "snapshot polling stopped");
    }

    async fn run_stream(self, connect_timeout: Duration, read_timeout: Duration) {
        let exchange = self.exchange();
        let mut connection = FeedConnection::new(self.adapter.reconnect_policy());

        let url = match self.adapter.stream_url() {
            Ok(url) => url,
            Err(error) => {
                error!(%exchange, %error, "invalid stream url, stream disabled");
                connection.close();
                self.publish(&connection);
                return;
            }
        };

        loop {
            if !connection.on_connecting() {
                break;
            }
            self.publish(&connection);

            let connect = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                connect = tokio::time::timeout(connect_timeout, connect_async(url.as_str())) => connect,
            };

            match connect {
                Ok(Ok((websocket, _))) => {
                    connection.on_connected();
                    self.publish(&connection);
                    info!(%exchange, %url, "stream connected");

                    match self.run_session(websocket, read_timeout).await {
                        SessionEnd::Cancelled => break,
                        SessionEnd::Disconnected(Some(error)) => {
                            connection.on_error();
                            self.publish(&connection);
                            warn!(%exchange, %error, "stream disconnected");
                        }
                        SessionEnd::Disconnected(None) => {
                            warn!(%exchange, "stream closed by server");
                        }
                    }
                }
                Ok(Err(error)) => {
                    connection.on_error();
                    self.publish(&connection);
                    warn!(%exchange, error = %DataError::from(error), "stream connect failed");
                }
                Err(_) => {
                    connection.on_error();
                    self.publish(&connection);
                    warn!(%exchange, timeout = ?connect_timeout, "stream connect timed out");
                }
            }

            let Some(delay) = connection.schedule_reconnect() else {
                break;
            };
            self.publish(&connection);
            info!(
                %exchange,
                attempt = connection.attempt(),
                delay_ms = delay.as_millis() as u64,
                "reconnecting stream"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        connection.close();
        self.publish(&connection);
        debug!(%exchange, "stream stopped");
    }

    async fn run_session<S>(
        &self,
        websocket: tokio_tungstenite::WebSocketStream<S>,
        read_timeout: Duration,
    ) -> SessionEnd
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let exchange = self.exchange();
        let (mut write, mut read) = websocket.split();

        for request in self.adapter.build_subscriptions(&self.symbols) {
            debug!(%exchange, %request, "sending subscription");
            if let Err(error) = write.send(Message::text(request)).await {
                return SessionEnd::Disconnected(Some(error.into()));
            }
        }

        let (mut ping_interval, ping_payload) = match self.adapter.ping() {
            Some(ping) => (
                Some(tokio::time::interval_at(
                    Instant::now() + ping.interval,
                    ping.interval,
                )),
                ping.payload,
            ),
            None => (None, String::new()),
        };

        // Deadline only moves when a frame arrives, so outbound pings never keep a silent
        // connection alive
        let idle = tokio::time::sleep(read_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return SessionEnd::Cancelled;
                }
                _ = async {
                    match ping_interval.as_mut() {
                        Some(interval) => { interval.tick().await; }
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    if let Err(error) = write.send(Message::text(ping_payload.clone())).await {
                        return SessionEnd::Disconnected(Some(error.into()));
                    }
                }
                frame = read.next() => {
                    if frame.is_some() {
                        idle.as_mut().reset(Instant::now() + read_timeout);
                    }
                    match frame {
                        None => return SessionEnd::Disconnected(None),
                        Some(Err(error)) => return SessionEnd::Disconnected(Some(error.into())),
                        Some(Ok(Message::Text(text))) => {
                            if let Err(error) = self.process_frame(text.as_str()) {
                                if error.is_terminal() {
                                    return SessionEnd::Disconnected(Some(error));
                                }
                                debug!(%exchange, %error, "dropping stream message");
                            }
                        }
                        Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                            Ok(text) => {
                                if let Err(error) = self.process_frame(text) {
                                    if error.is_terminal() {
                                        return SessionEnd::Disconnected(Some(error));
                                    }
                                    debug!(%exchange, %error, "dropping stream message");
                                }
                            }
                            Err(_) => debug!(%exchange, "dropping non utf8 binary frame"),
                        },
                        Some(Ok(Message::Close(frame))) => {
                            debug!(%exchange, ?frame, "received close frame");
                            return SessionEnd::Disconnected(None);
                        }
                        Some(Ok(_)) => {
                            // Ping/Pong handled by tungstenite
                        }
                    }
                }
                _ = &mut idle => {
                    return SessionEnd::Disconnected(Some(DataError::ReadTimeout(read_timeout)));
                }
            }
        }
    }
}
