//! Connection manager with a persistent duplex link and automatic reconnection

use crate::config::ConnectionConfig;
use crate::error::ConnectionError;
use crate::transport::{
    DuplexChannel, DuplexConnector, Frame, FrameSink, FrameSource, HandshakeRequest,
    TransportError, WebSocketConnector,
};
use bytes::Bytes;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tavo_shared::state_machine::is_valid_transition;
use tavo_shared::{
    codec, Channel, ConnectionState, ConnectionStateMachine, Credentials, EndpointTarget,
    LinkEvent, TransitionResult, WireMessage,
};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::{interval_at, sleep, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type SharedSink = Arc<Mutex<Box<dyn FrameSink>>>;
type SharedSource = Arc<Mutex<Box<dyn FrameSource>>>;

const EVENT_CAPACITY: usize = 32;

/// Lifecycle notifications published by the connection manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Explicit connect succeeded
    Connected { target: String },
    /// Reconnect attempt about to start (1-based)
    Reconnecting { attempt: u32 },
    /// Reconnect attempt succeeded
    Reconnected { attempt: u32 },
    /// All reconnect attempts failed; the manager is disconnected
    GaveUp { attempts: u32 },
    /// Explicit disconnect completed
    Disconnected,
}

/// State guarded by the manager's single lock
struct Inner {
    machine: ConnectionStateMachine,
    sink: Option<SharedSink>,
    source: Option<SharedSource>,
    credentials: Credentials,
    /// Bumped every time a link is installed or torn down
    generation: u64,
    /// Cancelled by `disconnect`; replaced on the next `connect`
    lifetime: CancellationToken,
    /// Child of `lifetime`, cancelled when the current link is torn down
    session: CancellationToken,
}

impl Inner {
    fn install(&mut self, channel: DuplexChannel) -> (u64, CancellationToken) {
        self.sink = Some(Arc::new(Mutex::new(channel.sink)));
        self.source = Some(Arc::new(Mutex::new(channel.source)));
        self.generation += 1;
        self.session = self.lifetime.child_token();
        (self.generation, self.session.clone())
    }

    fn teardown(&mut self) -> Option<SharedSink> {
        self.session.cancel();
        self.generation += 1;
        self.source = None;
        self.sink.take()
    }
}

struct Shared {
    config: ConnectionConfig,
    base_address: String,
    channel: Channel,
    connector: Arc<dyn DuplexConnector>,
    inner: RwLock<Inner>,
    attempts: AtomicU32,
    keepalive_tasks: AtomicUsize,
    events: broadcast::Sender<ConnectionEvent>,
    state_tx: watch::Sender<ConnectionState>,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply an event to the state machine. Caller holds the write lock.
    fn transition(&self, inner: &mut Inner, event: LinkEvent) -> bool {
        let from = inner.machine.state();
        match inner.machine.process_event(event) {
            TransitionResult::Success(to) => {
                debug_assert!(is_valid_transition(from, to), "{} -> {}", from, to);
                if from != to {
                    debug!("State changed: {} -> {}", from, to);
                }
                self.state_tx.send_replace(to);
                true
            }
            TransitionResult::Invalid { from, event } => {
                warn!("Ignoring {:?} in state {}", event, from);
                false
            }
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn request(&self, inner: &Inner) -> Result<HandshakeRequest, ConnectionError> {
        let target = EndpointTarget::resolve(&self.base_address, &self.channel)?;
        Ok(HandshakeRequest {
            target,
            auth: inner.credentials.select(),
        })
    }

    async fn handshake(&self, request: &HandshakeRequest) -> Result<DuplexChannel, TransportError> {
        let limit = self.config.handshake_timeout;
        match timeout(limit, self.connector.connect(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(limit)),
        }
    }
}

async fn write_frame(sink: &SharedSink, frame: Frame, limit: Duration) -> Result<(), TransportError> {
    // The mutex wait counts against the write timeout too
    let write = async {
        let mut guard = sink.lock().await;
        guard.send(frame).await
    };
    match timeout(limit, write).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(limit)),
    }
}

async fn close_sink(sink: SharedSink, limit: Duration) {
    let close = async {
        let mut guard = sink.lock().await;
        guard.close().await
    };
    match timeout(limit, close).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Ignoring close error on stale link: {}", e),
        Err(_) => debug!("Timed out closing stale link"),
    }
}

/// Manages one persistent duplex connection with keep-alive and reconnection
///
/// All state lives behind one lock that is never held across network I/O.
/// Background work (keep-alive, reconnect) is bound to a lifetime token
/// that [`disconnect`](Self::disconnect) cancels. Dropping the manager
/// cancels it as well.
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Create a manager for `channel` under `base_address` (an HTTP(S) URL)
    pub fn new(
        base_address: impl Into<String>,
        channel: Channel,
        credentials: Credentials,
        config: ConnectionConfig,
        connector: Arc<dyn DuplexConnector>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let lifetime = CancellationToken::new();
        let session = lifetime.child_token();

        Self {
            shared: Arc::new(Shared {
                config,
                base_address: base_address.into(),
                channel,
                connector,
                inner: RwLock::new(Inner {
                    machine: ConnectionStateMachine::new(),
                    sink: None,
                    source: None,
                    credentials,
                    generation: 0,
                    lifetime,
                    session,
                }),
                attempts: AtomicU32::new(0),
                keepalive_tasks: AtomicUsize::new(0),
                events,
                state_tx,
            }),
        }
    }

    /// Create a manager that connects over WebSocket
    pub fn websocket(
        base_address: impl Into<String>,
        channel: Channel,
        credentials: Credentials,
        config: ConnectionConfig,
    ) -> Self {
        Self::new(
            base_address,
            channel,
            credentials,
            config,
            Arc::new(WebSocketConnector::new()),
        )
    }

    /// Open the connection and start the keep-alive task
    ///
    /// Valid only from `Disconnected`, including after a previous
    /// `disconnect` or after reconnection gave up. A config with a zero
    /// interval or timeout is rejected before any state change.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        let shared = &self.shared;
        shared.config.validate()?;
        let (request, lifetime) = {
            let mut inner = shared.write();
            let state = inner.machine.state();
            if state != ConnectionState::Disconnected {
                return Err(ConnectionError::AlreadyConnected(state));
            }
            let request = shared.request(&inner)?;
            shared.transition(&mut inner, LinkEvent::ConnectRequested);
            if inner.lifetime.is_cancelled() {
                inner.lifetime = CancellationToken::new();
            }
            (request, inner.lifetime.clone())
        };

        let target = request.target.to_string();
        info!("Connecting to {} via {}", target, shared.connector.name());

        let result = tokio::select! {
            biased;
            _ = lifetime.cancelled() => Err(TransportError::Cancelled),
            result = shared.handshake(&request) => result,
        };

        let channel = match result {
            Ok(channel) => channel,
            Err(e) => {
                {
                    let mut inner = shared.write();
                    if inner.machine.state() == ConnectionState::Connecting
                        && !lifetime.is_cancelled()
                    {
                        shared.transition(&mut inner, LinkEvent::HandshakeFailed);
                    }
                }
                warn!("Handshake with {} failed: {}", target, e);
                return Err(ConnectionError::Connect { target, source: e });
            }
        };

        let installed = {
            let mut inner = shared.write();
            if inner.machine.state() == ConnectionState::Connecting && !lifetime.is_cancelled() {
                shared.transition(&mut inner, LinkEvent::HandshakeSucceeded);
                Ok(inner.install(channel))
            } else {
                Err(channel)
            }
        };

        match installed {
            Ok((generation, session)) => {
                shared.attempts.store(0, Ordering::SeqCst);
                spawn_keepalive(shared, generation, session);
                info!("Connected to {}", target);
                shared.emit(ConnectionEvent::Connected { target });
                Ok(())
            }
            Err(mut channel) => {
                // Disconnected while the handshake was in flight
                let _ = channel.sink.close().await;
                Err(ConnectionError::Connect {
                    target,
                    source: TransportError::Cancelled,
                })
            }
        }
    }

    /// Close the connection and stop all background work. No-op when
    /// already disconnected.
    pub async fn disconnect(&self) {
        let sink = {
            let mut inner = self.shared.write();
            if inner.machine.state() == ConnectionState::Disconnected {
                return;
            }
            self.shared
                .transition(&mut inner, LinkEvent::DisconnectRequested);
            inner.lifetime.cancel();
            inner.teardown()
        };

        if let Some(sink) = sink {
            let limit = self.shared.config.write_timeout;
            if let Err(e) = write_frame(&sink, Frame::normal_close(), limit).await {
                warn!("Failed to send close frame: {}", e);
            }
            close_sink(sink, limit).await;
        }

        info!("Disconnected");
        self.shared.emit(ConnectionEvent::Disconnected);
    }

    /// True iff the state is exactly `Connected`
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.read().machine.state()
    }

    /// Send `payload` wrapped in a `{type, data, timestamp}` envelope
    pub async fn send_message(
        &self,
        kind: impl Into<String>,
        payload: Value,
    ) -> Result<(), ConnectionError> {
        let sink = {
            let inner = self.shared.read();
            if inner.machine.state() != ConnectionState::Connected {
                return Err(ConnectionError::NotConnected);
            }
            inner.sink.clone().ok_or(ConnectionError::NotConnected)?
        };

        let text = codec::encode(&WireMessage::new(kind, payload))?;
        write_frame(&sink, Frame::Text(text), self.shared.config.write_timeout)
            .await
            .map_err(ConnectionError::Write)
    }

    /// Read one data frame. A failure triggers reconnection in the
    /// background and is returned immediately.
    pub async fn read_message(&self) -> Result<Bytes, ConnectionError> {
        let (source, generation) = {
            let inner = self.shared.read();
            let source = inner.source.clone().ok_or(ConnectionError::NotConnected)?;
            (source, inner.generation)
        };

        let limit = self.shared.config.read_timeout;
        let read = async {
            let mut guard = source.lock().await;
            guard.recv().await
        };
        let result = match timeout(limit, read).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(limit)),
        };

        result.map_err(|e| {
            warn!("Read failed: {}", e);
            trigger_reconnect(&self.shared, generation);
            ConnectionError::Read(e)
        })
    }

    /// Replace the credentials used by the next handshake
    pub fn set_credentials(&self, credentials: Credentials) {
        self.shared.write().credentials = credentials;
    }

    /// Attempts made by the current (or last) reconnect sequence
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    /// Number of keep-alive tasks currently alive
    pub fn active_keepalive_tasks(&self) -> usize {
        self.shared.keepalive_tasks.load(Ordering::SeqCst)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    /// Watch channel tracking every state transition
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Token cancelled by the next `disconnect`
    pub fn lifetime_token(&self) -> CancellationToken {
        self.shared.read().lifetime.clone()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }

    pub fn channel(&self) -> &Channel {
        &self.shared.channel
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shared.read().lifetime.cancel();
    }
}

/// Move a failed link to `Reconnecting` and start the retry loop
///
/// Only the first trigger for a given link generation has any effect: the
/// state check and generation bump happen under the write lock, so later
/// triggers for the same failure see a newer generation and return.
fn trigger_reconnect(shared: &Arc<Shared>, generation: u64) {
    let (stale, lifetime) = {
        let mut inner = shared.write();
        if inner.machine.state() != ConnectionState::Connected || inner.generation != generation {
            debug!("Reconnect already handled for generation {}", generation);
            return;
        }

        let stale = inner.teardown();
        shared.attempts.store(0, Ordering::SeqCst);

        if shared.config.max_reconnect_attempts == 0 {
            shared.transition(&mut inner, LinkEvent::RetriesExhausted);
            drop(inner);
            warn!("Link lost and reconnection is disabled");
            if let Some(sink) = stale {
                tokio::spawn(close_sink(sink, shared.config.write_timeout));
            }
            shared.emit(ConnectionEvent::GaveUp { attempts: 0 });
            return;
        }

        shared.transition(&mut inner, LinkEvent::LinkFailed);
        (stale, inner.lifetime.clone())
    };

    tokio::spawn(reconnect_loop(shared.clone(), stale, lifetime));
}

async fn reconnect_loop(shared: Arc<Shared>, stale: Option<SharedSink>, lifetime: CancellationToken) {
    if let Some(sink) = stale {
        close_sink(sink, shared.config.write_timeout).await;
    }

    let max = shared.config.max_reconnect_attempts;
    for attempt in 1..=max {
        tokio::select! {
            biased;
            _ = lifetime.cancelled() => {
                debug!("Reconnect cancelled before attempt {}", attempt);
                return;
            }
            _ = sleep(shared.config.reconnect_interval) => {}
        }

        let request = {
            let inner = shared.read();
            if lifetime.is_cancelled() || inner.machine.state() != ConnectionState::Reconnecting {
                return;
            }
            shared.request(&inner)
        };

        shared.attempts.store(attempt, Ordering::SeqCst);
        shared.emit(ConnectionEvent::Reconnecting { attempt });
        info!("Reconnect attempt {}/{}", attempt, max);

        let request = match request {
            Ok(request) => request,
            Err(e) => {
                warn!("Reconnect attempt {} failed: {}", attempt, e);
                continue;
            }
        };

        let result = tokio::select! {
            biased;
            _ = lifetime.cancelled() => return,
            result = shared.handshake(&request) => result,
        };

        match result {
            Ok(channel) => {
                let installed = {
                    let mut inner = shared.write();
                    if !lifetime.is_cancelled()
                        && inner.machine.state() == ConnectionState::Reconnecting
                    {
                        shared.transition(&mut inner, LinkEvent::HandshakeSucceeded);
                        Some(inner.install(channel))
                    } else {
                        None
                    }
                };

                if let Some((generation, session)) = installed {
                    spawn_keepalive(&shared, generation, session);
                    info!("Reconnected on attempt {}", attempt);
                    shared.emit(ConnectionEvent::Reconnected { attempt });
                }
                return;
            }
            Err(e) => warn!("Reconnect attempt {} failed: {}", attempt, e),
        }
    }

    {
        let mut inner = shared.write();
        if lifetime.is_cancelled() || inner.machine.state() != ConnectionState::Reconnecting {
            return;
        }
        shared.transition(&mut inner, LinkEvent::RetriesExhausted);
    }
    error!("Giving up after {} reconnect attempts", max);
    shared.emit(ConnectionEvent::GaveUp { attempts: max });
}

/// Decrements the live keep-alive count when the task ends
struct KeepAliveGuard(Arc<Shared>);

impl Drop for KeepAliveGuard {
    fn drop(&mut self) {
        self.0.keepalive_tasks.fetch_sub(1, Ordering::SeqCst);
    }
}

fn spawn_keepalive(shared: &Arc<Shared>, generation: u64, session: CancellationToken) {
    shared.keepalive_tasks.fetch_add(1, Ordering::SeqCst);
    let guard = KeepAliveGuard(shared.clone());
    tokio::spawn(async move {
        keepalive_loop(&guard.0, generation, session).await;
        drop(guard);
    });
}

async fn keepalive_loop(shared: &Arc<Shared>, generation: u64, session: CancellationToken) {
    let period = shared.config.ping_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = session.cancelled() => {
                debug!("Keep-alive stopped (generation {})", generation);
                return;
            }
            _ = ticker.tick() => {}
        }

        let sink = {
            let inner = shared.read();
            if inner.machine.state() != ConnectionState::Connected || inner.generation != generation {
                return;
            }
            match &inner.sink {
                Some(sink) => sink.clone(),
                None => return,
            }
        };

        if let Err(e) = write_frame(&sink, Frame::Ping(Bytes::new()), shared.config.write_timeout).await {
            warn!("Keep-alive ping failed: {}", e);
            trigger_reconnect(shared, generation);
            return;
        }
        debug!("Ping sent");
    }
}
