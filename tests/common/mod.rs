//! Scripted in-memory transport for connection manager tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tavo_sdk::config::ConnectionConfig;
use tavo_sdk::transport::{
    DuplexChannel, DuplexConnector, Frame, FrameSink, FrameSource, HandshakeRequest,
    TransportError,
};
use tavo_sdk::ConnectionManager;
use tavo_shared::{AuthHeader, Channel, Credentials};
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const BASE: &str = "https://api.example.com";

/// One recorded handshake
#[derive(Debug, Clone)]
pub struct Handshake {
    pub target: String,
    pub auth: Option<AuthHeader>,
    pub at: Instant,
    pub accepted: bool,
}

/// Begin/end markers around every frame write
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    Begin(usize),
    End(usize),
}

#[derive(Default)]
pub struct MockState {
    handshakes: Mutex<Vec<Handshake>>,
    /// Outcomes for upcoming handshakes; `reject_by_default` once empty
    script: Mutex<VecDeque<bool>>,
    reject_by_default: AtomicBool,
    hang_handshakes: AtomicBool,
    failing_pings: AtomicU32,
    frames: Mutex<Vec<Frame>>,
    wire: Mutex<Vec<WireEvent>>,
    closes: AtomicU32,
    inbound: Mutex<Option<mpsc::UnboundedSender<Result<Bytes, TransportError>>>>,
}

/// Connector handing out in-memory channels that share one [`MockState`]
#[derive(Clone, Default)]
pub struct MockConnector {
    pub state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next handshakes (true = accept)
    pub fn script(&self, outcomes: &[bool]) {
        self.state.script.lock().unwrap().extend(outcomes.iter().copied());
    }

    pub fn reject_by_default(&self, reject: bool) {
        self.state.reject_by_default.store(reject, Ordering::SeqCst);
    }

    pub fn hang_handshakes(&self, hang: bool) {
        self.state.hang_handshakes.store(hang, Ordering::SeqCst);
    }

    /// Make the next `n` pings fail
    pub fn fail_pings(&self, n: u32) {
        self.state.failing_pings.store(n, Ordering::SeqCst);
    }

    pub fn handshakes(&self) -> Vec<Handshake> {
        self.state.handshakes.lock().unwrap().clone()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.state.frames.lock().unwrap().clone()
    }

    pub fn pings(&self) -> usize {
        self.frames()
            .iter()
            .filter(|f| matches!(f, Frame::Ping(_)))
            .count()
    }

    pub fn wire(&self) -> Vec<WireEvent> {
        self.state.wire.lock().unwrap().clone()
    }

    pub fn closes(&self) -> u32 {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Deliver an inbound frame (or failure) on the newest connection
    pub fn push_inbound(&self, item: Result<Bytes, TransportError>) {
        let guard = self.state.inbound.lock().unwrap();
        let tx = guard.as_ref().expect("no connection established");
        tx.send(item).expect("source dropped");
    }
}

#[async_trait]
impl DuplexConnector for MockConnector {
    async fn connect(&self, request: &HandshakeRequest) -> Result<DuplexChannel, TransportError> {
        if self.state.hang_handshakes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let accepted = match self.state.script.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => !self.state.reject_by_default.load(Ordering::SeqCst),
        };
        self.state.handshakes.lock().unwrap().push(Handshake {
            target: request.target.to_string(),
            auth: request.auth.clone(),
            at: Instant::now(),
            accepted,
        });

        if !accepted {
            return Err(TransportError::Rejected {
                status: 503,
                message: "service unavailable".into(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.state.inbound.lock().unwrap() = Some(tx);

        Ok(DuplexChannel {
            sink: Box::new(MockSink {
                state: self.state.clone(),
            }),
            source: Box::new(MockSource { rx }),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

struct MockSink {
    state: Arc<MockState>,
}

#[async_trait]
impl FrameSink for MockSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        if matches!(frame, Frame::Ping(_)) {
            let failed = self
                .state
                .failing_pings
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                return Err(TransportError::Closed);
            }
        }

        let id = {
            let mut wire = self.state.wire.lock().unwrap();
            let id = wire.len();
            wire.push(WireEvent::Begin(id));
            id
        };
        // Give other writers a chance to interleave
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        self.state.frames.lock().unwrap().push(frame);
        self.state.wire.lock().unwrap().push(WireEvent::End(id));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockSource {
    rx: mpsc::UnboundedReceiver<Result<Bytes, TransportError>>,
}

#[async_trait]
impl FrameSource for MockSource {
    async fn recv(&mut self) -> Result<Bytes, TransportError> {
        match self.rx.recv().await {
            Some(item) => item,
            None => Err(TransportError::Closed),
        }
    }
}

/// Short intervals so paused-clock tests stay readable
pub fn test_config() -> ConnectionConfig {
    ConnectionConfig::default()
        .with_reconnect_interval(Duration::from_secs(5))
        .with_max_reconnect_attempts(3)
        .with_ping_interval(Duration::from_secs(30))
        .with_read_timeout(Duration::from_secs(3600))
        .with_write_timeout(Duration::from_secs(10))
        .with_handshake_timeout(Duration::from_secs(10))
}

pub fn manager(connector: &MockConnector, config: ConnectionConfig) -> ConnectionManager {
    ConnectionManager::new(
        BASE,
        Channel::ScanProgress {
            scan_id: "abc-123".into(),
        },
        Credentials::api_key("K1"),
        config,
        Arc::new(connector.clone()),
    )
}

/// Let spawned tasks run; with a paused clock this also advances time
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
