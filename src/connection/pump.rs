//! Forwarding loop from a connection manager to consumer channels

use crate::connection::ConnectionManager;
use crate::error::ConnectionError;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tavo_shared::{defaults, ConnectionState};
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Consumer side of a running pump
///
/// `messages` closes when the pump ends, either on `disconnect` or when
/// reconnection gives up.
pub struct MessagePump {
    pub messages: mpsc::Receiver<Bytes>,
    pub errors: mpsc::Receiver<ConnectionError>,
    handle: JoinHandle<()>,
}

impl MessagePump {
    /// Start pumping with the default forward timeout
    pub fn spawn(manager: Arc<ConnectionManager>, capacity: usize) -> Self {
        Self::spawn_with_timeout(
            manager,
            capacity,
            Duration::from_millis(defaults::PUMP_FORWARD_TIMEOUT_MS),
        )
    }

    /// Start pumping; each forward waits at most `forward_timeout` for room
    /// before the item is dropped
    pub fn spawn_with_timeout(
        manager: Arc<ConnectionManager>,
        capacity: usize,
        forward_timeout: Duration,
    ) -> Self {
        let (msg_tx, messages) = mpsc::channel(capacity.max(1));
        let (err_tx, errors) = mpsc::channel(capacity.max(1));
        let token = manager.lifetime_token();
        let state_rx = manager.watch_state();

        let handle = tokio::spawn(run(manager, token, state_rx, msg_tx, err_tx, forward_timeout));

        Self {
            messages,
            errors,
            handle,
        }
    }

    /// True once the pump task has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the pump without touching the connection
    pub fn abort(&self) {
        self.handle.abort();
    }
}

async fn run(
    manager: Arc<ConnectionManager>,
    token: CancellationToken,
    mut state_rx: watch::Receiver<ConnectionState>,
    msg_tx: mpsc::Sender<Bytes>,
    err_tx: mpsc::Sender<ConnectionError>,
    forward_timeout: Duration,
) {
    loop {
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = manager.read_message() => result,
        };

        match result {
            Ok(payload) => match msg_tx.send_timeout(payload, forward_timeout).await {
                Ok(()) => {}
                Err(SendTimeoutError::Timeout(_)) => {
                    warn!("Message consumer is lagging, dropping message");
                }
                Err(SendTimeoutError::Closed(_)) => {
                    debug!("Message consumer went away");
                    break;
                }
            },
            Err(e) => {
                if let Err(SendTimeoutError::Timeout(e)) = err_tx.send_timeout(e, forward_timeout).await {
                    warn!("Error consumer is lagging, dropping: {}", e);
                }
                if !wait_for_link(&mut state_rx, &token).await {
                    break;
                }
            }
        }
    }
    debug!("Message pump stopped");
}

/// Wait until the manager is connected again; false if it gave up or the
/// pump was cancelled
async fn wait_for_link(
    state_rx: &mut watch::Receiver<ConnectionState>,
    token: &CancellationToken,
) -> bool {
    loop {
        let state = *state_rx.borrow_and_update();
        match state {
            ConnectionState::Connected => return true,
            ConnectionState::Disconnected => return false,
            ConnectionState::Connecting | ConnectionState::Reconnecting => {}
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => return false,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
        }
    }
}
