//! Transport trait abstraction for pluggable duplex backends

use async_trait::async_trait;
use bytes::Bytes;
use tavo_shared::{AuthHeader, EndpointTarget};
use thiserror::Error;

/// Close code for a normal closure
pub const CLOSE_NORMAL: u16 = 1000;

/// Failures raised by a transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("handshake rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("connection closed by peer")]
    Closed,

    #[error("connection attempt cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Outbound frame written to a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// JSON envelope text
    Text(String),
    /// Keep-alive ping
    Ping(Bytes),
    /// Closure control frame
    Close { code: u16, reason: String },
}

impl Frame {
    /// Normal-closure frame sent on disconnect
    pub fn normal_close() -> Self {
        Frame::Close {
            code: CLOSE_NORMAL,
            reason: String::new(),
        }
    }
}

/// Everything a connector needs to open one connection
#[derive(Debug, Clone)]
pub struct HandshakeRequest {
    pub target: EndpointTarget,
    pub auth: Option<AuthHeader>,
}

/// Write half of a duplex connection
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Write one complete frame
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Release the underlying transport
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a duplex connection
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Read the next data frame; control frames are handled internally
    async fn recv(&mut self) -> Result<Bytes, TransportError>;
}

/// Both halves of an established connection
pub struct DuplexChannel {
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
}

/// Factory for creating duplex connections
#[async_trait]
pub trait DuplexConnector: Send + Sync + 'static {
    /// Perform the handshake, returning both halves on success
    async fn connect(&self, request: &HandshakeRequest) -> Result<DuplexChannel, TransportError>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
