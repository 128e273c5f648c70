//! WebSocket transport implementation over tokio-tungstenite

use crate::transport::traits::{
    DuplexChannel, DuplexConnector, Frame, FrameSink, FrameSource, HandshakeRequest,
    TransportError,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn map_ws_error(err: WsError) -> TransportError {
    match err {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            let body = response
                .body()
                .as_deref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            let message = match status {
                401 => "unauthorized: valid credentials required".to_string(),
                403 => "forbidden: access to realtime channel denied".to_string(),
                _ if body.is_empty() => "handshake failed".to_string(),
                _ => body,
            };
            TransportError::Rejected { status, message }
        }
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
        WsError::Io(e) => TransportError::Io(e),
        other => TransportError::WebSocket(other.to_string()),
    }
}

/// Write half of a WebSocket connection
pub struct WebSocketSink {
    inner: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            Frame::Text(text) => Message::text(text),
            Frame::Ping(payload) => Message::Ping(payload),
            Frame::Close { code, reason } => Message::Close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: reason.into(),
            })),
        };
        self.inner.send(message).await.map_err(map_ws_error)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.inner.close().await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(map_ws_error(e)),
        }
    }
}

/// Read half of a WebSocket connection
pub struct WebSocketSource {
    inner: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSource for WebSocketSource {
    async fn recv(&mut self) -> Result<Bytes, TransportError> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Bytes::copy_from_slice(text.as_str().as_bytes()));
                }
                Some(Ok(Message::Binary(data))) => return Ok(data),
                Some(Ok(Message::Close(frame))) => {
                    debug!("Peer sent close frame: {:?}", frame);
                    return Err(TransportError::Closed);
                }
                // Pongs are answered by tungstenite; nothing to surface
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Err(e)) => return Err(map_ws_error(e)),
                None => return Err(TransportError::Closed),
            }
        }
    }
}

/// Connector that opens WebSocket connections with one auth header
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DuplexConnector for WebSocketConnector {
    async fn connect(&self, request: &HandshakeRequest) -> Result<DuplexChannel, TransportError> {
        let mut http_request = request
            .target
            .as_str()
            .into_client_request()
            .map_err(map_ws_error)?;

        if let Some(auth) = &request.auth {
            let value = HeaderValue::from_str(&auth.value).map_err(|e| {
                TransportError::Other(format!("invalid {} header value: {}", auth.name, e))
            })?;
            http_request.headers_mut().insert(auth.name, value);
        }

        let (stream, _response) = connect_async(http_request).await.map_err(map_ws_error)?;
        let (sink, source) = stream.split();

        Ok(DuplexChannel {
            sink: Box::new(WebSocketSink { inner: sink }),
            source: Box::new(WebSocketSource { inner: source }),
        })
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}
