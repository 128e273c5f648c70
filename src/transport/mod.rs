pub mod traits;
pub mod websocket;

pub use traits::{
    DuplexChannel, DuplexConnector, Frame, FrameSink, FrameSource, HandshakeRequest,
    TransportError, CLOSE_NORMAL,
};
pub use websocket::{WebSocketConnector, WebSocketSink, WebSocketSource};
