//! Tavo SDK
//!
//! Client for the Tavo security scanning API:
//! - [`TavoClient`]: REST endpoint groups over a pluggable [`HttpExecutor`]
//! - [`ConnectionManager`]: persistent realtime connection with keep-alive
//!   and bounded reconnection, plus [`MessagePump`] for channel delivery
//! - [`TavoScanner`]: runs the local `tavo-scanner` binary
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod api;
pub mod config;
pub mod connection;
pub mod error;
pub mod realtime;
pub mod scanner;
pub mod transport;

pub use api::{HttpExecutor, Method, MultipartBody, ReqwestExecutor, TavoClient};
pub use config::{ClientConfig, ConnectionConfig};
pub use connection::{ConnectionEvent, ConnectionManager, MessagePump};
pub use error::{ApiError, ConfigError, ConnectionError, ScannerError};
pub use realtime::RealtimeOperations;
pub use scanner::{ScanOptions, ScanResult, ScanStatus, ScannerConfig, TavoScanner};
pub use transport::{DuplexConnector, TransportError, WebSocketConnector};

pub use tavo_shared::{
    Channel, ConnectionState, Credentials, EndpointTarget, ErrorResponse, WireMessage,
};
