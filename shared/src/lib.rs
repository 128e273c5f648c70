//! Tavo Shared Protocol Types
//!
//! This crate provides the wire envelope, codec, connection state machine and
//! endpoint helpers shared by the Tavo SDK's realtime and REST layers.

pub mod codec;
pub mod credentials;
pub mod endpoint;
pub mod state_machine;
pub mod types;

use std::time::{SystemTime, UNIX_EPOCH};

// Re-export commonly used types at crate root
pub use codec::{CodecError, WireMessage};
pub use credentials::{AuthHeader, Credentials};
pub use endpoint::{Channel, EndpointError, EndpointTarget};
pub use state_machine::{ConnectionState, ConnectionStateMachine, LinkEvent, TransitionResult};
pub use types::{ErrorResponse, ListResponse, PaginatedResponse, PaginationInfo};

/// SDK version reported in the `User-Agent` header
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get current timestamp in seconds since Unix epoch
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Connection parameters shared by the realtime layer
pub mod defaults {
    /// Time to wait before each reconnect attempt, in milliseconds
    pub const RECONNECT_INTERVAL_MS: u64 = 5_000;

    /// Maximum reconnect attempts before giving up
    pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

    /// Keep-alive ping interval in milliseconds
    pub const PING_INTERVAL_MS: u64 = 30_000;

    /// Read timeout for a single frame, in milliseconds
    pub const READ_TIMEOUT_MS: u64 = 60_000;

    /// Write timeout for a single frame, in milliseconds
    pub const WRITE_TIMEOUT_MS: u64 = 10_000;

    /// Handshake timeout, independent of the read and write timeouts
    pub const HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

    /// How long the message pump waits on a full consumer before dropping
    pub const PUMP_FORWARD_TIMEOUT_MS: u64 = 1_000;

    /// Default API host
    pub const BASE_URL: &str = "https://api.tavo.ai";

    /// Default API version segment
    pub const API_VERSION: &str = "v1";
}
