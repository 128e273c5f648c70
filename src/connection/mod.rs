//! Connection management for the realtime duplex channel
//!
//! This module handles:
//! - Authenticated handshake against a resolved WS/WSS endpoint
//! - Keep-alive pings and link failure detection
//! - Bounded reconnection at a fixed interval
//! - Forwarding inbound frames to consumer channels

mod manager;
pub mod pump;

pub use manager::{ConnectionEvent, ConnectionManager};
pub use pump::MessagePump;
