//! JSON envelope codec for WebSocket text frames
//!
//! Every outbound message is framed as one text frame holding:
//! ```text
//! { "type": <string>, "data": <any JSON>, "timestamp": <unix seconds> }
//! ```
//!
//! Inbound frames from the server usually follow the same shape, but callers
//! may also receive arbitrary JSON, so both a strict and a loose decoder exist.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::now_secs;

/// Maximum message size (10 MB) to prevent memory exhaustion
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Message too large: {0} bytes (max: {MAX_MESSAGE_SIZE})")]
    MessageTooLarge(usize),

    #[error("Message type must not be empty")]
    EmptyKind,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The envelope wrapped around every message sent over the duplex connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Message kind, serialized as `type`
    #[serde(rename = "type")]
    pub kind: String,
    /// Arbitrary JSON payload
    #[serde(default)]
    pub data: Value,
    /// Unix timestamp in seconds
    #[serde(default)]
    pub timestamp: i64,
}

impl WireMessage {
    /// Create a new envelope stamped with the current time
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: now_secs(),
        }
    }
}

/// Encode an envelope into the text payload of one frame
pub fn encode(message: &WireMessage) -> Result<String, CodecError> {
    if message.kind.is_empty() {
        return Err(CodecError::EmptyKind);
    }

    let text = serde_json::to_string(message)?;

    if text.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge(text.len()));
    }

    Ok(text)
}

/// Decode a frame payload that follows the envelope shape
pub fn decode(payload: &[u8]) -> Result<WireMessage, CodecError> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge(payload.len()));
    }
    Ok(serde_json::from_slice(payload)?)
}

/// Decode any JSON frame payload without requiring the envelope shape
pub fn decode_value(payload: &[u8]) -> Result<Value, CodecError> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge(payload.len()));
    }
    Ok(serde_json::from_slice(payload)?)
}
