//! Duplex endpoint resolution
//!
//! Turns the REST base address into a WebSocket target: `https` becomes
//! `wss`, `http` becomes `ws`, and the channel path is appended.

use std::fmt;
use thiserror::Error;
use url::Url;

/// Path prefix shared by all versioned API routes
pub const API_PREFIX: &str = "/api/v1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid base address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("unsupported scheme '{0}'; expected http(s) or ws(s)")]
    UnsupportedScheme(String),
}

/// Which realtime channel to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    /// General account-wide updates, served at the base address itself
    GeneralUpdates,
    /// Progress events for a single scan
    ScanProgress { scan_id: String },
    /// Any other path, appended verbatim
    Custom(String),
}

impl Channel {
    /// Path appended to the base address for this channel
    pub fn path(&self) -> String {
        match self {
            Channel::GeneralUpdates => String::new(),
            Channel::ScanProgress { scan_id } => {
                format!("{}/code/scans/{}/progress", API_PREFIX, scan_id)
            }
            Channel::Custom(path) => path.clone(),
        }
    }
}

/// A resolved duplex target, fixed for the lifetime of one connect attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTarget {
    url: Url,
}

impl EndpointTarget {
    /// Resolve a base HTTP(S) address and channel into a WS(S) target
    pub fn resolve(base_address: &str, channel: &Channel) -> Result<Self, EndpointError> {
        let mut url = Url::parse(base_address.trim()).map_err(|e| EndpointError::InvalidAddress {
            address: base_address.to_string(),
            reason: e.to_string(),
        })?;

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
        };

        url.set_scheme(scheme)
            .map_err(|_| EndpointError::UnsupportedScheme(url.scheme().to_string()))?;
        url.set_fragment(None);

        let extra = channel.path();
        if !extra.is_empty() {
            let base_path = url.path().trim_end_matches('/').to_string();
            let extra = extra.trim_start_matches('/');
            url.set_path(&format!("{}/{}", base_path, extra));
        }

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// True for `wss` targets
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "wss"
    }
}

impl fmt::Display for EndpointTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_progress_over_https() {
        let target = EndpointTarget::resolve(
            "https://api.example.com",
            &Channel::ScanProgress {
                scan_id: "abc-123".into(),
            },
        )
        .expect("resolve");
        assert_eq!(
            target.as_str(),
            "wss://api.example.com/api/v1/code/scans/abc-123/progress"
        );
        assert!(target.is_secure());
    }

    #[test]
    fn test_general_updates_over_http() {
        let target =
            EndpointTarget::resolve("http://localhost:8000", &Channel::GeneralUpdates).expect("resolve");
        assert_eq!(target.as_str(), "ws://localhost:8000/");
        assert!(!target.is_secure());
    }

    #[test]
    fn test_base_path_is_kept() {
        let target = EndpointTarget::resolve(
            "https://example.com/tenant/",
            &Channel::Custom("/stream".into()),
        )
        .expect("resolve");
        assert_eq!(target.as_str(), "wss://example.com/tenant/stream");
    }

    #[test]
    fn test_rejects_unknown_scheme() {
        let err = EndpointTarget::resolve("ftp://example.com", &Channel::GeneralUpdates)
            .expect_err("should fail");
        assert_eq!(err, EndpointError::UnsupportedScheme("ftp".into()));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = EndpointTarget::resolve("not a url", &Channel::GeneralUpdates)
            .expect_err("should fail");
        assert!(matches!(err, EndpointError::InvalidAddress { .. }));
    }
}
