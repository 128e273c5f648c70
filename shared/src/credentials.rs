//! Authentication credentials and header selection
//!
//! Three mutually exclusive modes exist. When several are set, exactly one is
//! sent, chosen by priority: bearer token, then session token, then API key.

use serde::{Deserialize, Serialize};

/// Header carrying a session token
pub const SESSION_TOKEN_HEADER: &str = "X-Session-Token";

/// Header carrying an API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Standard authorization header
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Credentials attached to requests and handshakes
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// JWT or device bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    /// Session token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("Credentials")
            .field("bearer_token", &mask(&self.bearer_token))
            .field("session_token", &mask(&self.session_token))
            .field("api_key", &mask(&self.api_key))
            .finish()
    }
}

/// The single header selected for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: &'static str,
    pub value: String,
}

impl Credentials {
    /// Credentials with only an API key
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Default::default()
        }
    }

    /// Credentials with only a bearer token
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Credentials with only a session token
    pub fn session(token: impl Into<String>) -> Self {
        Self {
            session_token: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// True if no credential is set
    pub fn is_empty(&self) -> bool {
        self.select().is_none()
    }

    /// Pick the one header to send, by priority
    ///
    /// Empty strings count as unset.
    pub fn select(&self) -> Option<AuthHeader> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }

        if let Some(token) = present(&self.bearer_token) {
            return Some(AuthHeader {
                name: AUTHORIZATION_HEADER,
                value: format!("Bearer {}", token),
            });
        }
        if let Some(token) = present(&self.session_token) {
            return Some(AuthHeader {
                name: SESSION_TOKEN_HEADER,
                value: token.to_string(),
            });
        }
        present(&self.api_key).map(|key| AuthHeader {
            name: API_KEY_HEADER,
            value: key.to_string(),
        })
    }
}
