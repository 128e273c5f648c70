//! Realtime channels opened from a REST client configuration

use crate::config::{ClientConfig, ConnectionConfig};
use crate::connection::ConnectionManager;
use crate::error::ConnectionError;
use crate::transport::{DuplexConnector, WebSocketConnector};
use std::sync::Arc;
use tavo_shared::{Channel, Credentials};

/// Builds connected [`ConnectionManager`]s for the API's realtime channels
#[derive(Clone)]
pub struct RealtimeOperations {
    base_url: String,
    credentials: Credentials,
    connector: Arc<dyn DuplexConnector>,
}

impl RealtimeOperations {
    /// Use the client's base URL and credentials over WebSocket
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(WebSocketConnector::new()))
    }

    pub fn with_connector(config: &ClientConfig, connector: Arc<dyn DuplexConnector>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            credentials: config.credentials.clone(),
            connector,
        }
    }

    /// Connect to progress events for one scan
    pub async fn connect_to_scan_progress(
        &self,
        scan_id: &str,
        config: ConnectionConfig,
    ) -> Result<ConnectionManager, ConnectionError> {
        self.open(
            Channel::ScanProgress {
                scan_id: scan_id.to_string(),
            },
            config,
        )
        .await
    }

    /// Connect to account-wide updates
    pub async fn connect_to_general_updates(
        &self,
        config: ConnectionConfig,
    ) -> Result<ConnectionManager, ConnectionError> {
        self.open(Channel::GeneralUpdates, config).await
    }

    async fn open(
        &self,
        channel: Channel,
        config: ConnectionConfig,
    ) -> Result<ConnectionManager, ConnectionError> {
        let manager = ConnectionManager::new(
            self.base_url.clone(),
            channel,
            self.credentials.clone(),
            config,
            self.connector.clone(),
        );
        manager.connect().await?;
        Ok(manager)
    }
}
