//! REST client facade

use crate::api::endpoints::{
    CodeSubmissionApi, DeviceApi, HealthApi, JobsApi, PluginsApi, RepositoriesApi,
    RepositoryWebhooksApi, ScanRulesApi, ScannerApi, ScansApi, WebhooksApi,
};
use crate::api::executor::{HttpExecutor, Method, ReqwestExecutor};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::realtime::RealtimeOperations;
use serde_json::Value;
use std::sync::Arc;

/// Entry point for the Tavo REST API
///
/// Endpoint groups borrow the client's executor, so they are cheap to
/// create per call: `client.scans().get("abc").await`.
#[derive(Clone)]
pub struct TavoClient {
    config: ClientConfig,
    executor: Arc<dyn HttpExecutor>,
}

impl TavoClient {
    /// Build a client over `reqwest`
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let executor = ReqwestExecutor::new(config.clone())?;
        Ok(Self::with_executor(config, Arc::new(executor)))
    }

    /// Build a client over a custom executor
    pub fn with_executor(config: ClientConfig, executor: Arc<dyn HttpExecutor>) -> Self {
        Self { config, executor }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue a raw JSON request
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        self.executor.execute(method, path, body).await
    }

    pub fn device(&self) -> DeviceApi<'_> {
        DeviceApi::new(self.executor.as_ref())
    }

    pub fn scanner(&self) -> ScannerApi<'_> {
        ScannerApi::new(self.executor.as_ref())
    }

    pub fn code_submission(&self) -> CodeSubmissionApi<'_> {
        CodeSubmissionApi::new(self.executor.as_ref())
    }

    pub fn scans(&self) -> ScansApi<'_> {
        ScansApi::new(self.executor.as_ref())
    }

    pub fn repositories(&self) -> RepositoriesApi<'_> {
        RepositoriesApi::new(self.executor.as_ref())
    }

    pub fn scan_rules(&self) -> ScanRulesApi<'_> {
        ScanRulesApi::new(self.executor.as_ref())
    }

    pub fn webhooks(&self) -> WebhooksApi<'_> {
        WebhooksApi::new(self.executor.as_ref())
    }

    pub fn repository_webhooks(&self) -> RepositoryWebhooksApi<'_> {
        RepositoryWebhooksApi::new(self.executor.as_ref())
    }

    pub fn plugins(&self) -> PluginsApi<'_> {
        PluginsApi::new(self.executor.as_ref())
    }

    pub fn jobs(&self) -> JobsApi<'_> {
        JobsApi::new(self.executor.as_ref())
    }

    pub fn health(&self) -> HealthApi<'_> {
        HealthApi::new(self.executor.as_ref())
    }

    /// Realtime channels using this client's address and credentials
    pub fn realtime(&self) -> RealtimeOperations {
        RealtimeOperations::new(&self.config)
    }
}
