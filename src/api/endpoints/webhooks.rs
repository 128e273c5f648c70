//! Account webhooks and per-repository webhook setup

use crate::api::executor::{HttpExecutor, Method};
use crate::api::query::Query;
use crate::error::ApiError;
use serde_json::Value;

pub struct WebhooksApi<'a> {
    executor: &'a dyn HttpExecutor,
}

impl<'a> WebhooksApi<'a> {
    pub(crate) fn new(executor: &'a dyn HttpExecutor) -> Self {
        Self { executor }
    }

    pub async fn list(&self, skip: Option<u32>, limit: Option<u32>) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("skip", skip)
            .opt("limit", limit)
            .append_to("/webhooks");
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn get(&self, webhook_id: &str) -> Result<Value, ApiError> {
        let path = format!("/webhooks/{}", webhook_id);
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn create(&self, webhook: Value) -> Result<Value, ApiError> {
        self.executor
            .execute(Method::Post, "/webhooks", Some(webhook))
            .await
    }

    pub async fn update(&self, webhook_id: &str, webhook: Value) -> Result<Value, ApiError> {
        let path = format!("/webhooks/{}", webhook_id);
        self.executor
            .execute(Method::Put, &path, Some(webhook))
            .await
    }

    pub async fn delete(&self, webhook_id: &str) -> Result<(), ApiError> {
        let path = format!("/webhooks/{}", webhook_id);
        self.executor.execute(Method::Delete, &path, None).await?;
        Ok(())
    }

    /// Ask the server to send a test delivery
    pub async fn test(&self, webhook_id: &str) -> Result<Value, ApiError> {
        let path = format!("/webhooks/{}/test", webhook_id);
        self.executor.execute(Method::Post, &path, None).await
    }

    pub async fn deliveries(
        &self,
        webhook_id: &str,
        skip: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("skip", skip)
            .opt("limit", limit)
            .append_to(&format!("/webhooks/{}/deliveries", webhook_id));
        self.executor.execute(Method::Get, &path, None).await
    }
}

pub struct RepositoryWebhooksApi<'a> {
    executor: &'a dyn HttpExecutor,
}

impl<'a> RepositoryWebhooksApi<'a> {
    pub(crate) fn new(executor: &'a dyn HttpExecutor) -> Self {
        Self { executor }
    }

    /// Install the scanning webhook on a connected repository
    pub async fn setup(&self, repository_id: &str) -> Result<Value, ApiError> {
        let path = format!("/repositories/{}/webhook/setup", repository_id);
        self.executor.execute(Method::Post, &path, None).await
    }

    pub async fn status(&self, repository_id: &str) -> Result<Value, ApiError> {
        let path = format!("/repositories/{}/webhook/status", repository_id);
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn delete(&self, repository_id: &str) -> Result<Value, ApiError> {
        let path = format!("/repositories/{}/webhook", repository_id);
        self.executor.execute(Method::Delete, &path, None).await
    }
}
