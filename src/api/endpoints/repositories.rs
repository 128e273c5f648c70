//! Connected repositories: sync, settings, scans and reporting

use crate::api::executor::{HttpExecutor, Method};
use crate::api::query::Query;
use crate::error::ApiError;
use serde_json::Value;

/// Filters for listing repositories
#[derive(Debug, Clone, Default)]
pub struct RepositoryListParams {
    pub connection_id: Option<String>,
    pub language: Option<String>,
    pub scan_enabled: Option<bool>,
    /// Free-text match on name and description
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub struct RepositoriesApi<'a> {
    executor: &'a dyn HttpExecutor,
}

impl<'a> RepositoriesApi<'a> {
    pub(crate) fn new(executor: &'a dyn HttpExecutor) -> Self {
        Self { executor }
    }

    /// Pull the repository list from every connected provider
    pub async fn sync(&self) -> Result<Value, ApiError> {
        self.executor
            .execute(Method::Post, "/repositories/sync", None)
            .await
    }

    pub async fn list(&self, params: &RepositoryListParams) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("connection_id", params.connection_id.as_deref())
            .opt("language", params.language.as_deref())
            .opt("scan_enabled", params.scan_enabled)
            .opt("search", params.search.as_deref())
            .opt("page", params.page)
            .opt("per_page", params.per_page)
            .append_to("/repositories");
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn get(&self, repository_id: &str) -> Result<Value, ApiError> {
        let path = format!("/repositories/{}", repository_id);
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn update(&self, repository_id: &str, update: Value) -> Result<Value, ApiError> {
        let path = format!("/repositories/{}", repository_id);
        self.executor
            .execute(Method::Put, &path, Some(update))
            .await
    }

    pub async fn delete(&self, repository_id: &str) -> Result<(), ApiError> {
        let path = format!("/repositories/{}", repository_id);
        self.executor.execute(Method::Delete, &path, None).await?;
        Ok(())
    }

    pub async fn scans(&self, repository_id: &str, limit: Option<u32>) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("limit", limit)
            .append_to(&format!("/repositories/{}/scans", repository_id));
        self.executor.execute(Method::Get, &path, None).await
    }

    /// Queue a scan of the repository's default branch
    pub async fn trigger_scan(&self, repository_id: &str) -> Result<Value, ApiError> {
        let path = format!("/repositories/{}/scan", repository_id);
        self.executor.execute(Method::Post, &path, None).await
    }

    pub async fn branches(&self, repository_id: &str) -> Result<Value, ApiError> {
        let path = format!("/repositories/{}/branches", repository_id);
        self.executor.execute(Method::Get, &path, None).await
    }

    /// Stop automatic scanning
    pub async fn pause(&self, repository_id: &str) -> Result<Value, ApiError> {
        let path = format!("/repositories/{}/pause", repository_id);
        self.executor.execute(Method::Post, &path, None).await
    }

    pub async fn resume(&self, repository_id: &str) -> Result<Value, ApiError> {
        let path = format!("/repositories/{}/resume", repository_id);
        self.executor.execute(Method::Post, &path, None).await
    }

    /// Finding trends over `timeframe` (e.g. `30d`)
    pub async fn analytics(
        &self,
        repository_id: &str,
        timeframe: Option<&str>,
    ) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("timeframe", timeframe)
            .append_to(&format!("/repositories/{}/analytics", repository_id));
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn badge(&self, repository_id: &str, style: Option<&str>) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("style", style)
            .append_to(&format!("/repositories/{}/badge", repository_id));
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn activity(
        &self,
        repository_id: &str,
        limit: Option<u32>,
    ) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("limit", limit)
            .append_to(&format!("/repositories/{}/activity", repository_id));
        self.executor.execute(Method::Get, &path, None).await
    }
}
