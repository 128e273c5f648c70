//! Plugin execution and background job tracking

use crate::api::executor::{HttpExecutor, Method};
use crate::api::query::Query;
use crate::error::ApiError;
use serde_json::Value;

pub struct PluginsApi<'a> {
    executor: &'a dyn HttpExecutor,
}

impl<'a> PluginsApi<'a> {
    pub(crate) fn new(executor: &'a dyn HttpExecutor) -> Self {
        Self { executor }
    }

    /// Start a plugin run; the body names the plugin and its inputs
    pub async fn execute(&self, request: Value) -> Result<Value, ApiError> {
        self.executor
            .execute(Method::Post, "/plugins/execute", Some(request))
            .await
    }

    pub async fn execution(&self, execution_id: &str) -> Result<Value, ApiError> {
        let path = format!("/plugins/executions/{}", execution_id);
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn executions(
        &self,
        plugin_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("plugin_id", plugin_id)
            .opt("limit", limit)
            .append_to("/plugins/executions");
        self.executor.execute(Method::Get, &path, None).await
    }
}

pub struct JobsApi<'a> {
    executor: &'a dyn HttpExecutor,
}

impl<'a> JobsApi<'a> {
    pub(crate) fn new(executor: &'a dyn HttpExecutor) -> Self {
        Self { executor }
    }

    pub async fn status(&self, job_id: &str) -> Result<Value, ApiError> {
        let path = format!("/jobs/status/{}", job_id);
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn dashboard(&self, limit: Option<u32>) -> Result<Value, ApiError> {
        let path = Query::new().opt("limit", limit).append_to("/jobs/dashboard");
        self.executor.execute(Method::Get, &path, None).await
    }
}
