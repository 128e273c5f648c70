//! Custom scan rules

use crate::api::executor::{HttpExecutor, Method, MultipartBody};
use crate::api::query::Query;
use crate::error::ApiError;
use serde_json::Value;

/// Filters for listing rules
#[derive(Debug, Clone, Default)]
pub struct RuleListParams {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub tool: Option<String>,
    pub category: Option<String>,
    pub severity: Option<String>,
    pub language: Option<String>,
    pub is_active: Option<bool>,
    pub organization_id: Option<String>,
}

pub struct ScanRulesApi<'a> {
    executor: &'a dyn HttpExecutor,
}

impl<'a> ScanRulesApi<'a> {
    pub(crate) fn new(executor: &'a dyn HttpExecutor) -> Self {
        Self { executor }
    }

    pub async fn create(&self, rule: Value) -> Result<Value, ApiError> {
        self.executor
            .execute(Method::Post, "/rules", Some(rule))
            .await
    }

    pub async fn list(&self, params: &RuleListParams) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("skip", params.skip)
            .opt("limit", params.limit)
            .opt("tool_filter", params.tool.as_deref())
            .opt("category_filter", params.category.as_deref())
            .opt("severity_filter", params.severity.as_deref())
            .opt("language_filter", params.language.as_deref())
            .opt("is_active", params.is_active)
            .opt("organization_id", params.organization_id.as_deref())
            .append_to("/rules");
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn get(&self, rule_id: &str) -> Result<Value, ApiError> {
        let path = format!("/rules/{}", rule_id);
        self.executor.execute(Method::Get, &path, None).await
    }

    /// Upload a rules file (YAML or JSON) as multipart field `file`
    pub async fn upload(
        &self,
        filename: &str,
        content: Vec<u8>,
        organization_id: Option<&str>,
    ) -> Result<Value, ApiError> {
        if content.is_empty() {
            return Err(ApiError::InvalidRequest("rules file is empty".to_string()));
        }
        let mut body = MultipartBody::new().file("file", filename, content);
        if let Some(org) = organization_id {
            body = body.text("organization_id", org);
        }
        self.executor.execute_multipart("/rules/upload", body).await
    }

    pub async fn update(&self, rule_id: &str, update: Value) -> Result<Value, ApiError> {
        let path = format!("/rules/{}", rule_id);
        self.executor
            .execute(Method::Put, &path, Some(update))
            .await
    }

    pub async fn delete(&self, rule_id: &str) -> Result<(), ApiError> {
        let path = format!("/rules/{}", rule_id);
        self.executor.execute(Method::Delete, &path, None).await?;
        Ok(())
    }
}
