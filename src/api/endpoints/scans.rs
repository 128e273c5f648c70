//! Scan management

use crate::api::executor::{HttpExecutor, Method};
use crate::api::query::Query;
use crate::error::ApiError;
use serde_json::Value;

/// Filters for listing scans
#[derive(Debug, Clone, Default)]
pub struct ScanListParams {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub organization_id: Option<String>,
}

/// Filters for a scan's findings
#[derive(Debug, Clone, Default)]
pub struct ScanResultsParams {
    pub severity: Option<String>,
    pub rule_type: Option<String>,
    pub limit: Option<u32>,
}

pub struct ScansApi<'a> {
    executor: &'a dyn HttpExecutor,
}

impl<'a> ScansApi<'a> {
    pub(crate) fn new(executor: &'a dyn HttpExecutor) -> Self {
        Self { executor }
    }

    pub async fn create(&self, scan: Value) -> Result<Value, ApiError> {
        self.executor
            .execute(Method::Post, "/scans", Some(scan))
            .await
    }

    pub async fn list(&self, params: &ScanListParams) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("skip", params.skip)
            .opt("limit", params.limit)
            .opt("status_filter", params.status.as_deref())
            .opt("organization_id", params.organization_id.as_deref())
            .append_to("/scans");
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn get(&self, scan_id: &str) -> Result<Value, ApiError> {
        let path = format!("/scans/{}", scan_id);
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn results(
        &self,
        scan_id: &str,
        params: &ScanResultsParams,
    ) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("severity_filter", params.severity.as_deref())
            .opt("rule_type_filter", params.rule_type.as_deref())
            .opt("limit", params.limit)
            .append_to(&format!("/scans/{}/results", scan_id));
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn cancel(&self, scan_id: &str) -> Result<Value, ApiError> {
        let path = format!("/scans/{}/cancel", scan_id);
        self.executor.execute(Method::Post, &path, None).await
    }
}
