//! Rule and plugin discovery for scanner integrations

use super::{non_empty, object};
use crate::api::executor::{HttpExecutor, Method};
use crate::api::query::Query;
use crate::error::ApiError;
use serde_json::Value;

/// Body of a scanner heartbeat
#[derive(Debug, Clone, Default)]
pub struct HeartbeatRequest {
    pub scanner_version: String,
    pub scanner_type: Option<String>,
    pub active_rules: Vec<String>,
    pub active_plugins: Vec<String>,
}

pub struct ScannerApi<'a> {
    executor: &'a dyn HttpExecutor,
}

impl<'a> ScannerApi<'a> {
    pub(crate) fn new(executor: &'a dyn HttpExecutor) -> Self {
        Self { executor }
    }

    pub async fn discover_rules(
        &self,
        category: Option<&str>,
        language: Option<&str>,
        scanner_type: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("category", category)
            .opt("language", language)
            .opt("scanner_type", scanner_type)
            .opt("limit", limit)
            .append_to("/rules/discover");
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn bundle_rules(
        &self,
        bundle_id: &str,
        severity: Option<&str>,
        language: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("severity", severity)
            .opt("language", language)
            .opt("limit", limit)
            .append_to(&format!("/rules/bundle/{}/rules", bundle_id));
        self.executor.execute(Method::Get, &path, None).await
    }

    /// Record that a rule bundle was used, optionally by a given scan
    pub async fn track_bundle_usage(
        &self,
        bundle_id: &str,
        scan_id: Option<&str>,
    ) -> Result<Value, ApiError> {
        let path = format!("/rules/bundle/{}/use", bundle_id);
        let body = object([("scan_id", scan_id.map(Value::from))]);
        self.executor.execute(Method::Post, &path, Some(body)).await
    }

    pub async fn discover_plugins(
        &self,
        plugin_type: Option<&str>,
        language: Option<&str>,
        scanner_integration: Option<bool>,
        limit: Option<u32>,
    ) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("plugin_type", plugin_type)
            .opt("language", language)
            .opt("scanner_integration", scanner_integration)
            .opt("limit", limit)
            .append_to("/plugins/discover");
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn plugin_config(&self, plugin_id: &str) -> Result<Value, ApiError> {
        let path = format!("/plugins/{}/config", plugin_id);
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn recommendations(
        &self,
        scanner_type: Option<&str>,
        current_rules: &[String],
        current_plugins: &[String],
    ) -> Result<Value, ApiError> {
        let path = Query::new()
            .opt("scanner_type", scanner_type)
            .list("current_rules", current_rules)
            .list("current_plugins", current_plugins)
            .append_to("/scanner/recommendations");
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn send_heartbeat(&self, heartbeat: &HeartbeatRequest) -> Result<Value, ApiError> {
        let body = object([
            (
                "scanner_version",
                Some(Value::from(heartbeat.scanner_version.as_str())),
            ),
            (
                "scanner_type",
                heartbeat.scanner_type.as_deref().map(Value::from),
            ),
            ("active_rules", non_empty(&heartbeat.active_rules)),
            ("active_plugins", non_empty(&heartbeat.active_plugins)),
        ]);
        self.executor
            .execute(Method::Post, "/scanner/heartbeat", Some(body))
            .await
    }
}
