//! Code submission and CLI-oriented scan polling

use super::{non_empty, object};
use crate::api::executor::{HttpExecutor, Method, MultipartBody};
use crate::error::ApiError;
use serde_json::Value;

const DEFAULT_FILENAME: &str = "file";

/// Files uploaded for a scan, with optional repository metadata
#[derive(Debug, Clone, Default)]
pub struct CodeSubmission {
    /// `(filename, content)` pairs; an empty filename is sent as "file"
    pub files: Vec<(String, Vec<u8>)>,
    pub repository_name: Option<String>,
    pub branch: Option<String>,
    pub commit_sha: Option<String>,
    pub scan_config: Option<Value>,
}

/// A code snippet submitted for targeted analysis
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub code_content: String,
    pub language: String,
    pub analysis_type: Option<String>,
    pub rules: Vec<String>,
    pub plugins: Vec<String>,
    pub context: Option<Value>,
}

pub struct CodeSubmissionApi<'a> {
    executor: &'a dyn HttpExecutor,
}

impl<'a> CodeSubmissionApi<'a> {
    pub(crate) fn new(executor: &'a dyn HttpExecutor) -> Self {
        Self { executor }
    }

    /// Upload files as a multipart form
    pub async fn submit_code(&self, submission: &CodeSubmission) -> Result<Value, ApiError> {
        if submission.files.is_empty() {
            return Err(ApiError::InvalidRequest(
                "at least one file is required".to_string(),
            ));
        }

        let mut body = MultipartBody::new();
        for (filename, content) in &submission.files {
            let filename = if filename.is_empty() {
                DEFAULT_FILENAME
            } else {
                filename.as_str()
            };
            body = body.file("files", filename, content.clone());
        }
        let fields = [
            ("repository_name", &submission.repository_name),
            ("branch", &submission.branch),
            ("commit_sha", &submission.commit_sha),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                body = body.text(name, value.clone());
            }
        }
        if let Some(config) = &submission.scan_config {
            let encoded = serde_json::to_string(config)
                .map_err(|e| ApiError::InvalidRequest(format!("scan_config: {}", e)))?;
            body = body.text("scan_config", encoded);
        }

        self.executor
            .execute_multipart("/code/submit/code", body)
            .await
    }

    /// Submit a repository snapshot
    pub async fn submit_repository(
        &self,
        repository_url: &str,
        snapshot_data: Value,
        branch: Option<&str>,
        commit_sha: Option<&str>,
        scan_config: Option<Value>,
    ) -> Result<Value, ApiError> {
        let body = object([
            ("repository_url", Some(Value::from(repository_url))),
            ("snapshot_data", Some(snapshot_data)),
            ("branch", branch.map(Value::from)),
            ("commit_sha", commit_sha.map(Value::from)),
            ("scan_config", scan_config),
        ]);
        self.executor
            .execute(Method::Post, "/code/submit/repository", Some(body))
            .await
    }

    pub async fn submit_analysis(&self, request: &AnalysisRequest) -> Result<Value, ApiError> {
        let body = object([
            ("code_content", Some(Value::from(request.code_content.as_str()))),
            ("language", Some(Value::from(request.language.as_str()))),
            ("analysis_type", request.analysis_type.as_deref().map(Value::from)),
            ("rules", non_empty(&request.rules)),
            ("plugins", non_empty(&request.plugins)),
            ("context", request.context.clone()),
        ]);
        self.executor
            .execute(Method::Post, "/code/submit/analysis", Some(body))
            .await
    }

    pub async fn scan_status(&self, scan_id: &str) -> Result<Value, ApiError> {
        let path = format!("/code/scans/{}/status", scan_id);
        self.executor.execute(Method::Get, &path, None).await
    }

    /// Summary of a finished scan's results
    pub async fn scan_results(&self, scan_id: &str) -> Result<Value, ApiError> {
        let path = format!("/code/scans/{}/results/summary", scan_id);
        self.executor.execute(Method::Get, &path, None).await
    }
}
