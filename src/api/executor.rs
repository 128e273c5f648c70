//! HTTP execution seam for the REST endpoint wrappers

use crate::config::ClientConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use std::fmt;
use tavo_shared::{ErrorResponse, SDK_VERSION};
use tracing::{debug, warn};

/// HTTP verbs used by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One uploaded file in a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub filename: String,
    pub content: Vec<u8>,
}

/// Multipart form contents, kept as plain data so a request can be rebuilt
/// for every retry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartBody {
    pub files: Vec<FilePart>,
    pub fields: Vec<(String, String)>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(
        mut self,
        field: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.files.push(FilePart {
            field: field.into(),
            filename: filename.into(),
            content: content.into(),
        });
        self
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    fn to_form(&self) -> Form {
        let mut form = Form::new();
        for file in &self.files {
            let part = Part::bytes(file.content.clone()).file_name(file.filename.clone());
            form = form.part(file.field.clone(), part);
        }
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        form
    }
}

/// Executes REST calls on behalf of the endpoint wrappers
#[async_trait]
pub trait HttpExecutor: Send + Sync + 'static {
    /// Send a JSON request to `path` (relative to `/api/{version}`)
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError>;

    /// POST a multipart form to `path`
    async fn execute_multipart(&self, path: &str, body: MultipartBody) -> Result<Value, ApiError>;
}

/// [`HttpExecutor`] backed by a pooled `reqwest` client
#[derive(Clone)]
pub struct ReqwestExecutor {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ReqwestExecutor {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers(&config)?)
            .build()?;
        Ok(Self { http, config })
    }

    /// Full URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/api/{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version,
            path
        )
    }

    async fn send_with_retry<F>(&self, method: Method, path: &str, build: F) -> Result<Value, ApiError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            debug!(
                "[HTTP] {} {} (attempt {}/{})",
                method,
                path,
                attempt + 1,
                max_retries + 1
            );

            let result = match build().send().await {
                Ok(response) => read_response(response).await,
                Err(e) => Err(ApiError::Request(e)),
            };

            match result {
                Err(e) if attempt < max_retries && e.is_retryable() => {
                    attempt += 1;
                    warn!("[HTTP] {} {} failed, retrying: {}", method, path, e);
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path);
        self.send_with_retry(method, path, || {
            let request = self.http.request(method.into(), &url);
            match &body {
                Some(body) => request.json(body),
                None => request,
            }
        })
        .await
    }

    async fn execute_multipart(&self, path: &str, body: MultipartBody) -> Result<Value, ApiError> {
        let url = self.url(path);
        self.send_with_retry(Method::Post, path, || {
            self.http.post(&url).multipart(body.to_form())
        })
        .await
    }
}

fn default_headers(config: &ClientConfig) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let agent = format!("tavo-sdk-rust/{}", SDK_VERSION);
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&agent).map_err(|e| ApiError::InvalidRequest(e.to_string()))?,
    );

    if let Some(auth) = config.credentials.select() {
        let mut value = HeaderValue::from_str(&auth.value).map_err(|e| {
            ApiError::InvalidRequest(format!("invalid {} header value: {}", auth.name, e))
        })?;
        value.set_sensitive(true);
        let name = HeaderName::from_bytes(auth.name.as_bytes())
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

async fn read_response(response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let body = serde_json::from_str::<ErrorResponse>(&text).unwrap_or_else(|_| ErrorResponse {
            error: status.canonical_reason().unwrap_or("error").to_string(),
            message: text,
            details: None,
        });
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}
