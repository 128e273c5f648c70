use crate::api::executor::{HttpExecutor, Method};
use crate::error::ApiError;
use serde_json::Value;

pub struct HealthApi<'a> {
    executor: &'a dyn HttpExecutor,
}

impl<'a> HealthApi<'a> {
    pub(crate) fn new(executor: &'a dyn HttpExecutor) -> Self {
        Self { executor }
    }

    /// Service health
    pub async fn check(&self) -> Result<Value, ApiError> {
        self.executor.execute(Method::Get, "/health", None).await
    }
}
