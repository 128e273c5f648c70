//! Device-code authentication

use super::object;
use crate::api::executor::{HttpExecutor, Method};
use crate::error::ApiError;
use serde_json::{json, Value};

const CLI_CLIENT_NAME: &str = "Tavo CLI";

pub struct DeviceApi<'a> {
    executor: &'a dyn HttpExecutor,
}

impl<'a> DeviceApi<'a> {
    pub(crate) fn new(executor: &'a dyn HttpExecutor) -> Self {
        Self { executor }
    }

    /// Start a device-code login
    pub async fn create_device_code(
        &self,
        client_id: Option<&str>,
        client_name: Option<&str>,
    ) -> Result<Value, ApiError> {
        let body = object([
            ("client_id", client_id.map(Value::from)),
            ("client_name", client_name.map(Value::from)),
        ]);
        self.executor
            .execute(Method::Post, "/device/code", Some(body))
            .await
    }

    /// Start a device-code login; the client name defaults to "Tavo CLI"
    pub async fn create_device_code_for_cli(
        &self,
        client_id: Option<&str>,
        client_name: Option<&str>,
    ) -> Result<Value, ApiError> {
        let body = object([
            ("client_id", client_id.map(Value::from)),
            (
                "client_name",
                Some(Value::from(client_name.unwrap_or(CLI_CLIENT_NAME))),
            ),
        ]);
        self.executor
            .execute(Method::Post, "/device/code/cli", Some(body))
            .await
    }

    pub async fn poll_device_token(&self, device_code: &str) -> Result<Value, ApiError> {
        self.executor
            .execute(
                Method::Post,
                "/device/token",
                Some(json!({ "device_code": device_code })),
            )
            .await
    }

    pub async fn device_code_status(&self, device_code: &str) -> Result<Value, ApiError> {
        let path = format!("/device/code/{}/status", device_code);
        self.executor.execute(Method::Get, &path, None).await
    }

    pub async fn usage_warnings(&self) -> Result<Value, ApiError> {
        self.executor
            .execute(Method::Get, "/device/usage/warnings", None)
            .await
    }

    pub async fn limits(&self) -> Result<Value, ApiError> {
        self.executor
            .execute(Method::Get, "/device/limits", None)
            .await
    }
}
