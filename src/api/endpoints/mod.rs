//! Endpoint groups
//!
//! Each group is a thin borrow of the client's [`HttpExecutor`] with one
//! method per API operation.

mod code_submission;
mod device;
mod health;
mod plugins;
mod repositories;
mod scan_rules;
mod scanner;
mod scans;
mod webhooks;

pub use code_submission::{AnalysisRequest, CodeSubmission, CodeSubmissionApi};
pub use device::DeviceApi;
pub use health::HealthApi;
pub use plugins::{JobsApi, PluginsApi};
pub use repositories::{RepositoriesApi, RepositoryListParams};
pub use scan_rules::{RuleListParams, ScanRulesApi};
pub use scanner::{HeartbeatRequest, ScannerApi};
pub use scans::{ScanListParams, ScanResultsParams, ScansApi};
pub use webhooks::{RepositoryWebhooksApi, WebhooksApi};

use serde_json::{Map, Value};

/// JSON object from optional fields; `None` entries are left out
pub(crate) fn object<'a>(fields: impl IntoIterator<Item = (&'a str, Option<Value>)>) -> Value {
    let map: Map<String, Value> = fields
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect();
    Value::Object(map)
}

/// `Some` JSON array for a non-empty list
pub(crate) fn non_empty(values: &[String]) -> Option<Value> {
    (!values.is_empty()).then(|| Value::from(values.to_vec()))
}
