//! Scanner configuration, per-run options and results

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the scanner executable looked up on `PATH`
pub const SCANNER_BINARY: &str = "tavo-scanner";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_FORMAT: &str = "json";

/// Settings shared by every scan a [`TavoScanner`](super::TavoScanner) runs
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Scanner executable; `None` if it could not be found
    pub scanner_path: Option<PathBuf>,
    pub plugins: Vec<String>,
    /// Per-plugin settings, for writing with
    /// [`create_plugin_config`](super::TavoScanner::create_plugin_config)
    pub plugin_config: Map<String, Value>,
    pub rules_path: Option<PathBuf>,
    /// Inline rules, written to a temporary file when no rules path is set
    pub custom_rules: Map<String, Value>,
    pub timeout: Duration,
    pub working_directory: PathBuf,
    pub output_format: String,
    pub output_file: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scanner_path: find_scanner_binary(),
            plugins: Vec::new(),
            plugin_config: Map::new(),
            rules_path: None,
            custom_rules: Map::new(),
            timeout: DEFAULT_TIMEOUT,
            working_directory: PathBuf::from("."),
            output_format: DEFAULT_FORMAT.to_string(),
            output_file: None,
        }
    }
}

impl ScannerConfig {
    pub fn with_scanner_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.scanner_path = Some(path.into());
        self
    }

    pub fn with_plugins<I, S>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugins = plugins.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }
}

/// Per-run overrides; set fields replace the scanner's configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub static_analysis: bool,
    pub static_plugins: Vec<String>,
    pub static_rules: Option<PathBuf>,
    pub dynamic_testing: bool,
    pub dynamic_plugins: Vec<String>,
    pub output_format: Option<String>,
    pub output_file: Option<PathBuf>,
    pub timeout: Option<Duration>,
    // TODO: forward include/exclude patterns once tavo-scanner exposes flags for them
    pub exclude_patterns: Vec<String>,
    pub include_patterns: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            static_analysis: true,
            static_plugins: Vec::new(),
            static_rules: None,
            dynamic_testing: false,
            dynamic_plugins: Vec::new(),
            output_format: None,
            output_file: None,
            timeout: None,
            exclude_patterns: Vec::new(),
            include_patterns: Vec::new(),
        }
    }
}

/// Everything one scanner invocation needs, after merging options
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedScan {
    pub plugins: Vec<String>,
    pub rules_path: Option<PathBuf>,
    pub output_format: String,
    pub output_file: Option<PathBuf>,
    pub timeout: Duration,
}

impl ResolvedScan {
    pub(crate) fn merge(config: &ScannerConfig, options: Option<&ScanOptions>) -> Self {
        let mut resolved = Self {
            plugins: config.plugins.clone(),
            rules_path: config.rules_path.clone(),
            output_format: config.output_format.clone(),
            output_file: config.output_file.clone(),
            timeout: config.timeout,
        };

        let Some(options) = options else {
            return resolved;
        };

        let mut plugins = Vec::new();
        if options.static_analysis {
            plugins.extend(options.static_plugins.iter().cloned());
        }
        if options.dynamic_testing {
            plugins.extend(options.dynamic_plugins.iter().cloned());
        }
        if !plugins.is_empty() {
            resolved.plugins = plugins;
        }
        if let Some(rules) = &options.static_rules {
            resolved.rules_path = Some(rules.clone());
        }
        if let Some(format) = &options.output_format {
            resolved.output_format = format.clone();
        }
        if let Some(file) = &options.output_file {
            resolved.output_file = Some(file.clone());
        }
        if let Some(timeout) = options.timeout {
            resolved.timeout = timeout;
        }
        resolved
    }

    /// Command line after the executable: `<target> --plugin p ... --rules r
    /// --format f --output o --timeout t`
    pub(crate) fn args(&self, target: &Path) -> Vec<String> {
        let mut args = vec![target.display().to_string()];
        for plugin in &self.plugins {
            args.push("--plugin".to_string());
            args.push(plugin.clone());
        }
        if let Some(rules) = &self.rules_path {
            args.push("--rules".to_string());
            args.push(rules.display().to_string());
        }
        if !self.output_format.is_empty() {
            args.push("--format".to_string());
            args.push(self.output_format.clone());
        }
        if let Some(file) = &self.output_file {
            args.push("--output".to_string());
            args.push(file.display().to_string());
        }
        if !self.timeout.is_zero() {
            args.push("--timeout".to_string());
            args.push(self.timeout.as_secs().max(1).to_string());
        }
        args
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Success,
    Error,
}

/// Outcome of one scanner run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub status: ScanStatus,
    /// Findings, when stdout was a JSON array
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<Value>,
    /// Raw stdout, when it was not a JSON array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    pub fn is_success(&self) -> bool {
        self.status == ScanStatus::Success
    }

    /// Interpret the stdout of a successful run
    pub(crate) fn from_stdout(stdout: &str) -> Self {
        let trimmed = stdout.trim();
        let mut result = Self {
            status: ScanStatus::Success,
            results: Vec::new(),
            output: None,
            error: None,
        };
        if trimmed.is_empty() {
            return result;
        }
        match serde_json::from_str::<Vec<Value>>(trimmed) {
            Ok(results) => result.results = results,
            Err(_) => result.output = Some(stdout.to_string()),
        }
        result
    }

    pub(crate) fn failed(message: String) -> Self {
        Self {
            status: ScanStatus::Error,
            results: Vec::new(),
            output: None,
            error: Some(message),
        }
    }
}

/// Look up the scanner executable on `PATH`
pub fn find_scanner_binary() -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(SCANNER_BINARY))
        .find(|candidate| candidate.is_file())
}
