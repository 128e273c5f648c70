//! Wrapper around the local `tavo-scanner` executable
//!
//! The scanner runs as a child process with a hard timeout. Its stdout is
//! parsed as a JSON array of findings when possible and kept raw otherwise.

mod config;

pub use config::{
    find_scanner_binary, ScanOptions, ScanResult, ScanStatus, ScannerConfig, SCANNER_BINARY,
};

use crate::error::ScannerError;
use config::ResolvedScan;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Runs scans with a fixed base configuration
#[derive(Debug, Clone, Default)]
pub struct TavoScanner {
    config: ScannerConfig,
}

impl TavoScanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Scan `target`, with `options` overriding the base configuration
    ///
    /// A non-zero exit is reported as a [`ScanStatus::Error`] result, not an
    /// `Err`; `Err` is reserved for failing to run the scanner at all.
    pub async fn scan_directory(
        &self,
        target: impl AsRef<Path>,
        options: Option<&ScanOptions>,
    ) -> Result<ScanResult, ScannerError> {
        let binary = self
            .config
            .scanner_path
            .as_ref()
            .ok_or(ScannerError::BinaryNotFound)?;

        let mut resolved = ResolvedScan::merge(&self.config, options);

        // Held until the run ends so the file outlives the child
        let _inline_rules = if resolved.rules_path.is_none() && !self.config.custom_rules.is_empty() {
            let file = write_json_temp(
                "tavo-rules-",
                &Value::Object(self.config.custom_rules.clone()),
            )?;
            resolved.rules_path = Some(file.path().to_path_buf());
            Some(file)
        } else {
            None
        };

        let args = resolved.args(target.as_ref());
        debug!("[SCANNER] {} {}", binary.display(), args.join(" "));

        let child = Command::new(binary)
            .args(&args)
            .current_dir(&self.config.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ScannerError::BinaryNotFound,
                _ => ScannerError::Io(e),
            })?;

        // Dropping the child on timeout kills it
        let output = match timeout(resolved.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(
                    "[SCANNER] Timed out after {}s, killing",
                    resolved.timeout.as_secs()
                );
                return Err(ScannerError::Timeout(resolved.timeout.as_secs()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() {
            let result = ScanResult::from_stdout(&stdout);
            info!("[SCANNER] Scan finished with {} findings", result.results.len());
            return Ok(result);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = [stderr.trim(), stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match output.status.code() {
                Some(code) => format!("scanner exited with code {}", code),
                None => "scanner terminated by signal".to_string(),
            });
        warn!("[SCANNER] Scan failed: {}", message);
        Ok(ScanResult::failed(message))
    }

    /// Scan with the given plugins instead of the configured ones
    pub async fn scan_with_plugins<I, S>(
        &self,
        target: impl AsRef<Path>,
        plugins: I,
    ) -> Result<ScanResult, ScannerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = ScanOptions {
            static_plugins: plugins.into_iter().map(Into::into).collect(),
            ..ScanOptions::default()
        };
        self.scan_directory(target, Some(&options)).await
    }

    /// Scan with a rules file instead of the configured one
    pub async fn scan_with_rules(
        &self,
        target: impl AsRef<Path>,
        rules_path: impl Into<PathBuf>,
    ) -> Result<ScanResult, ScannerError> {
        let options = ScanOptions {
            static_rules: Some(rules_path.into()),
            ..ScanOptions::default()
        };
        self.scan_directory(target, Some(&options)).await
    }

    /// Write a plugin configuration to a persistent temp file
    /// (`tavo-plugin-<name>-*.json`) and return its path
    pub fn create_plugin_config(&self, plugin_name: &str, config: &Value) -> Result<PathBuf, ScannerError> {
        let file = write_json_temp(&format!("tavo-plugin-{}-", plugin_name), config)?;
        keep(file)
    }

    /// Write rules to a persistent temp file (`tavo-rules-*.json`) and
    /// return its path
    pub fn create_rules_file(&self, rules: &Value) -> Result<PathBuf, ScannerError> {
        let file = write_json_temp("tavo-rules-", rules)?;
        keep(file)
    }
}

fn write_json_temp(prefix: &str, value: &Value) -> Result<NamedTempFile, ScannerError> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".json")
        .tempfile()?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.write_all(b"\n")?;
    file.flush()?;
    Ok(file)
}

fn keep(file: NamedTempFile) -> Result<PathBuf, ScannerError> {
    let (_, path) = file.keep().map_err(|e| ScannerError::Io(e.error))?;
    Ok(path)
}
