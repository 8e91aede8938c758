//! Host configuration
//!
//! A JSON file carrying the default security policy, default sandbox quotas
//! and an optional audit log destination. Missing fields fall back to their
//! defaults, so a partial file such as `{"default_policy": "standard"}` is
//! valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use warden_api::{SandboxConfig, SecurityPolicy};

use crate::audit::{AuditError, AuditSink, FileAuditSink, NullAuditSink};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidValue(String),

    #[error("Failed to open audit log: {0}")]
    Audit(#[from] AuditError),
}

/// Settings applied to every plugin the manager creates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub default_policy: SecurityPolicy,
    pub sandbox: SandboxConfig,
    /// JSONL file the audit log is flushed to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<PathBuf>,
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_policy(mut self, policy: SecurityPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn with_sandbox(mut self, sandbox: SandboxConfig) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_audit_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_log = Some(path.into());
        self
    }

    /// `<config dir>/<app_name>/warden.json`
    pub fn default_path(app_name: &str) -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(app_name)
            .join("warden.json")
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: HostConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`HostConfig::load`], but a missing file yields the defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reject quotas that would make every plugin unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sandbox.max_memory == 0 {
            return Err(ConfigError::InvalidValue(
                "sandbox.max_memory must be greater than zero".into(),
            ));
        }
        if self.sandbox.max_execution_time_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "sandbox.max_execution_time_ms must be greater than zero".into(),
            ));
        }
        if self.sandbox.max_recursion_depth == 0 {
            return Err(ConfigError::InvalidValue(
                "sandbox.max_recursion_depth must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Open the configured audit destination
    pub fn audit_sink(&self) -> Result<Box<dyn AuditSink>, ConfigError> {
        match &self.audit_log {
            Some(path) => Ok(Box::new(FileAuditSink::new(path)?)),
            None => Ok(Box::new(NullAuditSink)),
        }
    }
}
