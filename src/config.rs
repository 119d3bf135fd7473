//! Configuration management module

use crate::error::{RegistryError, Result};
use crate::registry::{Dialect, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What to do when part of an inventory cannot be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the whole comparison on the first failure
    #[default]
    FailFast,
    /// Record failures, treat the affected listing as empty, and keep going
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Comparison settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub source_dialect: Dialect,
    pub target_dialect: Dialect,
    /// Maximum number of repositories whose tags are fetched at once
    pub concurrency: usize,
    /// Per-request timeout in seconds
    pub timeout: u64,
    /// Overall deadline in seconds for the whole comparison
    pub deadline: Option<u64>,
    pub retry: RetryPolicy,
    pub failure_policy: FailurePolicy,
    pub output: OutputFormat,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            source_dialect: Dialect::V1,
            target_dialect: Dialect::V2,
            concurrency: 8,
            timeout: 30,
            deadline: None,
            retry: RetryPolicy::default(),
            failure_policy: FailurePolicy::FailFast,
            output: OutputFormat::Text,
        }
    }
}

impl CompareConfig {
    /// Load settings from a JSON file; omitted keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            RegistryError::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// Override settings from `REGISTRY_COMPARE_*` variables.
    ///
    /// `lookup` resolves a variable name, normally `std::env::var(..).ok()`.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(name: &str, value: String) -> Result<T> {
            value.trim().parse().map_err(|_| {
                RegistryError::Config(format!("{} has an invalid value: {}", name, value))
            })
        }

        if let Some(value) = lookup("REGISTRY_COMPARE_CONCURRENCY") {
            self.concurrency = parse("REGISTRY_COMPARE_CONCURRENCY", value)?;
        }
        if let Some(value) = lookup("REGISTRY_COMPARE_TIMEOUT") {
            self.timeout = parse("REGISTRY_COMPARE_TIMEOUT", value)?;
        }
        if let Some(value) = lookup("REGISTRY_COMPARE_DEADLINE") {
            self.deadline = Some(parse("REGISTRY_COMPARE_DEADLINE", value)?);
        }
        if let Some(value) = lookup("REGISTRY_COMPARE_RETRY") {
            self.retry.max_attempts = parse("REGISTRY_COMPARE_RETRY", value)?;
        }
        if let Some(value) = lookup("REGISTRY_COMPARE_BEST_EFFORT") {
            if parse_flag("REGISTRY_COMPARE_BEST_EFFORT", &value)? {
                self.failure_policy = FailurePolicy::BestEffort;
            }
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(RegistryError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }
        if self.timeout == 0 {
            return Err(RegistryError::Config(
                "Timeout must be greater than 0".to_string(),
            ));
        }
        if self.deadline == Some(0) {
            return Err(RegistryError::Config(
                "Deadline must be greater than 0".to_string(),
            ));
        }
        self.retry.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline.map(Duration::from_secs)
    }
}

/// Boolean environment switch; empty counts as off
fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RegistryError::Config(format!(
            "{} must be a boolean, got: {}",
            name, value
        ))),
    }
}
