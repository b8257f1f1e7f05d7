//! Callback configuration for the simulator.
//!
//! Defines callback specifications, authentication, and the served event
//! record handed over by the host stubbing server.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A batch of callback specifications attached to one stub mapping.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CallbackConfig {
    /// List of callback definitions
    #[serde(default)]
    pub callbacks: Vec<Callback>,
}

impl CallbackConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Decode the JSON configuration blob the host server attaches to a stub.
    pub fn from_value(value: serde_json::Value) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (i, callback) in self.callbacks.iter().enumerate() {
            callback
                .validate()
                .map_err(|e| anyhow::anyhow!("Callback {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// A single outbound-notification specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Callback {
    /// Target URL; may itself be a placeholder expression
    pub url: String,

    /// Delay before dispatch in milliseconds, measured from scheduling time
    #[serde(default)]
    pub delay_ms: u64,

    /// Payload template; placeholders are resolved at any depth
    #[serde(default)]
    pub data: serde_json::Value,

    /// Correlation token carried on the delivery; generated when absent
    #[serde(default)]
    pub trace_id: Option<String>,

    /// Credentials attached to the delivery
    #[serde(default)]
    pub authentication: Option<Authentication>,
}

impl Callback {
    /// Validate the callback definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.is_empty() {
            anyhow::bail!("Callback url cannot be empty");
        }
        Ok(())
    }
}

/// Authentication attached to a callback delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Authentication {
    /// HTTP Basic credentials, sent pre-emptively with the first request
    Basic { username: String, password: String },
}

/// A completed request/response exchange produced by the host server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServedEvent {
    /// Request URL (path, optionally with a query string)
    pub url: String,

    /// Raw request body, if any
    #[serde(default)]
    pub request_body: Option<String>,

    /// Raw response body, if any
    #[serde(default)]
    pub response_body: Option<String>,
}
