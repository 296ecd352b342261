//! Configuration loading and management

use crate::core::error::{ConfigError, HubError, HubResult};
use serde::{Deserialize, Serialize};

/// Complete configuration for the hub
///
/// Loaded from a YAML file or built in code. Only `auth.jwt_secret` has no
/// default.
///
/// ```yaml
/// bind_addr: "0.0.0.0:8080"
/// ws_path: "/ws"
/// auth:
///   jwt_secret: "change-me"
///   leeway_seconds: 60
/// pending_notification_limit: 10
/// presence_queue_capacity: 256
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Address the server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Path of the WebSocket upgrade endpoint
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Handshake verification settings
    pub auth: AuthConfig,

    /// Maximum notifications fetched for the reconnection backfill
    #[serde(default = "default_pending_limit")]
    pub pending_notification_limit: usize,

    /// Queue size for the best-effort presence writer
    #[serde(default = "default_presence_queue_capacity")]
    pub presence_queue_capacity: usize,
}

/// Handshake verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 secret of the identity provider
    pub jwt_secret: String,

    /// Expiry leeway in seconds applied during verification
    #[serde(default = "default_leeway_seconds")]
    pub leeway_seconds: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_pending_limit() -> usize {
    10
}

fn default_presence_queue_capacity() -> usize {
    256
}

fn default_leeway_seconds() -> u64 {
    60
}

impl HubConfig {
    /// Build a configuration with defaults around the given JWT secret
    pub fn with_secret(jwt_secret: &str) -> Self {
        Self {
            bind_addr: default_bind_addr(),
            ws_path: default_ws_path(),
            auth: AuthConfig {
                jwt_secret: jwt_secret.to_string(),
                leeway_seconds: default_leeway_seconds(),
            },
            pending_notification_limit: default_pending_limit(),
            presence_queue_capacity: default_presence_queue_capacity(),
        }
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> HubResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HubError::Config(ConfigError::FileNotFound {
                    path: path.to_string(),
                })
            } else {
                e.into()
            }
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            HubError::Config(ConfigError::ParseError {
                file: Some(path.to_string()),
                message: e.to_string(),
            })
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> HubResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot start with
    pub fn validate(&self) -> HubResult<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "auth.jwt_secret".to_string(),
                value: String::new(),
                message: "secret must not be empty".to_string(),
            }
            .into());
        }
        if !self.ws_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "ws_path".to_string(),
                value: self.ws_path.clone(),
                message: "path must start with '/'".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
