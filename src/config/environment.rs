//! Environment variable overrides, applied after the YAML file and before validation.

use std::env;

use secrecy::SecretString;
use tracing::debug;

use crate::config::config::{CollectorConfig, RuleLoaderConfig};

/// Environment variable names recognized by both binaries.
pub struct EnvVars;

impl EnvVars {
    pub const CONFIG_PATH: &'static str = "MESHCAP_CONFIG_PATH";
    pub const LOG_LEVEL: &'static str = "MESHCAP_LOG_LEVEL";
    pub const GRPC_LISTEN_ADDR: &'static str = "MESHCAP_GRPC_LISTEN_ADDR";
    pub const CONTROL_PLANE_LISTEN_ADDR: &'static str = "MESHCAP_CONTROL_PLANE_LISTEN_ADDR";
    pub const QUEUE_ENDPOINT: &'static str = "MESHCAP_QUEUE_ENDPOINT";
    pub const QUEUE_PASSWORD: &'static str = "MESHCAP_QUEUE_PASSWORD";
    pub const MOCK_SERVER_URL: &'static str = "MESHCAP_MOCK_SERVER_URL";
    pub const MOCK_SERVER_AUTH_TOKEN: &'static str = "MESHCAP_MOCK_SERVER_AUTH_TOKEN";
}

/// Environment overrides captured once at startup, independent of which binary applies them.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentOverrides {
    pub config_path: Option<String>,
    pub log_level: Option<String>,
    pub grpc_listen_addr: Option<String>,
    pub control_plane_listen_addr: Option<String>,
    pub queue_endpoint: Option<String>,
    pub queue_password: Option<String>,
    pub mock_server_url: Option<String>,
    pub mock_server_auth_token: Option<String>,
}

impl EnvironmentOverrides {
    pub fn load() -> Self {
        let mut overrides = Self::default();

        overrides.config_path = env::var(EnvVars::CONFIG_PATH).ok();
        overrides.log_level = env::var(EnvVars::LOG_LEVEL).ok();
        overrides.grpc_listen_addr = env::var(EnvVars::GRPC_LISTEN_ADDR).ok();
        overrides.control_plane_listen_addr = env::var(EnvVars::CONTROL_PLANE_LISTEN_ADDR).ok();
        overrides.queue_endpoint = env::var(EnvVars::QUEUE_ENDPOINT).ok();
        overrides.queue_password = env::var(EnvVars::QUEUE_PASSWORD).ok();
        overrides.mock_server_url = env::var(EnvVars::MOCK_SERVER_URL).ok();
        overrides.mock_server_auth_token = env::var(EnvVars::MOCK_SERVER_AUTH_TOKEN).ok();

        for name in overrides.active_names() {
            debug!("environment override active: {}", name);
        }

        overrides
    }

    pub fn has_overrides(&self) -> bool {
        !self.active_names().is_empty()
    }

    pub fn active_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.config_path.is_some() { names.push(EnvVars::CONFIG_PATH); }
        if self.log_level.is_some() { names.push(EnvVars::LOG_LEVEL); }
        if self.grpc_listen_addr.is_some() { names.push(EnvVars::GRPC_LISTEN_ADDR); }
        if self.control_plane_listen_addr.is_some() { names.push(EnvVars::CONTROL_PLANE_LISTEN_ADDR); }
        if self.queue_endpoint.is_some() { names.push(EnvVars::QUEUE_ENDPOINT); }
        if self.queue_password.is_some() { names.push(EnvVars::QUEUE_PASSWORD); }
        if self.mock_server_url.is_some() { names.push(EnvVars::MOCK_SERVER_URL); }
        if self.mock_server_auth_token.is_some() { names.push(EnvVars::MOCK_SERVER_AUTH_TOKEN); }
        names
    }

    pub fn apply_to_collector(&self, config: &mut CollectorConfig) {
        if let Some(ref v) = self.log_level {
            config.logging.level = v.clone();
        }
        if let Some(ref v) = self.grpc_listen_addr {
            config.grpc_listen_addr = v.clone();
        }
        if let Some(ref v) = self.control_plane_listen_addr {
            config.control_plane.listen_addr = v.clone();
        }
        if let Some(ref v) = self.queue_endpoint {
            config.queue.endpoint = v.clone();
        }
        if let Some(ref v) = self.queue_password {
            config.queue.password = Some(SecretString::new(v.clone()));
        }
    }

    pub fn apply_to_rule_loader(&self, config: &mut RuleLoaderConfig) {
        if let Some(ref v) = self.log_level {
            config.logging.level = v.clone();
        }
        if let Some(ref v) = self.control_plane_listen_addr {
            config.control_plane.listen_addr = v.clone();
        }
        if let Some(ref v) = self.queue_endpoint {
            config.queue.endpoint = v.clone();
        }
        if let Some(ref v) = self.queue_password {
            config.queue.password = Some(SecretString::new(v.clone()));
        }
        if let Some(ref v) = self.mock_server_url {
            config.mock_server_url = v.clone();
        }
        if let Some(ref v) = self.mock_server_auth_token {
            config.mock_server_auth_token = Some(SecretString::new(v.clone()));
        }
    }
}
