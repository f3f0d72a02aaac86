//! Typed configuration for the Collector and Rule Loader binaries.

use std::collections::BTreeMap;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::sanitizer::patterns::{PatternCatalog, PatternConfig};
use crate::types::DEFAULT_MAX_BODY_BYTES;

fn default_grpc_listen_addr() -> String {
    "0.0.0.0:7443".to_string()
}

fn default_control_plane_listen_addr() -> String {
    "0.0.0.0:9090".to_string()
}

/// Control-plane HTTP listener shared by both binaries (`/health`, `/ready`, `/metrics`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { listen_addr: default_control_plane_listen_addr() }
    }
}

/// The redaction catalog and deny-lists the Sanitizer applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub patterns: Vec<PatternConfig>,
    pub header_denylist: Vec<String>,
    pub field_name_denylist: Vec<String>,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            patterns: PatternCatalog::default_configs(),
            header_denylist: PatternCatalog::default_header_denylist(),
            field_name_denylist: PatternCatalog::default_field_name_denylist(),
        }
    }
}

/// Connection details for the Redis-backed Queue, shared by Collector and Rule Loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub endpoint: String,
    pub password: Option<SecretString>,
    pub list_name: String,
    pub dlq_name: String,
    pub push_retry_attempts: u32,
    pub push_timeout_secs: u64,
    pub pop_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            endpoint: "redis://127.0.0.1:6379".to_string(),
            password: None,
            list_name: "wiremock_mappings".to_string(),
            dlq_name: "wiremock_mappings_dlq".to_string(),
            push_retry_attempts: 5,
            push_timeout_secs: 5,
            pop_timeout_secs: 2,
        }
    }
}

/// `tracing` / `tracing-subscriber` setup shared by both binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

fn default_staging_channel_depth() -> usize {
    1024
}

fn default_enqueue_workers() -> usize {
    5
}

fn default_enqueue_timeout_secs() -> u64 {
    2
}

fn default_dedup_cache_size() -> usize {
    10_000
}

fn default_dedup_body_limit() -> usize {
    1024
}

/// Full configuration for `meshcap-collector`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub grpc_listen_addr: String,
    pub control_plane: ServerConfig,
    pub max_body_bytes: usize,
    pub sanitizer: SanitizerConfig,
    #[serde(default = "default_dedup_cache_size")]
    pub dedup_cache_size: usize,
    #[serde(default = "default_dedup_body_limit")]
    pub dedup_body_limit: usize,
    #[serde(default = "default_staging_channel_depth")]
    pub staging_channel_depth: usize,
    #[serde(default = "default_enqueue_workers")]
    pub enqueue_workers: usize,
    #[serde(default = "default_enqueue_timeout_secs")]
    pub enqueue_timeout_secs: u64,
    pub queue: QueueConfig,
    pub logging: LoggingConfig,
    /// Extra labels attached to every capture's `source_labels` by this Collector
    /// instance (e.g. cluster name), merged under whatever the sidecar already sent.
    pub static_source_labels: BTreeMap<String, String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            grpc_listen_addr: default_grpc_listen_addr(),
            control_plane: ServerConfig::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            sanitizer: SanitizerConfig::default(),
            dedup_cache_size: default_dedup_cache_size(),
            dedup_body_limit: default_dedup_body_limit(),
            staging_channel_depth: default_staging_channel_depth(),
            enqueue_workers: default_enqueue_workers(),
            enqueue_timeout_secs: default_enqueue_timeout_secs(),
            queue: QueueConfig::default(),
            logging: LoggingConfig::default(),
            static_source_labels: BTreeMap::new(),
        }
    }
}

impl CollectorConfig {
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_secs(self.enqueue_timeout_secs)
    }
}

fn default_rule_loader_workers() -> usize {
    3
}

fn default_rule_loader_batch_size() -> usize {
    10
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_mock_server_timeout_secs() -> u64 {
    30
}

/// Full configuration for `meshcap-rule-loader`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleLoaderConfig {
    pub control_plane: ServerConfig,
    pub queue: QueueConfig,
    pub mock_server_url: String,
    #[serde(default = "default_mock_server_timeout_secs")]
    pub mock_server_timeout_secs: u64,
    pub mock_server_auth_token: Option<SecretString>,
    #[serde(default = "default_rule_loader_workers")]
    pub workers: usize,
    #[serde(default = "default_rule_loader_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    pub backup_sink_path: Option<String>,
    pub logging: LoggingConfig,
}

impl Default for RuleLoaderConfig {
    fn default() -> Self {
        Self {
            control_plane: ServerConfig { listen_addr: "0.0.0.0:9091".to_string() },
            queue: QueueConfig::default(),
            mock_server_url: "http://127.0.0.1:8080".to_string(),
            mock_server_timeout_secs: default_mock_server_timeout_secs(),
            mock_server_auth_token: None,
            workers: default_rule_loader_workers(),
            batch_size: default_rule_loader_batch_size(),
            retry_attempts: default_retry_attempts(),
            backup_sink_path: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl RuleLoaderConfig {
    pub fn mock_server_timeout(&self) -> Duration {
        Duration::from_secs(self.mock_server_timeout_secs)
    }
}
