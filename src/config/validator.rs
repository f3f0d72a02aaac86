//! Structural configuration validation, run once after the env-var override layer.

use tracing::warn;
use url::Url;

use crate::config::config::{CollectorConfig, RuleLoaderConfig};
use crate::sanitizer::patterns::PatternCatalog;

/// Outcome of validating a resolved configuration. Non-empty `errors` is fatal:
/// the binary must refuse to start.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn can_start(&self) -> bool {
        self.errors.is_empty()
    }

    fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_collector(config: &CollectorConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        if config.grpc_listen_addr.parse::<std::net::SocketAddr>().is_err() {
            result.errors.push(format!("grpc_listen_addr '{}' is not a valid socket address", config.grpc_listen_addr));
        }
        if config.max_body_bytes == 0 {
            result.errors.push("max_body_bytes must be greater than 0".to_string());
        }
        if config.dedup_cache_size == 0 {
            result.errors.push("dedup_cache_size must be greater than 0".to_string());
        }
        if config.staging_channel_depth == 0 {
            result.errors.push("staging_channel_depth must be greater than 0".to_string());
        }
        if config.enqueue_workers == 0 {
            result.errors.push("enqueue_workers must be at least 1".to_string());
        }

        result.merge(Self::validate_sanitizer(config));
        result.merge(Self::validate_queue(&config.queue));

        if config.enqueue_workers > 64 {
            result.warnings.push("enqueue_workers is unusually high (>64); verify this is intentional".to_string());
        }

        result
    }

    pub fn validate_rule_loader(config: &RuleLoaderConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        if Url::parse(&config.mock_server_url).is_err() {
            result.errors.push(format!("mock_server_url '{}' does not parse as a URL", config.mock_server_url));
        }
        if config.workers == 0 {
            result.errors.push("workers must be at least 1".to_string());
        }
        if config.batch_size == 0 {
            result.errors.push("batch_size must be greater than 0".to_string());
        }
        if config.retry_attempts == 0 {
            result.warnings.push("retry_attempts is 0; transient install failures will dead-letter immediately".to_string());
        }

        result.merge(Self::validate_queue(&config.queue));

        result
    }

    fn validate_sanitizer(config: &CollectorConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        match PatternCatalog::compile(&config.sanitizer.patterns) {
            Ok(_) => {}
            Err(e) => result.errors.push(format!("sanitizer pattern catalog is invalid: {}", e)),
        }

        if config.sanitizer.header_denylist.is_empty() {
            result.warnings.push("header_denylist is empty; authorization-shaped headers will only be caught by pattern matching".to_string());
        }

        result
    }

    fn validate_queue(queue: &crate::config::config::QueueConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        if queue.list_name.trim().is_empty() {
            result.errors.push("queue.list_name must not be empty".to_string());
        }
        if queue.dlq_name.trim().is_empty() {
            result.errors.push("queue.dlq_name must not be empty".to_string());
        }
        if queue.list_name == queue.dlq_name {
            result.errors.push("queue.list_name and queue.dlq_name must differ".to_string());
        }
        if redis::parse_redis_url(&queue.endpoint).is_none() {
            result.errors.push(format!("queue.endpoint '{}' is not a valid redis:// URL", queue.endpoint));
        }

        result
    }
}

pub fn log_validation(result: &ValidationResult) {
    for error in &result.errors {
        tracing::error!("configuration error: {}", error);
    }
    for warning in &result.warnings {
        warn!("configuration warning: {}", warning);
    }
}
