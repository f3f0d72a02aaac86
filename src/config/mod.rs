//! Configuration loading for the Collector and Rule Loader binaries: typed structs,
//! YAML file + environment-variable layering, and startup validation.

pub mod config;
pub mod environment;
pub mod resolver;
pub mod validator;

pub use config::{CollectorConfig, LoggingConfig, QueueConfig, RuleLoaderConfig, SanitizerConfig, ServerConfig};
pub use environment::EnvironmentOverrides;
pub use resolver::{resolve_collector, resolve_rule_loader, Resolution};
pub use validator::{ConfigValidator, ValidationResult};
