//! Three-layer configuration resolution: built-in defaults, optional YAML file,
//! environment variable overrides, in that order of increasing precedence.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::config::{CollectorConfig, RuleLoaderConfig};
use crate::config::environment::EnvironmentOverrides;
use crate::config::validator::{ConfigValidator, ValidationResult};
use crate::error::{CaptureError, Result};

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// The fully resolved configuration plus enough provenance to render a startup banner.
pub struct Resolution<C> {
    pub config: C,
    pub config_path: Option<PathBuf>,
    pub env_overrides: EnvironmentOverrides,
    pub validation: ValidationResult,
}

fn resolve_config_path(cli_path: Option<&Path>, env_overrides: &EnvironmentOverrides) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }
    if let Some(ref path) = env_overrides.config_path {
        return Some(PathBuf::from(path));
    }
    let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        Some(default_path)
    } else {
        None
    }
}

fn load_yaml<C: serde::de::DeserializeOwned + Default>(path: Option<&Path>) -> Result<C> {
    match path {
        Some(path) if path.exists() => {
            info!("loading configuration from {:?}", path);
            let content = std::fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&content)?)
        }
        Some(path) => Err(CaptureError::config(format!("configured path {:?} does not exist", path))),
        None => {
            info!("no configuration file found; using built-in defaults");
            Ok(C::default())
        }
    }
}

pub fn resolve_collector(cli_config_path: Option<&Path>) -> Result<Resolution<CollectorConfig>> {
    let env_overrides = EnvironmentOverrides::load();
    let config_path = resolve_config_path(cli_config_path, &env_overrides);
    let mut config: CollectorConfig = load_yaml(config_path.as_deref())?;

    env_overrides.apply_to_collector(&mut config);
    debug!(overrides = ?env_overrides.active_names(), "applied environment overrides");

    let validation = ConfigValidator::validate_collector(&config);
    Ok(Resolution { config, config_path, env_overrides, validation })
}

pub fn resolve_rule_loader(cli_config_path: Option<&Path>) -> Result<Resolution<RuleLoaderConfig>> {
    let env_overrides = EnvironmentOverrides::load();
    let config_path = resolve_config_path(cli_config_path, &env_overrides);
    let mut config: RuleLoaderConfig = load_yaml(config_path.as_deref())?;

    env_overrides.apply_to_rule_loader(&mut config);
    debug!(overrides = ?env_overrides.active_names(), "applied environment overrides");

    let validation = ConfigValidator::validate_rule_loader(&config);
    Ok(Resolution { config, config_path, env_overrides, validation })
}
