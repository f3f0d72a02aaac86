//! Startup banner: reports the resolved configuration (file or defaults,
//! active environment overrides, validation outcome) once per binary, before
//! the gRPC or install-worker listeners come up. Plain text, no decoration —
//! operators grep startup logs, they don't read them as a UI.

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LoggingConfig, Resolution, ValidationResult};

/// Install the global `tracing` subscriber. `RUST_LOG` takes precedence over
/// `logging.level` when set; `logging.json` switches the formatter from
/// human-readable to newline-delimited JSON for log aggregators.
pub fn init_logging(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

/// Render the startup banner for a resolved configuration of either binary.
///
/// `binary_name` is the process name (`meshcap-collector` or
/// `meshcap-rule-loader`); `listen_addrs` are the addresses this process will
/// bind, in display order (e.g. `[("grpc", addr), ("control-plane", addr)]`).
pub fn display_startup_info<C>(binary_name: &str, version: &str, resolution: &Resolution<C>, listen_addrs: &[(&str, &str)]) {
    info!("{} v{} starting", binary_name, version);

    match &resolution.config_path {
        Some(path) => info!(config_file = %path.display(), "configuration loaded from file"),
        None => info!("no configuration file found; using built-in defaults"),
    }

    if resolution.env_overrides.has_overrides() {
        for name in resolution.env_overrides.active_names() {
            info!(env_var = name, "environment override active");
        }
    }

    for (label, addr) in listen_addrs {
        info!(listener = label, address = addr, "will bind");
    }

    display_validation_results(&resolution.validation);

    if resolution.validation.can_start() {
        info!("{} started successfully", binary_name);
    } else {
        warn!("{} configuration validation failed; refusing to start", binary_name);
    }
}

fn display_validation_results(validation: &ValidationResult) {
    for error in &validation.errors {
        tracing::error!(%error, "configuration error");
    }
    for warning in &validation.warnings {
        warn!(%warning, "configuration warning");
    }
    if validation.errors.is_empty() && validation.warnings.is_empty() {
        info!("configuration validation passed with no issues");
    }
}
