//! Startup-time reporting, independent of the config/validation logic itself.

pub mod logger;

pub use logger::{display_startup_info, init_logging};
