//! Error handling module for the capture pipeline.

mod error;

pub use error::{CaptureError, InstallErrorKind, Result};
