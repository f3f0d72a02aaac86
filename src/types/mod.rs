//! Shared data model: the capture a sidecar hands in, its sanitized form, and
//! the mock-rule descriptor that survives onto the Queue.

mod capture;
mod descriptor;
mod fingerprint;

pub use capture::{CaptureRecord, Direction, RequestPart, ResponsePart, SanitizedCapture};
pub use descriptor::{BodyPredicate, DescriptorMetadata, MatchBlock, MockRuleDescriptor, ResponseBlock};
pub use fingerprint::Fingerprint;

/// Body size cap applied at ingest. Bodies larger than this are truncated and flagged;
/// downstream treats truncated bodies as opaque binary.
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024;
