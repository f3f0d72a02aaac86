//! Generated protobuf types and the `CaptureIngest` service implementation.

pub mod convert;
pub mod server;

/// Generated from `proto/capture.proto` by `build.rs`.
pub mod pb {
    tonic::include_proto!("meshcap.capture.v1");
}

pub use server::CaptureIngestService;
