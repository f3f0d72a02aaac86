//! The `CaptureIngest` gRPC service: a sidecar tap opens one long-lived stream
//! and sends one `CaptureRecord` per observed request/response pair; each is
//! acknowledged independently and in order as it clears the pipeline.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, warn};

use crate::collector::Collector;
use crate::grpc::convert;
use crate::grpc::pb::{capture_ingest_server::CaptureIngest, CaptureAck, CaptureRecord};

pub struct CaptureIngestService {
    collector: Arc<Collector>,
}

impl CaptureIngestService {
    pub fn new(collector: Arc<Collector>) -> Self {
        Self { collector }
    }
}

#[tonic::async_trait]
impl CaptureIngest for CaptureIngestService {
    type IngestCapturesStream = Pin<Box<dyn Stream<Item = Result<CaptureAck, Status>> + Send + 'static>>;

    async fn ingest_captures(
        &self,
        request: Request<Streaming<CaptureRecord>>,
    ) -> Result<Response<Self::IngestCapturesStream>, Status> {
        debug!("capture ingest stream opened");
        let mut incoming = request.into_inner();
        let collector = self.collector.clone();

        let stream = async_stream::stream! {
            while let Some(message) = incoming.next().await {
                let wire_record = match message {
                    Ok(record) => record,
                    Err(status) => {
                        warn!(error = %status, "capture ingest stream read error");
                        yield Err(status);
                        continue;
                    }
                };

                let started = Instant::now();
                let ack = match convert::from_wire(wire_record) {
                    Ok(record) => {
                        let outcome = collector.pipeline.process(record).await;
                        convert::ack_for(&outcome)
                    }
                    Err(e) => {
                        warn!(error = %e, "rejecting malformed capture record");
                        crate::metrics::record_request("validation_error");
                        CaptureAck { accepted: false, duplicate: false, dropped_reason: "validation".to_string() }
                    }
                };

                // `collector_requests_total` is recorded once per capture, at the
                // point the status is decided: `Pipeline::process` records
                // accepted/duplicate/validation_error/backpressure/leak for anything
                // that reaches it; the wire-level rejection above records its own
                // validation_error. Nothing further to count here.
                crate::metrics::record_request_duration(started.elapsed());

                yield Ok(ack);
            }
            debug!("capture ingest stream closed");
        };

        Ok(Response::new(Box::pin(stream) as Self::IngestCapturesStream))
    }
}
