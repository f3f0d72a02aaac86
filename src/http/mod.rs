//! The control-plane HTTP listener shared by both binaries: `/health`,
//! `/ready`, and `/metrics`, independent of the gRPC ingest path or the Rule
//! Loader's install loop.

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

/// Implemented by [`crate::collector::CollectorHealth`] and
/// [`crate::rule_loader::RuleLoaderHealth`] so both binaries can share one
/// control-plane server.
pub trait HealthSource: Send + Sync + Clone + 'static {
    /// True once startup configuration validation and the initial Queue
    /// connection have both succeeded.
    fn is_ready(&self) -> bool;
    /// True while the process is in a retry-exhaustion / degraded state.
    fn is_degraded(&self) -> bool;
}

struct ControlPlaneState<H: HealthSource> {
    health: H,
    prometheus: PrometheusHandle,
}

async fn health_handler<H: HealthSource>(state: web::Data<ControlPlaneState<H>>) -> HttpResponse {
    if state.health.is_degraded() {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({ "status": "degraded" }))
    } else {
        HttpResponse::Ok().json(serde_json::json!({ "status": "healthy" }))
    }
}

async fn ready_handler<H: HealthSource>(state: web::Data<ControlPlaneState<H>>) -> HttpResponse {
    if state.health.is_ready() {
        HttpResponse::Ok().json(serde_json::json!({ "status": "ready" }))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({ "status": "starting" }))
    }
}

async fn metrics_handler<H: HealthSource>(state: web::Data<ControlPlaneState<H>>) -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain; version=0.0.4").body(state.prometheus.render())
}

/// Bind and serve `/health`, `/ready`, `/metrics` on `listen_addr` until the
/// process exits. Runs for the lifetime of the binary; callers `tokio::spawn`
/// it alongside the gRPC server or Rule Loader worker pool.
pub async fn serve<H: HealthSource>(listen_addr: &str, health: H, prometheus: PrometheusHandle) -> std::io::Result<()> {
    info!(%listen_addr, "control-plane HTTP listener starting");
    let state = web::Data::new(ControlPlaneState { health, prometheus });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .route("/health", web::get().to(health_handler::<H>))
            .route("/ready", web::get().to(ready_handler::<H>))
            .route("/metrics", web::get().to(metrics_handler::<H>))
    })
    .bind(listen_addr)?
    .run()
    .await
}
