//! Prometheus exposition (spec §6, `GET /metrics`): HTTP request counters
//! plus queue depth and in-flight item gauges sampled from the pipeline's
//! backing services on every scrape.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{header::CONTENT_TYPE, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::ApiError;
use crate::state::AppState;

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static HTTP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .expect("valid http_requests_total counter config");

    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("register http_requests_total in the global Registry");

    counter
});

/// Middleware that increments `http_requests_total` for every request.
pub async fn track_http_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let matched_path: String = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS
        .with_label_values(&[method.as_str(), matched_path.as_str(), status.as_str()])
        .inc();

    response
}

/// `GET /metrics`: HTTP counters plus live queue-depth gauges sampled from
/// the Work Queue for every roster provider/phase pair.
pub async fn metrics_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let queue_depth = prometheus::IntGaugeVec::new(
        Opts::new(
            "altimetry_queue_depth",
            "Current Work Queue depth, by queue name",
        ),
        &["queue"],
    )
    .expect("valid altimetry_queue_depth gauge config");

    for entry in state.pipeline.orchestrator.roster().entries() {
        for phase in [
            altimetry_core::provider::Phase::Aliases,
            altimetry_core::provider::Phase::Biblio,
            altimetry_core::provider::Phase::Metrics,
        ] {
            let queue_name = altimetry_pipeline::provider_phase_queue(entry.provider.name(), phase);
            if let Ok(size) = state.queue.size(&queue_name).await {
                queue_depth
                    .with_label_values(&[queue_name.as_str()])
                    .set(size as i64);
            }
        }
    }
    if let Ok(size) = state.queue.size(altimetry_pipeline::ALIASES_QUEUE).await {
        queue_depth
            .with_label_values(&[altimetry_pipeline::ALIASES_QUEUE])
            .set(size as i64);
    }

    let scrape_registry = Registry::new();
    scrape_registry
        .register(Box::new(queue_depth))
        .map_err(|err| ApiError::Internal(format!("failed to register scrape gauges: {err}")))?;

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|err| ApiError::Internal(format!("failed to encode metrics: {err}")))?;
    encoder
        .encode(&scrape_registry.gather(), &mut buffer)
        .map_err(|err| ApiError::Internal(format!("failed to encode metrics: {err}")))?;

    let body = String::from_utf8(buffer)
        .map_err(|err| ApiError::Internal(format!("metrics buffer is not UTF-8: {err}")))?;

    Ok((
        [(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        body,
    ))
}
