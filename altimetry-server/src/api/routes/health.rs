//! `GET /health`, `/ready`, `/live`: ambient health probes (spec §6 — not
//! named by the original distillation, added because every deployed
//! service in this stack exposes them).

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/live", get(live))
}

#[derive(Serialize, ToSchema)]
pub(crate) struct ProbeBody {
    status: &'static str,
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, body = ProbeBody)))]
pub(crate) async fn health() -> Json<ProbeBody> {
    Json(ProbeBody { status: "ok" })
}

/// 200 iff the backing Item Store and Progress Registry both answer a
/// trivial query; 503 otherwise, since a dead backend means the pipeline
/// cannot admit or advance anything.
#[utoipa::path(get, path = "/ready", tag = "health", responses((status = 200, body = ProbeBody), (status = 503, body = ProbeBody)))]
pub(crate) async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ProbeBody>) {
    let store_ok = state.store.items_needing_aliases().await.is_ok();
    let registry_ok = state.registry.get("__readiness_probe__").await.is_ok();

    if store_ok && registry_ok {
        (StatusCode::OK, Json(ProbeBody { status: "ready" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ProbeBody { status: "not ready" }),
        )
    }
}

async fn live() -> Json<ProbeBody> {
    Json(ProbeBody { status: "alive" })
}
