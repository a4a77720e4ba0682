//! `GET /metrics`: Prometheus exposition (spec §6, ambient stack).

use axum::{routing::get, Router};

use crate::metrics::metrics_handler;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}
