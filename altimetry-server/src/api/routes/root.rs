//! `GET /`: version banner (spec §6).

use axum::{routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(version_banner))
}

#[derive(Serialize, ToSchema)]
pub(crate) struct VersionBanner {
    name: &'static str,
    version: &'static str,
}

#[utoipa::path(get, path = "/", tag = "root", responses((status = 200, body = VersionBanner)))]
pub(crate) async fn version_banner() -> Json<VersionBanner> {
    Json(VersionBanner {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}
