//! `GET /tiid/<ns>/<nid>`: alias lookup (spec §6).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/tiid/:ns/:nid", get(lookup_tiid))
}

/// 303 ("found", mirroring `find_tiid_by_alias`'s single-hit contract) with
/// the tiid in the body if this alias is claimed by an item, 404 otherwise.
#[utoipa::path(
    get,
    path = "/tiid/{ns}/{nid}",
    tag = "item",
    params(("ns" = String, Path), ("nid" = String, Path)),
    responses(
        (status = 303, description = "alias is claimed; body carries the tiid"),
        (status = 404, description = "no item claims this alias"),
    )
)]
pub(crate) async fn lookup_tiid(
    State(state): State<AppState>,
    Path((ns, nid)): Path<(String, String)>,
) -> ApiResult<Response> {
    let ns = altimetry_core::ids::canonical_namespace(&ns);
    let id = altimetry_core::ids::clean_alias_string(&nid);

    let tiid = state
        .store
        .find_tiid_by_alias(&ns, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no item claims alias {ns}:{id}")))?;

    let status = StatusCode::from_u16(303).expect("303 is a valid status code");
    Ok((status, Json(serde_json::json!({ "tiid": tiid }))).into_response())
}
