//! `POST /item/<ns>/<nid>` and `GET /item/<tiid>` (spec §6).

use altimetry_core::item::Item;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/item/:ns/:nid", post(create_item))
        .route("/item/:tiid", get(get_item))
}

/// The wire representation of an item: the stored document plus the
/// `currently_updating` flag that mirrors the poll status code (§6, Poll
/// semantics).
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub tiid: String,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub genre: altimetry_core::item::Genre,
    pub aliases: BTreeMap<String, Vec<String>>,
    pub biblio: BTreeMap<String, serde_json::Value>,
    pub metrics: BTreeMap<String, altimetry_core::metric::MetricRecord>,
    pub currently_updating: bool,
}

impl ItemResponse {
    pub fn new(item: Item, currently_updating: bool) -> Self {
        let aliases = item
            .aliases
            .namespaces()
            .map(|ns| (ns.to_string(), item.aliases.ids_for(ns).to_vec()))
            .collect();
        Self {
            genre: item.genre(),
            tiid: item.tiid,
            created: item.created,
            last_modified: item.last_modified,
            aliases,
            biblio: item.biblio,
            metrics: item.metrics,
            currently_updating,
        }
    }
}

/// Idempotent create: cleans the alias, coalesces against any existing
/// item, admits a fresh one onto the pipeline otherwise, and always
/// returns 201 with the resolved tiid (§6).
#[utoipa::path(
    post,
    path = "/item/{ns}/{nid}",
    tag = "item",
    params(("ns" = String, Path), ("nid" = String, Path)),
    responses((status = 201, description = "created or coalesced; body carries the resolved tiid"))
)]
pub(crate) async fn create_item(
    State(state): State<AppState>,
    Path((ns, nid)): Path<(String, String)>,
) -> ApiResult<Response> {
    let tiid = state.intake(&ns, &nid).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "tiid": tiid }))).into_response())
}

/// 200 with the full document if the item is up to date, 210 ("still
/// updating", non-standard) if the Progress Registry is positive, 404 if
/// unknown (§6, Poll semantics).
#[utoipa::path(
    get,
    path = "/item/{tiid}",
    tag = "item",
    params(("tiid" = String, Path)),
    responses(
        (status = 200, description = "up to date"),
        (status = 210, description = "still updating"),
        (status = 404, description = "unknown tiid"),
    )
)]
pub(crate) async fn get_item(State(state): State<AppState>, Path(tiid): Path<String>) -> ApiResult<Response> {
    let item = state.get_item(&tiid).await?;
    let updating = state.is_updating(&tiid).await?;
    let body = Json(ItemResponse::new(item, updating));

    let status = if updating {
        StatusCode::from_u16(210).expect("210 is a valid status code")
    } else {
        StatusCode::OK
    };
    Ok((status, body).into_response())
}
