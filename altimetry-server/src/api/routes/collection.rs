//! `POST /collection`, `GET /collection/<cid>[.json|.csv]`, and
//! `POST /collection/<cid>` (spec §6).

use std::net::SocketAddr;

use altimetry_core::collection::{generate_collection_id, Collection};
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/collection", post(create_collection))
        .route("/collection/:cid", get(get_collection).post(resubmit_collection))
}

#[derive(Debug, Deserialize)]
struct CreateCollectionRequest {
    items: Vec<String>,
    title: String,
}

#[derive(Debug, Serialize)]
struct CollectionResponse {
    cid: String,
    title: String,
    items: Vec<String>,
    created: chrono::DateTime<chrono::Utc>,
    last_modified: chrono::DateTime<chrono::Utc>,
}

impl From<Collection> for CollectionResponse {
    fn from(collection: Collection) -> Self {
        Self {
            cid: collection.cid,
            title: collection.title,
            items: collection.tiids,
            created: collection.created,
            last_modified: collection.last_modified,
        }
    }
}

/// Creates a collection from an explicit tiid list, returning the full
/// document with a fresh 6-character id (§6).
async fn create_collection(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<CreateCollectionRequest>,
) -> ApiResult<Response> {
    let cid = generate_collection_id();
    let collection = Collection::new(
        cid,
        request.title,
        addr.ip().to_string(),
        request.items,
        chrono::Utc::now(),
    );
    state.collections.create(collection.clone()).await?;
    Ok((StatusCode::CREATED, Json(CollectionResponse::from(collection))).into_response())
}

/// Returns the collection with its member tiids embedded, 210 if any
/// member is still updating, 404 if the collection (or, per read-modify-
/// write discipline, any member item) is unknown. A `.csv` suffix on the
/// path switches the body to a flat CSV export instead of JSON (§6).
async fn get_collection(State(state): State<AppState>, Path(cid): Path<String>) -> ApiResult<Response> {
    let (cid, as_csv) = split_format(&cid);
    let collection = state.get_collection(cid).await?;

    let mut any_updating = false;
    let mut items = Vec::with_capacity(collection.tiids.len());
    for tiid in &collection.tiids {
        let item = state.get_item(tiid).await?;
        if state.is_updating(tiid).await? {
            any_updating = true;
        }
        items.push(item);
    }

    let status = if any_updating {
        StatusCode::from_u16(210).expect("210 is a valid status code")
    } else {
        StatusCode::OK
    };

    if as_csv {
        let body = items_to_csv(&items).map_err(|err| ApiError::Internal(err.to_string()))?;
        Ok((
            status,
            [(CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response())
    } else {
        let body = serde_json::json!({
            "cid": collection.cid,
            "title": collection.title,
            "created": collection.created,
            "last_modified": collection.last_modified,
            "items": items.into_iter().map(|item| crate::api::routes::item::ItemResponse::new(item, false)).collect::<Vec<_>>(),
        });
        Ok((status, Json(body)).into_response())
    }
}

/// Re-submits every member tiid to the pipeline (§6).
async fn resubmit_collection(State(state): State<AppState>, Path(cid): Path<String>) -> ApiResult<Response> {
    let collection = state.get_collection(&cid).await?;
    for tiid in &collection.tiids {
        state.resubmit(tiid).await?;
    }
    Ok((StatusCode::OK, Json(serde_json::json!({ "cid": cid }))).into_response())
}

fn split_format(cid: &str) -> (&str, bool) {
    if let Some(stripped) = cid.strip_suffix(".csv") {
        (stripped, true)
    } else if let Some(stripped) = cid.strip_suffix(".json") {
        (stripped, false)
    } else {
        (cid, false)
    }
}

fn items_to_csv(items: &[altimetry_core::item::Item]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["tiid", "genre", "year", "title"])?;
    for item in items {
        let year = item
            .biblio
            .get("year")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let title = item
            .biblio
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let genre = format!("{:?}", item.genre());
        writer.write_record([item.tiid.as_str(), genre.as_str(), year, title])?;
    }
    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}
