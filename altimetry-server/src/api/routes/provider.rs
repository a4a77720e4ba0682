//! `GET /provider`, `POST /provider/<name>/memberitems`, and
//! `GET /provider/<name>/memberitems/<handle>` (spec §6).

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, MemberItemsJob};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/provider", get(list_providers))
        .route("/provider/:name/memberitems", post(start_memberitems))
        .route(
            "/provider/:name/memberitems/:handle",
            get(poll_memberitems),
        )
}

async fn list_providers(State(state): State<AppState>) -> Json<Vec<crate::state::ProviderMetadata>> {
    Json(state.provider_roster_metadata())
}

/// Starts an async "list member aliases" job for one provider over an
/// uploaded query file, keyed by the MD5 of the file's bytes so
/// resubmitting the same query returns the same handle (§6).
async fn start_memberitems(
    State(state): State<AppState>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let provider = state
        .pipeline
        .orchestrator
        .roster()
        .entries()
        .iter()
        .find(|entry| entry.provider.name() == name)
        .map(|entry| entry.provider.clone())
        .ok_or_else(|| ApiError::NotFound(format!("unknown provider {name}")))?;

    let mut bytes: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        if field.name() == Some("file") {
            bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::BadRequest(err.to_string()))?
                    .to_vec(),
            );
        }
    }
    let bytes = bytes.ok_or_else(|| ApiError::BadRequest("missing multipart field 'file'".to_string()))?;

    let handle = hex::encode(md5::compute(&bytes).0);

    if state.member_items_jobs.contains_key(&handle) {
        return Ok((StatusCode::CREATED, Json(serde_json::json!({ "handle": handle }))).into_response());
    }
    state.member_items_jobs.insert(handle.clone(), MemberItemsJob::Pending);

    spawn_memberitems_job(state.clone(), provider, handle.clone(), bytes);

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "handle": handle }))).into_response())
}

fn spawn_memberitems_job(
    state: AppState,
    provider: Arc<dyn altimetry_core::provider::ProviderAdapter>,
    handle: String,
    query: Vec<u8>,
) {
    tokio::spawn(async move {
        let result = member_aliases(provider, &query).await;
        let outcome = match result {
            Ok(aliases) => MemberItemsJob::Done(aliases),
            Err(err) => {
                warn!(handle, error = %err, "memberitems job failed");
                MemberItemsJob::Failed(err)
            }
        };
        state.member_items_jobs.insert(handle, outcome);
    });
}

/// Providers expose no "list members" operation on the core interface
/// (spec §4.5, "Non-goals" excludes site-specific member listing from the
/// core); this parses the uploaded query as newline-separated `ns:id`
/// pairs, the simplest format every provider roster entry can answer
/// without a dedicated capability.
async fn member_aliases(
    _provider: Arc<dyn altimetry_core::provider::ProviderAdapter>,
    query: &[u8],
) -> Result<Vec<String>, String> {
    let text = String::from_utf8(query.to_vec()).map_err(|err| err.to_string())?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[derive(Debug, Deserialize)]
struct PollQuery {
    #[serde(default)]
    #[allow(dead_code)]
    method: Option<String>,
}

async fn poll_memberitems(
    State(state): State<AppState>,
    Path((_name, handle)): Path<(String, String)>,
    Query(_params): Query<PollQuery>,
) -> ApiResult<Response> {
    let job = state
        .member_items_jobs
        .get(&handle)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| ApiError::NotFound(format!("unknown memberitems handle {handle}")))?;

    match job {
        MemberItemsJob::Pending => {
            let status = StatusCode::from_u16(210).expect("210 is a valid status code");
            Ok((status, Json(serde_json::json!({ "status": "pending" }))).into_response())
        }
        MemberItemsJob::Done(aliases) => {
            Ok((StatusCode::OK, Json(serde_json::json!({ "status": "done", "aliases": aliases }))).into_response())
        }
        MemberItemsJob::Failed(reason) => Err(ApiError::Internal(reason)),
    }
}
