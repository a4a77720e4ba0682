//! `POST /items`: bulk create/coalesce (spec §6, §8 scenario S3).

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/items", post(create_items))
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct AliasPair(#[serde(with = "pair")] (String, String));

mod pair {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<(String, String), D::Error>
    where
        D: Deserializer<'de>,
    {
        let [ns, id]: [String; 2] = Deserialize::deserialize(deserializer)?;
        Ok((ns, id))
    }
}

/// Bulk create/coalesce: submits every `[ns, id]` pair through the same
/// intake path as `POST /item/<ns>/<nid>`, returning tiids aligned
/// index-for-index with the input — duplicate aliases resolve to equal
/// tiids (§8 S3).
async fn create_items(
    State(state): State<AppState>,
    Json(aliases): Json<Vec<AliasPair>>,
) -> ApiResult<(StatusCode, Json<Vec<String>>)> {
    let mut tiids = Vec::with_capacity(aliases.len());
    for AliasPair((ns, id)) in aliases {
        tiids.push(state.intake(&ns, &id).await?);
    }
    Ok((StatusCode::CREATED, Json(tiids)))
}
