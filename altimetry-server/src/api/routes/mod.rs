pub mod collection;
pub mod health;
pub mod item;
pub mod items;
pub mod metrics_route;
pub mod provider;
pub mod root;
pub mod tiid;

use axum::Router;

use crate::state::AppState;

/// Merges every route group into one router over the shared [`AppState`].
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(root::router())
        .merge(health::router())
        .merge(metrics_route::router())
        .merge(item::router())
        .merge(items::router())
        .merge(tiid::router())
        .merge(provider::router())
        .merge(collection::router())
}
