use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use luppa_core::api_types::EntitySearchResponse;

use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

pub async fn search_entities(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    info!(q = %query.q, limit = ?query.limit, "searching entities");

    let session = state.session.read().await;
    let entities = session
        .store()
        .search(&query.q, query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
    let total = entities.len();
    (StatusCode::OK, Json(EntitySearchResponse { entities, total })).into_response()
}
