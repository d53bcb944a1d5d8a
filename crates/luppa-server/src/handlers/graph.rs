use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::info;

use luppa_core::api_types::SubgraphRequest;

use crate::state::AppState;

pub async fn export_graph(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    let export = session.export();
    info!(
        nodes = export.nodes.len(),
        edges = export.edges.len(),
        "exporting graph"
    );
    (StatusCode::OK, Json(export)).into_response()
}

pub async fn graph_stats(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    (StatusCode::OK, Json(session.store().stats())).into_response()
}

pub async fn subgraph(
    State(state): State<AppState>,
    Json(request): Json<SubgraphRequest>,
) -> impl IntoResponse {
    info!(
        seeds = request.entity_ids.len(),
        hop_radius = request.hop_radius,
        "extracting subgraph"
    );
    let session = state.session.read().await;
    let view = session.subgraph(&request.entity_ids, request.hop_radius);
    (StatusCode::OK, Json(view)).into_response()
}
