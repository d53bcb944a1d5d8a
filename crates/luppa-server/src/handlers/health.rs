use axum::{extract::State, Json};

use luppa_core::api_types::HealthResponse;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let session = state.session.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        entity_count: session.store().entity_count(),
        relation_count: session.store().relation_count(),
    })
}
