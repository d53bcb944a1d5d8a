use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::info;

use crate::state::AppState;

pub async fn reset_session(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session.write().await;
    session.reset();
    info!("session reset via API");
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "reset" })),
    )
        .into_response()
}
