use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health
        .route("/api/health", get(handlers::health::health_check))
        // Ingestion
        .route("/api/documents", post(handlers::documents::ingest_document))
        // Analysis
        .route("/api/analysis/run", post(handlers::analysis::run_analysis))
        .route("/api/risk/top", get(handlers::analysis::top_risk))
        .route("/api/patterns/{type}", get(handlers::analysis::patterns_by_type))
        // Graph
        .route("/api/graph/export", get(handlers::graph::export_graph))
        .route("/api/graph/stats", get(handlers::graph::graph_stats))
        .route("/api/graph/subgraph", post(handlers::graph::subgraph))
        // Entities
        .route("/api/entities/search", get(handlers::entities::search_entities))
        // Session
        .route("/api/session/reset", post(handlers::session::reset_session))
}
