use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{error, info, warn};

use luppa_core::api_types::IngestRequest;

use crate::state::AppState;

/// Extract relations from a document and fold them into the session graph.
/// Extraction I/O runs before the session lock is taken; the write lock
/// covers only the in-memory ingestion. Per-relation failures land in the
/// returned report with HTTP 200; only a failure of extraction itself
/// rejects the document.
pub async fn ingest_document(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> impl IntoResponse {
    info!(
        document_ref = %request.document.document_ref,
        document_type = ?request.document.document_type,
        "ingesting document"
    );

    let relations = match state.extractor.extract(&request.document).await {
        Ok(relations) => relations,
        Err(e) => {
            error!("extraction failed for {}: {e}", request.document.document_ref);
            return (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": format!("Extraction failed: {e}") })),
            )
                .into_response();
        }
    };

    let report = {
        let mut session = state.session.write().await;
        session.ingest_relations(&relations)
    };

    if !report.is_clean() {
        warn!(
            document_ref = %request.document.document_ref,
            failures = report.failures.len(),
            "document ingested with per-relation failures"
        );
    }
    (StatusCode::OK, Json(report)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::RwLock;

    use luppa_analysis::Session;
    use luppa_core::config::{AnalysisConfig, AppConfig};
    use luppa_core::entity::RelationMention;
    use luppa_core::error::Result;
    use luppa_core::extraction::{DocumentType, Extractor, RawDocument};

    struct SlowExtractor;

    #[async_trait]
    impl Extractor for SlowExtractor {
        async fn extract(&self, _document: &RawDocument) -> Result<Vec<RelationMention>> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(Vec::new())
        }
    }

    fn test_state(extractor: Arc<dyn Extractor>) -> AppState {
        AppState {
            config: AppConfig {
                anthropic_api_key: String::new(),
                server_host: "127.0.0.1".to_string(),
                server_port: 0,
                analysis: AnalysisConfig::default(),
            },
            session: Arc::new(RwLock::new(
                Session::new(AnalysisConfig::default()).unwrap(),
            )),
            extractor,
        }
    }

    #[tokio::test]
    async fn readers_proceed_while_extraction_is_in_flight() {
        let state = test_state(Arc::new(SlowExtractor));
        let request = IngestRequest {
            document: RawDocument {
                document_ref: "d1".to_string(),
                title: None,
                document_type: DocumentType::Other,
                content: String::new(),
                collected_at: Utc::now(),
            },
        };

        let ingest = tokio::spawn(ingest_document(State(state.clone()), Json(request)));

        // Give the handler time to reach the extractor call.
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The session must be readable immediately; only the in-memory
        // ingestion holds the write lock, never the extraction await.
        let started = Instant::now();
        let session = state.session.read().await;
        assert_eq!(session.store().entity_count(), 0);
        drop(session);
        assert!(
            started.elapsed() < Duration::from_millis(100),
            "reader stalled {:?} behind extraction",
            started.elapsed()
        );

        ingest.await.unwrap();
    }
}
