use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::{error, info};

use luppa_core::api_types::{
    AnalysisSummary, PatternListResponse, PatternTypeCount, TopRiskResponse,
};
use luppa_core::error::LuppaError;
use luppa_core::pattern::PatternType;

use crate::state::AppState;

const DEFAULT_TOP_N: usize = 20;

pub async fn run_analysis(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session.write().await;

    match session.analyze() {
        Ok(report) => {
            let instances_by_type = PatternType::ALL
                .iter()
                .map(|&pattern_type| PatternTypeCount {
                    pattern_type,
                    count: report
                        .instances
                        .iter()
                        .filter(|i| i.pattern_type == pattern_type)
                        .count(),
                })
                .collect();

            let summary = AnalysisSummary {
                total_instances: report.instances.len(),
                instances_by_type,
                entities_scored: report.scores.len(),
                ran_at: report.ran_at,
            };
            info!(
                instances = summary.total_instances,
                entities = summary.entities_scored,
                "analysis run complete"
            );
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(e @ LuppaError::Config(_)) => {
            error!("analysis rejected: {e}");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": format!("{e}") })),
            )
                .into_response()
        }
        Err(e) => {
            error!("analysis failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("Analysis failed: {e}") })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TopRiskQuery {
    pub n: Option<usize>,
}

pub async fn top_risk(
    State(state): State<AppState>,
    Query(query): Query<TopRiskQuery>,
) -> impl IntoResponse {
    let session = state.session.read().await;
    let scores = session.top_risk(query.n.unwrap_or(DEFAULT_TOP_N));
    (StatusCode::OK, Json(TopRiskResponse { scores })).into_response()
}

pub async fn patterns_by_type(
    State(state): State<AppState>,
    Path(pattern_type): Path<String>,
) -> impl IntoResponse {
    let Some(pattern_type) = parse_pattern_type(&pattern_type) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("Unknown pattern type: {pattern_type}")
            })),
        )
            .into_response();
    };

    let session = state.session.read().await;
    let instances = session.patterns_by_type(pattern_type);
    (
        StatusCode::OK,
        Json(PatternListResponse {
            pattern_type,
            instances,
        }),
    )
        .into_response()
}

fn parse_pattern_type(s: &str) -> Option<PatternType> {
    match s {
        "cycle" => Some(PatternType::Cycle),
        "concentration" => Some(PatternType::Concentration),
        "cross_conflict" => Some(PatternType::CrossConflict),
        "temporal_anomaly" => Some(PatternType::TemporalAnomaly),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_type_path_segments_round_trip() {
        // Path segments must match the wire names of the serialized enum.
        for pattern_type in PatternType::ALL {
            let wire = serde_json::to_value(pattern_type).unwrap();
            let segment = wire.as_str().unwrap();
            assert_eq!(parse_pattern_type(segment), Some(pattern_type));
        }
        assert_eq!(parse_pattern_type("pyramid_scheme"), None);
    }
}
