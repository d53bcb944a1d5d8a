use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{Entity, EntityType, RelationType};
use crate::extraction::RawDocument;
use crate::pattern::{PatternInstance, PatternType, RiskScore};

// --- Health ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub entity_count: usize,
    pub relation_count: usize,
}

// --- Ingestion ---

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestRequest {
    pub document: RawDocument,
}

/// One rejected relation within a batch. Errors never abort the batch; they
/// accumulate here and the remainder is ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestFailure {
    /// Position of the relation within the extracted batch.
    pub index: usize,
    pub message: String,
}

/// Per-batch ingestion report returned to the caller alongside whatever was
/// successfully ingested.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub relations_ingested: usize,
    pub entities_created: usize,
    pub failures: Vec<IngestFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// --- Analysis ---

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_instances: usize,
    pub instances_by_type: Vec<PatternTypeCount>,
    pub entities_scored: usize,
    pub ran_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatternTypeCount {
    pub pattern_type: PatternType,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatternListResponse {
    pub pattern_type: PatternType,
    pub instances: Vec<PatternInstance>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopRiskResponse {
    pub scores: Vec<RiskScore>,
}

// --- Graph export (the sole surface the visualization renderer consumes) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub label: String,
    pub risk_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportEdge {
    pub source: Uuid,
    pub target: Uuid,
    pub relation_type: RelationType,
    pub weight: f64,
    pub evidence_count: usize,
}

/// Plain serializable graph view with no behavior. Always an owned copy;
/// callers cannot mutate session state through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
    pub pattern_instances: Vec<PatternInstance>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubgraphRequest {
    pub entity_ids: Vec<Uuid>,
    #[serde(default = "default_hop_radius")]
    pub hop_radius: usize,
}

fn default_hop_radius() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgraphView {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

// --- Entities ---

#[derive(Debug, Serialize, Deserialize)]
pub struct EntitySearchResponse {
    pub entities: Vec<Entity>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub entity_count: usize,
    pub relation_count: usize,
    pub entities_by_type: Vec<EntityTypeStat>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntityTypeStat {
    pub entity_type: EntityType,
    pub count: usize,
}
