use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::entity::EdgeKey;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Cycle,
    Concentration,
    CrossConflict,
    TemporalAnomaly,
}

impl PatternType {
    pub const ALL: [PatternType; 4] = [
        PatternType::Cycle,
        PatternType::Concentration,
        PatternType::CrossConflict,
        PatternType::TemporalAnomaly,
    ];
}

/// One detected pattern occurrence. Immutable after creation: a later
/// detection run discards and regenerates instances, never patches them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternInstance {
    pub id: Uuid,
    pub pattern_type: PatternType,
    /// Involved entities, in pattern-specific order (e.g. cycle traversal
    /// order, or flagged entity first).
    pub entity_ids: Vec<Uuid>,
    pub edge_refs: BTreeSet<EdgeKey>,
    pub raw_score: f64,
    /// Total distinct evidence documents across the involved edges. Breaks
    /// ranking ties between instances with equal raw scores.
    pub evidence_count: usize,
    pub explanation: String,
}

impl PatternInstance {
    pub fn involves(&self, entity_id: Uuid) -> bool {
        self.entity_ids.contains(&entity_id)
    }
}

/// A non-owning reference from a risk score back to a contributing pattern
/// instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRef {
    pub instance_id: Uuid,
    pub pattern_type: PatternType,
    pub raw_score: f64,
    /// Per-type min-max normalized score in [0, 100].
    pub normalized_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    pub entity_id: Uuid,
    /// Weighted aggregate in [0, 100]; exactly 0 for entities involved in no
    /// pattern instance.
    pub aggregate_score: f64,
    /// Contributing instances, descending raw score.
    pub contributing: Vec<PatternRef>,
}

impl RiskScore {
    pub fn uninvolved(entity_id: Uuid) -> Self {
        Self {
            entity_id,
            aggregate_score: 0.0,
            contributing: Vec::new(),
        }
    }
}

/// Output of one full detect-then-score pass over a frozen graph snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub instances: Vec<PatternInstance>,
    pub scores: std::collections::BTreeMap<Uuid, RiskScore>,
    pub ran_at: DateTime<Utc>,
}
