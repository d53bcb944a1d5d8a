use std::collections::BTreeMap;

use chrono::Duration;
use uuid::Uuid;

use luppa_core::config::AnalysisConfig;
use luppa_core::entity::{Edge, EntityType};
use luppa_core::pattern::{PatternInstance, PatternType};
use luppa_graph::GraphStore;

/// Flags companies and beneficiaries whose inbound contract weight is
/// dominated by a single awarding official or PEP. Entities below the
/// absolute weight floor are skipped so one-off contracts don't flag.
pub fn detect(store: &GraphStore, config: &AnalysisConfig) -> Vec<PatternInstance> {
    let mut instances = Vec::new();

    for entity in store.entities() {
        if !matches!(
            entity.entity_type,
            EntityType::Company | EntityType::Beneficiary
        ) {
            continue;
        }

        // Awarding relationships regardless of stored edge direction: any
        // contract edge touching the recipient whose counterpart is an
        // official or PEP.
        let inbound: Vec<&Edge> = store
            .incident_edges(entity.id)
            .into_iter()
            .filter(|e| e.relation_type == luppa_core::entity::RelationType::Contract)
            .filter(|e| {
                store
                    .entity(e.other_endpoint(entity.id))
                    .map(|src| matches!(src.entity_type, EntityType::Official | EntityType::Pep))
                    .unwrap_or(false)
            })
            .collect();
        if inbound.is_empty() {
            continue;
        }

        let windowed = apply_window(inbound, config.concentration_window_days);
        if windowed.is_empty() {
            continue;
        }

        let mut per_source: BTreeMap<Uuid, f64> = BTreeMap::new();
        for edge in &windowed {
            *per_source.entry(edge.other_endpoint(entity.id)).or_default() += edge.weight;
        }

        let total: f64 = per_source.values().sum();
        if total < config.concentration_min_weight || total <= 0.0 {
            continue;
        }

        // BTreeMap iteration keeps the winner deterministic on ties.
        let (&top_source, &top_weight) = per_source
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .expect("non-empty per_source");

        let share = top_weight / total;
        if share < config.concentration_top_share {
            continue;
        }

        let top_name = store
            .entity(top_source)
            .map(|e| e.display_name.clone())
            .unwrap_or_else(|| top_source.to_string());

        instances.push(PatternInstance {
            id: Uuid::new_v4(),
            pattern_type: PatternType::Concentration,
            entity_ids: vec![entity.id, top_source],
            edge_refs: windowed.iter().map(|e| e.key()).collect(),
            raw_score: share * total,
            evidence_count: windowed
                .iter()
                .flat_map(|e| e.evidence.iter())
                .collect::<std::collections::BTreeSet<_>>()
                .len(),
            explanation: format!(
                "{} receives {:.0}% of {:.2} total inbound contract weight from {}",
                entity.display_name,
                share * 100.0,
                total,
                top_name
            ),
        });
    }

    instances.sort_by(|a, b| {
        b.raw_score
            .partial_cmp(&a.raw_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.evidence_count.cmp(&a.evidence_count))
            .then(a.entity_ids.cmp(&b.entity_ids))
    });

    tracing::debug!(count = instances.len(), "concentration detection complete");
    instances
}

/// With a window configured, an edge counts if its most recent observation
/// falls within `days` of the newest observation among the candidate edges.
/// Anchoring on the data rather than wall-clock time keeps re-runs on an
/// unchanged graph identical.
fn apply_window(edges: Vec<&Edge>, window_days: Option<i64>) -> Vec<&Edge> {
    let Some(days) = window_days else {
        return edges;
    };
    let Some(anchor) = edges.iter().filter_map(|e| e.latest_timestamp()).max() else {
        return Vec::new();
    };
    let cutoff = anchor - Duration::days(days);
    edges
        .into_iter()
        .filter(|e| e.latest_timestamp().map(|t| t >= cutoff).unwrap_or(false))
        .collect()
}
