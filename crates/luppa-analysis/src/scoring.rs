use std::collections::BTreeMap;

use uuid::Uuid;

use luppa_core::config::AnalysisConfig;
use luppa_core::pattern::{PatternInstance, PatternRef, PatternType, RiskScore};
use luppa_graph::GraphStore;

/// Aggregates detector output into one normalized risk score per entity.
/// Recomputed wholesale on every pass; holds no state between runs, so two
/// passes over an unchanged graph produce identical output.
pub fn score_all(
    store: &GraphStore,
    instances: &[PatternInstance],
    config: &AnalysisConfig,
) -> BTreeMap<Uuid, RiskScore> {
    let normalized = normalize_per_type(instances);

    let mut scores = BTreeMap::new();
    for entity in store.entities() {
        let mut contributing: Vec<PatternRef> = instances
            .iter()
            .zip(normalized.iter())
            .filter(|(instance, _)| instance.involves(entity.id))
            .map(|(instance, &norm)| PatternRef {
                instance_id: instance.id,
                pattern_type: instance.pattern_type,
                raw_score: instance.raw_score,
                normalized_score: norm,
            })
            .collect();

        contributing.sort_by(|a, b| {
            b.raw_score
                .partial_cmp(&a.raw_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.instance_id.cmp(&b.instance_id))
        });

        let aggregate: f64 = contributing
            .iter()
            .map(|r| config.pattern_weight(r.pattern_type) * r.normalized_score)
            .sum();

        let score = if contributing.is_empty() {
            RiskScore::uninvolved(entity.id)
        } else {
            RiskScore {
                entity_id: entity.id,
                aggregate_score: aggregate.clamp(0.0, 100.0),
                contributing,
            }
        };
        scores.insert(entity.id, score);
    }

    tracing::debug!(entities = scores.len(), "risk scoring complete");
    scores
}

/// Min-max normalization of raw scores to [0, 100] within each pattern
/// type's current instance set. A type with a single instance (or all-equal
/// raw scores) gets the midpoint rather than a degenerate 0/0.
fn normalize_per_type(instances: &[PatternInstance]) -> Vec<f64> {
    let mut bounds: BTreeMap<PatternType, (f64, f64)> = BTreeMap::new();
    for instance in instances {
        let entry = bounds
            .entry(instance.pattern_type)
            .or_insert((f64::INFINITY, f64::NEG_INFINITY));
        entry.0 = entry.0.min(instance.raw_score);
        entry.1 = entry.1.max(instance.raw_score);
    }

    instances
        .iter()
        .map(|instance| {
            let (min, max) = bounds[&instance.pattern_type];
            if max > min {
                (instance.raw_score - min) / (max - min) * 100.0
            } else {
                50.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use luppa_core::entity::{EntityType, Mention, RelationMention, RelationType};
    use std::collections::BTreeSet;

    fn instance(pattern_type: PatternType, entity_ids: Vec<Uuid>, raw: f64) -> PatternInstance {
        PatternInstance {
            id: Uuid::new_v4(),
            pattern_type,
            entity_ids,
            edge_refs: BTreeSet::new(),
            raw_score: raw,
            evidence_count: 1,
            explanation: String::new(),
        }
    }

    fn two_entity_store() -> (GraphStore, Uuid, Uuid) {
        let mut store = GraphStore::new();
        store
            .add_relation(&RelationMention {
                source: Mention::new("Obras del Golfo", EntityType::Company),
                target: Mention::new("Ana Ruiz", EntityType::Official),
                relation_type: RelationType::Contract,
                weight: 100.0,
                timestamp: Utc::now(),
                evidence: "doc1".to_string(),
            })
            .unwrap();
        let ids: Vec<Uuid> = store.entities().map(|e| e.id).collect();
        let (a, b) = (ids[0], ids[1]);
        (store, a, b)
    }

    #[test]
    fn uninvolved_entity_scores_exactly_zero() {
        let (store, a, _b) = two_entity_store();
        let instances = vec![instance(PatternType::Cycle, vec![a], 10.0)];
        let scores = score_all(&store, &instances, &AnalysisConfig::default());

        for (id, score) in &scores {
            if *id == a {
                assert!(score.aggregate_score > 0.0);
            } else {
                assert_eq!(score.aggregate_score, 0.0);
                assert!(score.contributing.is_empty());
            }
        }
    }

    #[test]
    fn single_instance_of_a_type_normalizes_to_midpoint() {
        let (store, a, _) = two_entity_store();
        let instances = vec![instance(PatternType::Concentration, vec![a], 1234.5)];
        let scores = score_all(&store, &instances, &AnalysisConfig::default());
        let score = &scores[&a];
        assert_eq!(score.contributing[0].normalized_score, 50.0);
        // 0.25 weight on the midpoint.
        assert_eq!(score.aggregate_score, 12.5);
    }

    #[test]
    fn min_max_spread_within_type() {
        let (store, a, b) = two_entity_store();
        let instances = vec![
            instance(PatternType::Cycle, vec![a], 10.0),
            instance(PatternType::Cycle, vec![b], 30.0),
            instance(PatternType::Cycle, vec![b], 20.0),
        ];
        let scores = score_all(&store, &instances, &AnalysisConfig::default());
        assert_eq!(scores[&a].contributing[0].normalized_score, 0.0);
        assert_eq!(scores[&b].contributing[0].normalized_score, 100.0);
        assert_eq!(scores[&b].contributing[1].normalized_score, 50.0);
    }

    #[test]
    fn aggregate_capped_at_100() {
        let (store, a, _) = two_entity_store();
        // Many maximal instances across types drive the weighted sum past 100.
        let mut instances = Vec::new();
        for _ in 0..10 {
            instances.push(instance(PatternType::Cycle, vec![a], 5.0));
            instances.push(instance(PatternType::CrossConflict, vec![a], 1.0));
        }
        let scores = score_all(&store, &instances, &AnalysisConfig::default());
        assert_eq!(scores[&a].aggregate_score, 100.0);
    }

    #[test]
    fn bounds_hold_for_all_entities() {
        let (store, a, b) = two_entity_store();
        let instances = vec![
            instance(PatternType::Cycle, vec![a, b], 10.0),
            instance(PatternType::TemporalAnomaly, vec![b], 4.0),
        ];
        let scores = score_all(&store, &instances, &AnalysisConfig::default());
        for score in scores.values() {
            assert!(score.aggregate_score >= 0.0);
            assert!(score.aggregate_score <= 100.0);
        }
    }

    #[test]
    fn contributing_sorted_by_descending_raw_score() {
        let (store, a, _) = two_entity_store();
        let instances = vec![
            instance(PatternType::Cycle, vec![a], 1.0),
            instance(PatternType::Concentration, vec![a], 500.0),
            instance(PatternType::Cycle, vec![a], 3.0),
        ];
        let scores = score_all(&store, &instances, &AnalysisConfig::default());
        let raws: Vec<f64> = scores[&a].contributing.iter().map(|r| r.raw_score).collect();
        assert_eq!(raws, vec![500.0, 3.0, 1.0]);
    }
}
