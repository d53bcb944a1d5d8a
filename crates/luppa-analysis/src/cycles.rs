use std::collections::BTreeSet;

use uuid::Uuid;

use luppa_core::config::AnalysisConfig;
use luppa_core::entity::{Edge, EdgeKey};
use luppa_core::pattern::{PatternInstance, PatternType};
use luppa_graph::GraphStore;

/// Enumerates chordless directed cycles of length 3..=max_cycle_len and
/// keeps those that mix at least two entity types and carry at least one
/// transactional edge. Pure same-type chains (company-to-company loops with
/// no official anywhere) are noise, not self-dealing.
pub fn detect(store: &GraphStore, config: &AnalysisConfig) -> Vec<PatternInstance> {
    let finder = CycleFinder {
        store,
        max_len: config.max_cycle_len,
    };
    let mut cycles = finder.enumerate();

    cycles.retain(|c| is_chordless(store, &c.nodes));
    cycles.retain(|c| qualifies(store, c));

    let mut instances: Vec<PatternInstance> = cycles
        .into_iter()
        .map(|c| to_instance(store, c, config.max_cycle_len))
        .collect();

    instances.sort_by(|a, b| {
        b.raw_score
            .partial_cmp(&a.raw_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.evidence_count.cmp(&a.evidence_count))
            .then(a.entity_ids.cmp(&b.entity_ids))
    });

    tracing::debug!(count = instances.len(), "cycle detection complete");
    instances
}

struct Candidate {
    nodes: Vec<Uuid>,
    edges: Vec<EdgeKey>,
}

struct CycleFinder<'a> {
    store: &'a GraphStore,
    max_len: usize,
}

impl CycleFinder<'_> {
    /// Bounded DFS rooted at each node in ascending id order. A cycle is
    /// only expanded through nodes greater than its root, so every directed
    /// cycle is discovered from its minimum entity id exactly once; cycles
    /// of purely symmetric edges (walkable in both rotations) are deduped by
    /// their edge-key set.
    fn enumerate(&self) -> Vec<Candidate> {
        let mut found = Vec::new();
        let mut seen: BTreeSet<BTreeSet<EdgeKey>> = BTreeSet::new();

        let roots: Vec<Uuid> = self.store.entities().map(|e| e.id).collect();
        for root in roots {
            let mut path = vec![root];
            let mut path_edges = Vec::new();
            self.dfs(root, root, &mut path, &mut path_edges, &mut seen, &mut found);
        }
        found
    }

    fn dfs(
        &self,
        current: Uuid,
        root: Uuid,
        path: &mut Vec<Uuid>,
        path_edges: &mut Vec<EdgeKey>,
        seen: &mut BTreeSet<BTreeSet<EdgeKey>>,
        found: &mut Vec<Candidate>,
    ) {
        for edge in self.store.edges_from(current) {
            let next = traversal_target(edge, current);
            let key = edge.key();
            if path_edges.contains(&key) {
                continue;
            }

            if next == root && path.len() >= 3 {
                let mut edges = path_edges.clone();
                edges.push(key);
                let signature: BTreeSet<EdgeKey> = edges.iter().copied().collect();
                if seen.insert(signature) {
                    found.push(Candidate {
                        nodes: path.clone(),
                        edges,
                    });
                }
                continue;
            }

            if next > root && !path.contains(&next) && path.len() < self.max_len {
                path.push(next);
                path_edges.push(key);
                self.dfs(next, root, path, path_edges, seen, found);
                path_edges.pop();
                path.pop();
            }
        }
    }
}

fn traversal_target(edge: &Edge, from: Uuid) -> Uuid {
    if edge.symmetric {
        edge.other_endpoint(from)
    } else {
        edge.target
    }
}

/// No graph edge may connect two non-consecutive members of the cycle.
fn is_chordless(store: &GraphStore, nodes: &[Uuid]) -> bool {
    let n = nodes.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let consecutive = j == i + 1 || (i == 0 && j == n - 1);
            if consecutive {
                continue;
            }
            if connected(store, nodes[i], nodes[j]) {
                return false;
            }
        }
    }
    true
}

fn connected(store: &GraphStore, a: Uuid, b: Uuid) -> bool {
    store.incident_edges(a).iter().any(|e| e.other_endpoint(a) == b)
}

fn qualifies(store: &GraphStore, candidate: &Candidate) -> bool {
    let types: BTreeSet<_> = candidate
        .nodes
        .iter()
        .filter_map(|id| store.entity(*id))
        .map(|e| e.entity_type)
        .collect();
    if types.len() < 2 {
        return false;
    }

    candidate
        .edges
        .iter()
        .filter_map(|k| store.edge(k))
        .any(|e| e.relation_type.is_transactional())
}

fn to_instance(store: &GraphStore, candidate: Candidate, max_len: usize) -> PatternInstance {
    let edges: Vec<&Edge> = candidate
        .edges
        .iter()
        .filter_map(|k| store.edge(k))
        .collect();

    // The weakest link bounds plausibility; shorter cycles are tighter
    // arrangements and score higher.
    let min_weight = edges
        .iter()
        .map(|e| e.weight)
        .fold(f64::INFINITY, f64::min);
    let len = candidate.nodes.len();
    let raw_score = min_weight * (max_len as f64 + 1.0 - len as f64) / max_len as f64;

    let evidence: BTreeSet<&String> = edges.iter().flat_map(|e| e.evidence.iter()).collect();

    let names: Vec<String> = candidate
        .nodes
        .iter()
        .filter_map(|id| store.entity(*id))
        .map(|e| e.display_name.clone())
        .collect();

    PatternInstance {
        id: Uuid::new_v4(),
        pattern_type: PatternType::Cycle,
        entity_ids: candidate.nodes,
        edge_refs: candidate.edges.iter().copied().collect(),
        raw_score,
        evidence_count: evidence.len(),
        explanation: format!(
            "closed cycle of {} entities ({}) with minimum edge weight {:.2}",
            len,
            names.join(" -> "),
            min_weight
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use luppa_core::entity::{EntityType, Mention, RelationMention, RelationType};

    fn add(
        store: &mut GraphStore,
        source: (&str, EntityType),
        target: (&str, EntityType),
        relation_type: RelationType,
        weight: f64,
        evidence: &str,
    ) {
        store
            .add_relation(&RelationMention {
                source: Mention::new(source.0, source.1),
                target: Mention::new(target.0, target.1),
                relation_type,
                weight,
                timestamp: Utc::now(),
                evidence: evidence.to_string(),
            })
            .unwrap();
    }

    fn triangle(relation_types: [RelationType; 3]) -> GraphStore {
        let mut store = GraphStore::new();
        let nodes = [
            ("Ana Ruiz", EntityType::Official),
            ("Obras del Golfo", EntityType::Company),
            ("Pedro Salas", EntityType::Official),
        ];
        for i in 0..3 {
            add(
                &mut store,
                nodes[i],
                nodes[(i + 1) % 3],
                relation_types[i],
                100.0,
                &format!("doc{i}"),
            );
        }
        store
    }

    #[test]
    fn mixed_type_cycle_with_contract_detected_once() {
        let store = triangle([
            RelationType::Appointment,
            RelationType::Contract,
            RelationType::Employment,
        ]);
        let instances = detect(&store, &AnalysisConfig::default());
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].entity_ids.len(), 3);
        assert_eq!(instances[0].edge_refs.len(), 3);
    }

    #[test]
    fn family_only_cycle_excluded() {
        let store = triangle([
            RelationType::FamilyTie,
            RelationType::FamilyTie,
            RelationType::FamilyTie,
        ]);
        let instances = detect(&store, &AnalysisConfig::default());
        assert!(instances.is_empty());
    }

    #[test]
    fn same_type_cycle_excluded() {
        let mut store = GraphStore::new();
        let companies = [
            ("Alfa SA", EntityType::Company),
            ("Beta SA", EntityType::Company),
            ("Gamma SA", EntityType::Company),
        ];
        for i in 0..3 {
            add(
                &mut store,
                companies[i],
                companies[(i + 1) % 3],
                RelationType::Contract,
                100.0,
                &format!("doc{i}"),
            );
        }
        let instances = detect(&store, &AnalysisConfig::default());
        assert!(instances.is_empty());
    }

    #[test]
    fn chord_disqualifies_cycle() {
        let mut store = GraphStore::new();
        let nodes = [
            ("Ana Ruiz", EntityType::Official),
            ("Obras del Golfo", EntityType::Company),
            ("Pedro Salas", EntityType::Official),
            ("Delta SA", EntityType::Company),
        ];
        for i in 0..4 {
            add(
                &mut store,
                nodes[i],
                nodes[(i + 1) % 4],
                RelationType::Contract,
                100.0,
                &format!("doc{i}"),
            );
        }
        // Without a chord the 4-cycle qualifies.
        assert_eq!(detect(&store, &AnalysisConfig::default()).len(), 1);

        // A diagonal edge makes it chorded; only the two triangles remain.
        add(
            &mut store,
            nodes[0],
            nodes[2],
            RelationType::Donation,
            10.0,
            "doc-chord",
        );
        let instances = detect(&store, &AnalysisConfig::default());
        assert!(instances.iter().all(|i| i.entity_ids.len() == 3));
    }

    #[test]
    fn shorter_cycle_outscores_longer_at_equal_weight() {
        let config = AnalysisConfig::default();
        let short = triangle([
            RelationType::Contract,
            RelationType::Employment,
            RelationType::Appointment,
        ]);
        let short_score = detect(&short, &config)[0].raw_score;

        let mut long = GraphStore::new();
        let nodes = [
            ("Ana Ruiz", EntityType::Official),
            ("Obras del Golfo", EntityType::Company),
            ("Pedro Salas", EntityType::Official),
            ("Delta SA", EntityType::Company),
            ("Eva Mora", EntityType::Beneficiary),
        ];
        for i in 0..5 {
            add(
                &mut long,
                nodes[i],
                nodes[(i + 1) % 5],
                RelationType::Contract,
                100.0,
                &format!("doc{i}"),
            );
        }
        let long_score = detect(&long, &config)[0].raw_score;
        assert!(short_score > long_score);
    }

    #[test]
    fn cycle_length_bound_respected() {
        let mut store = GraphStore::new();
        let nodes = [
            ("N1", EntityType::Official),
            ("N2", EntityType::Company),
            ("N3", EntityType::Official),
            ("N4", EntityType::Company),
            ("N5", EntityType::Official),
            ("N6", EntityType::Company),
            ("N7", EntityType::Official),
        ];
        for i in 0..7 {
            add(
                &mut store,
                nodes[i],
                nodes[(i + 1) % 7],
                RelationType::Contract,
                100.0,
                &format!("doc{i}"),
            );
        }
        // A 7-cycle exceeds the default bound of 6.
        assert!(detect(&store, &AnalysisConfig::default()).is_empty());

        let config = AnalysisConfig {
            max_cycle_len: 8,
            ..Default::default()
        };
        assert_eq!(detect(&store, &config).len(), 1);
    }
}
