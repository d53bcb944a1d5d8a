use std::collections::{BTreeMap, BTreeSet, VecDeque};

use uuid::Uuid;

use luppa_core::api_types::{
    EntityTypeStat, ExportEdge, ExportNode, GraphExport, StatsResponse, SubgraphView,
};
use luppa_core::entity::{EdgeKey, Entity, EntityType};
use luppa_core::pattern::{AnalysisReport, RiskScore};

use crate::store::GraphStore;

/// Read-only views over the graph. Everything returned here is an owned,
/// plain-data copy; callers cannot reach back into session state.
impl GraphStore {
    /// Entities whose display name, canonical name, or any alias contains
    /// the query, case-insensitively.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Entity> {
        let needle = query.to_lowercase();
        self.entities()
            .filter(|e| {
                e.canonical_name.contains(&needle)
                    || e.display_name.to_lowercase().contains(&needle)
                    || e.aliases.iter().any(|a| a.to_lowercase().contains(&needle))
            })
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> StatsResponse {
        let mut by_type: BTreeMap<EntityType, usize> = BTreeMap::new();
        for entity in self.entities() {
            *by_type.entry(entity.entity_type).or_default() += 1;
        }
        StatsResponse {
            entity_count: self.entity_count(),
            relation_count: self.relation_count(),
            entities_by_type: by_type
                .into_iter()
                .map(|(entity_type, count)| EntityTypeStat { entity_type, count })
                .collect(),
        }
    }

    /// Entities within `hop_radius` hops of any seed (direction ignored),
    /// with every edge whose endpoints both fall inside the neighborhood.
    pub fn subgraph(
        &self,
        seeds: &[Uuid],
        hop_radius: usize,
        scores: Option<&BTreeMap<Uuid, RiskScore>>,
    ) -> SubgraphView {
        let mut visited: BTreeMap<Uuid, usize> = BTreeMap::new();
        let mut queue: VecDeque<(Uuid, usize)> = VecDeque::new();

        for &seed in seeds {
            if self.entity(seed).is_some() && !visited.contains_key(&seed) {
                visited.insert(seed, 0);
                queue.push_back((seed, 0));
            }
        }

        while let Some((id, depth)) = queue.pop_front() {
            if depth == hop_radius {
                continue;
            }
            for edge in self.incident_edges(id) {
                let next = edge.other_endpoint(id);
                if !visited.contains_key(&next) {
                    visited.insert(next, depth + 1);
                    queue.push_back((next, depth + 1));
                }
            }
        }

        let mut edge_keys: BTreeSet<EdgeKey> = BTreeSet::new();
        for &id in visited.keys() {
            for edge in self.incident_edges(id) {
                if visited.contains_key(&edge.other_endpoint(id)) {
                    edge_keys.insert(edge.key());
                }
            }
        }

        SubgraphView {
            nodes: visited
                .keys()
                .filter_map(|id| self.entity(*id))
                .map(|e| export_node(e, scores))
                .collect(),
            edges: edge_keys
                .iter()
                .filter_map(|k| self.edge(k))
                .map(export_edge)
                .collect(),
        }
    }

    /// The full serializable payload consumed by the visualization renderer.
    pub fn export(&self, report: Option<&AnalysisReport>) -> GraphExport {
        let scores = report.map(|r| &r.scores);
        GraphExport {
            nodes: self.entities().map(|e| export_node(e, scores)).collect(),
            edges: self.edges().map(export_edge).collect(),
            pattern_instances: report.map(|r| r.instances.clone()).unwrap_or_default(),
        }
    }
}

fn export_node(entity: &Entity, scores: Option<&BTreeMap<Uuid, RiskScore>>) -> ExportNode {
    ExportNode {
        id: entity.id,
        entity_type: entity.entity_type,
        label: entity.display_name.clone(),
        risk_score: scores
            .and_then(|s| s.get(&entity.id))
            .map(|s| s.aggregate_score)
            .unwrap_or(0.0),
    }
}

fn export_edge(edge: &luppa_core::entity::Edge) -> ExportEdge {
    ExportEdge {
        source: edge.source,
        target: edge.target,
        relation_type: edge.relation_type,
        weight: edge.weight,
        evidence_count: edge.evidence.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use luppa_core::entity::{EntityType, Mention, RelationMention, RelationType};

    fn chain_store() -> (GraphStore, Vec<Uuid>) {
        // a -> b -> c -> d, all contracts
        let mut store = GraphStore::new();
        let names = ["Alpha SA", "Beatriz Vega", "Carmen Industrial", "Diego Luna"];
        let types = [
            EntityType::Company,
            EntityType::Official,
            EntityType::Company,
            EntityType::Official,
        ];
        for i in 0..3 {
            store
                .add_relation(&RelationMention {
                    source: Mention::new(names[i], types[i]),
                    target: Mention::new(names[i + 1], types[i + 1]),
                    relation_type: RelationType::Contract,
                    weight: 100.0,
                    timestamp: Utc::now(),
                    evidence: format!("doc{i}"),
                })
                .unwrap();
        }
        let ids = names
            .iter()
            .map(|n| {
                store
                    .entities()
                    .find(|e| e.display_name == *n)
                    .unwrap()
                    .id
            })
            .collect();
        (store, ids)
    }

    #[test]
    fn subgraph_respects_hop_radius() {
        let (store, ids) = chain_store();

        let view = store.subgraph(&[ids[0]], 1, None);
        assert_eq!(view.nodes.len(), 2);
        assert_eq!(view.edges.len(), 1);

        let view = store.subgraph(&[ids[0]], 2, None);
        assert_eq!(view.nodes.len(), 3);
        assert_eq!(view.edges.len(), 2);
    }

    #[test]
    fn subgraph_of_unknown_seed_is_empty() {
        let (store, _) = chain_store();
        let view = store.subgraph(&[Uuid::new_v4()], 3, None);
        assert!(view.nodes.is_empty());
        assert!(view.edges.is_empty());
    }

    #[test]
    fn export_covers_all_nodes_and_edges() {
        let (store, _) = chain_store();
        let export = store.export(None);
        assert_eq!(export.nodes.len(), 4);
        assert_eq!(export.edges.len(), 3);
        assert!(export.pattern_instances.is_empty());
        assert!(export.nodes.iter().all(|n| n.risk_score == 0.0));
    }

    #[test]
    fn search_matches_aliases_case_insensitively() {
        let (store, _) = chain_store();
        let hits = store.search("beatriz", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].display_name, "Beatriz Vega");
    }
}
