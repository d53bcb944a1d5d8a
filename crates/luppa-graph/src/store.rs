use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use luppa_core::api_types::{BatchReport, IngestFailure};
use luppa_core::entity::{Edge, EdgeKey, Entity, RelationMention};
use luppa_core::error::{LuppaError, Result};

/// In-memory typed multigraph for one analysis session. Single-writer
/// ingestion; detectors and the query layer only read.
#[derive(Debug, Default, Clone)]
pub struct GraphStore {
    registry: crate::registry::EntityRegistry,
    edges: BTreeMap<EdgeKey, Edge>,
    outgoing: BTreeMap<Uuid, BTreeSet<EdgeKey>>,
    incoming: BTreeMap<Uuid, BTreeSet<EdgeKey>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves both mentions, then merges the observation into the edge
    /// keyed by (source, target, relation type). Re-adding an evidence
    /// reference the edge already carries is a no-op.
    pub fn add_relation(&mut self, rel: &RelationMention) -> Result<()> {
        if !rel.weight.is_finite() || rel.weight < 0.0 {
            return Err(LuppaError::MalformedRelation(format!(
                "weight {} is not a finite non-negative number",
                rel.weight
            )));
        }

        let source_id = self.registry.upsert(&rel.source)?;
        let target_id = self.registry.upsert(&rel.target)?;
        if source_id == target_id {
            return Err(LuppaError::MalformedRelation(format!(
                "both endpoints canonicalize to the same entity ({:?})",
                rel.source.name
            )));
        }

        let key = EdgeKey::new(source_id, target_id, rel.relation_type);

        if let Some(edge) = self.edges.get_mut(&key) {
            if edge.evidence.contains(&rel.evidence) {
                tracing::debug!(
                    evidence = %rel.evidence,
                    ?key,
                    "duplicate evidence reference, skipping accumulation"
                );
                return Ok(());
            }
            edge.weight += rel.weight;
            let pos = edge.timestamps.partition_point(|t| *t <= rel.timestamp);
            edge.timestamps.insert(pos, rel.timestamp);
            edge.evidence.insert(rel.evidence.clone());
            return Ok(());
        }

        let symmetric = rel.relation_type.is_symmetric();
        let edge = Edge {
            source: key.source,
            target: key.target,
            relation_type: key.relation_type,
            symmetric,
            weight: rel.weight,
            timestamps: vec![rel.timestamp],
            evidence: BTreeSet::from([rel.evidence.clone()]),
        };

        self.outgoing.entry(key.source).or_default().insert(key);
        self.incoming.entry(key.target).or_default().insert(key);
        if symmetric {
            // Index under the swapped endpoints too, so neighbor lookups work
            // in both directions without duplicating the edge itself.
            self.outgoing.entry(key.target).or_default().insert(key);
            self.incoming.entry(key.source).or_default().insert(key);
        }
        self.edges.insert(key, edge);

        Ok(())
    }

    /// Ingests a whole extracted batch. Individual failures are collected
    /// into the report; they never abort the rest of the batch.
    pub fn ingest(&mut self, relations: &[RelationMention]) -> BatchReport {
        let entities_before = self.registry.len();
        let mut report = BatchReport::default();

        for (index, rel) in relations.iter().enumerate() {
            match self.add_relation(rel) {
                Ok(()) => report.relations_ingested += 1,
                Err(e) => {
                    tracing::warn!(index, error = %e, "rejected relation during ingestion");
                    report.failures.push(IngestFailure {
                        index,
                        message: e.to_string(),
                    });
                }
            }
        }

        report.entities_created = self.registry.len() - entities_before;
        tracing::info!(
            ingested = report.relations_ingested,
            new_entities = report.entities_created,
            rejected = report.failures.len(),
            "batch ingestion complete"
        );
        report
    }

    pub fn registry(&self) -> &crate::registry::EntityRegistry {
        &self.registry
    }

    pub fn entity(&self, id: Uuid) -> Option<&Entity> {
        self.registry.get(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.registry.entities()
    }

    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn relation_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges traversable outward from `id`: directed edges starting there
    /// plus symmetric edges touching it.
    pub fn edges_from(&self, id: Uuid) -> impl Iterator<Item = &Edge> + '_ {
        self.outgoing
            .get(&id)
            .into_iter()
            .flat_map(|keys| keys.iter())
            .filter_map(|k| self.edges.get(k))
    }

    /// Edges arriving at `id`, symmetric edges included.
    pub fn edges_into(&self, id: Uuid) -> impl Iterator<Item = &Edge> + '_ {
        self.incoming
            .get(&id)
            .into_iter()
            .flat_map(|keys| keys.iter())
            .filter_map(|k| self.edges.get(k))
    }

    /// All edges touching `id`, each exactly once, regardless of direction.
    pub fn incident_edges(&self, id: Uuid) -> Vec<&Edge> {
        let mut keys: BTreeSet<EdgeKey> = BTreeSet::new();
        if let Some(out) = self.outgoing.get(&id) {
            keys.extend(out.iter().copied());
        }
        if let Some(inc) = self.incoming.get(&id) {
            keys.extend(inc.iter().copied());
        }
        keys.iter().filter_map(|k| self.edges.get(k)).collect()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use luppa_core::entity::{EntityType, Mention, RelationType};

    fn rel(
        source: &str,
        source_type: EntityType,
        target: &str,
        target_type: EntityType,
        relation_type: RelationType,
        weight: f64,
        day: u32,
        evidence: &str,
    ) -> RelationMention {
        RelationMention {
            source: Mention::new(source, source_type),
            target: Mention::new(target, target_type),
            relation_type,
            weight,
            timestamp: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            evidence: evidence.to_string(),
        }
    }

    #[test]
    fn duplicate_evidence_is_idempotent() {
        let contract = rel(
            "Constructora Sur",
            EntityType::Company,
            "Ana Ruiz",
            EntityType::Official,
            RelationType::Contract,
            500.0,
            1,
            "doc1",
        );

        let mut once = GraphStore::new();
        once.add_relation(&contract).unwrap();

        let mut twice = GraphStore::new();
        twice.add_relation(&contract).unwrap();
        twice.add_relation(&contract).unwrap();

        assert_eq!(once.relation_count(), twice.relation_count());
        let edge_once = once.edges().next().unwrap();
        let edge_twice = twice.edges().next().unwrap();
        assert_eq!(edge_once.weight, edge_twice.weight);
        assert_eq!(edge_once.timestamps.len(), edge_twice.timestamps.len());
        assert_eq!(edge_once.evidence, edge_twice.evidence);
    }

    #[test]
    fn distinct_evidence_accumulates() {
        let mut store = GraphStore::new();
        store
            .add_relation(&rel(
                "Constructora Sur",
                EntityType::Company,
                "Ana Ruiz",
                EntityType::Official,
                RelationType::Contract,
                500.0,
                5,
                "doc1",
            ))
            .unwrap();
        store
            .add_relation(&rel(
                "Constructora Sur",
                EntityType::Company,
                "Ana Ruiz",
                EntityType::Official,
                RelationType::Contract,
                250.0,
                2,
                "doc2",
            ))
            .unwrap();

        assert_eq!(store.relation_count(), 1);
        let edge = store.edges().next().unwrap();
        assert_eq!(edge.weight, 750.0);
        assert_eq!(edge.evidence.len(), 2);
        // Second observation carried the earlier timestamp; order stays sorted.
        assert!(edge.timestamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn symmetric_relation_stored_once_indexed_both_ways() {
        let mut store = GraphStore::new();
        store
            .add_relation(&rel(
                "Ana Ruiz",
                EntityType::Official,
                "Luis Ruiz",
                EntityType::Beneficiary,
                RelationType::FamilyTie,
                1.0,
                1,
                "doc1",
            ))
            .unwrap();

        assert_eq!(store.relation_count(), 1);
        let ids: Vec<Uuid> = store.entities().map(|e| e.id).collect();
        for id in ids {
            assert_eq!(store.edges_from(id).count(), 1);
            assert_eq!(store.edges_into(id).count(), 1);
            assert_eq!(store.incident_edges(id).len(), 1);
        }
    }

    #[test]
    fn malformed_weight_rejected() {
        let mut store = GraphStore::new();
        let bad = rel(
            "A Co",
            EntityType::Company,
            "B",
            EntityType::Official,
            RelationType::Contract,
            f64::NAN,
            1,
            "doc1",
        );
        assert!(matches!(
            store.add_relation(&bad),
            Err(LuppaError::MalformedRelation(_))
        ));
        let negative = rel(
            "A Co",
            EntityType::Company,
            "B",
            EntityType::Official,
            RelationType::Contract,
            -1.0,
            1,
            "doc1",
        );
        assert!(store.add_relation(&negative).is_err());
    }

    #[test]
    fn batch_continues_past_failures() {
        let mut store = GraphStore::new();
        let batch = vec![
            rel(
                "Constructora Sur",
                EntityType::Company,
                "Ana Ruiz",
                EntityType::Official,
                RelationType::Contract,
                500.0,
                1,
                "doc1",
            ),
            // Type conflict: same canonical name, different entity type.
            rel(
                "Constructora Sur",
                EntityType::Official,
                "Luis Ruiz",
                EntityType::Beneficiary,
                RelationType::Appointment,
                1.0,
                2,
                "doc2",
            ),
            rel(
                "Ana Ruiz",
                EntityType::Official,
                "Luis Ruiz",
                EntityType::Beneficiary,
                RelationType::FamilyTie,
                1.0,
                3,
                "doc3",
            ),
        ];

        let report = store.ingest(&batch);
        assert_eq!(report.relations_ingested, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(store.relation_count(), 2);
    }
}
