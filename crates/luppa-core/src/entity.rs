use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Official,
    Company,
    Beneficiary,
    Pep,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Contract,
    Employment,
    Ownership,
    FamilyTie,
    Donation,
    Appointment,
}

impl RelationType {
    /// Symmetric relations are stored once under an order-normalized key and
    /// traversable in both directions.
    pub fn is_symmetric(&self) -> bool {
        matches!(self, RelationType::FamilyTie)
    }

    /// Transactional relations anchor cycle and cross-conflict detection.
    pub fn is_transactional(&self) -> bool {
        matches!(self, RelationType::Contract | RelationType::Appointment)
    }

    /// Personal-tie relations form the independent paths searched by the
    /// cross-conflict detector.
    pub fn is_personal_tie(&self) -> bool {
        matches!(
            self,
            RelationType::FamilyTie | RelationType::Ownership | RelationType::Donation
        )
    }
}

/// A canonicalized, deduplicated entity owned by the registry for the
/// lifetime of an analysis session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub entity_type: EntityType,
    /// Normalized form used as the registry lookup key.
    pub canonical_name: String,
    /// The name as it first appeared in a document.
    pub display_name: String,
    pub aliases: BTreeSet<String>,
    pub attributes: BTreeMap<String, String>,
    /// Values displaced by last-write-wins attribute merges, keyed by
    /// attribute name, oldest first.
    pub overwritten: BTreeMap<String, Vec<String>>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Entity {
    pub fn new(entity_type: EntityType, canonical_name: String, display_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            entity_type,
            canonical_name,
            display_name,
            aliases: BTreeSet::new(),
            attributes: BTreeMap::new(),
            overwritten: BTreeMap::new(),
            first_seen: now,
            last_seen: now,
        }
    }
}

/// One raw, untrusted entity mention as produced by an extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    pub name: String,
    pub entity_type: EntityType,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Mention {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
            attributes: BTreeMap::new(),
        }
    }
}

/// One extracted relation observation between two mentions, tied to the
/// document that evidences it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationMention {
    pub source: Mention,
    pub target: Mention,
    pub relation_type: RelationType,
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
    /// Reference to the source document substantiating this observation.
    pub evidence: String,
}

/// Identity of a stored edge. Symmetric relations are keyed with the smaller
/// entity id first so both directions address the same storage slot.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct EdgeKey {
    pub source: Uuid,
    pub target: Uuid,
    pub relation_type: RelationType,
}

impl EdgeKey {
    pub fn new(source: Uuid, target: Uuid, relation_type: RelationType) -> Self {
        if relation_type.is_symmetric() && target < source {
            Self { source: target, target: source, relation_type }
        } else {
            Self { source, target, relation_type }
        }
    }
}

/// A merged edge: every extracted mention of the same (source, target, type)
/// triple collapses into one of these, accumulating weight and evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: Uuid,
    pub target: Uuid,
    pub relation_type: RelationType,
    pub symmetric: bool,
    pub weight: f64,
    /// Kept sorted ascending.
    pub timestamps: Vec<DateTime<Utc>>,
    pub evidence: BTreeSet<String>,
}

impl Edge {
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source, self.target, self.relation_type)
    }

    /// Given one endpoint, returns the opposite one. Callers guarantee `id`
    /// is an endpoint of this edge.
    pub fn other_endpoint(&self, id: Uuid) -> Uuid {
        if self.source == id {
            self.target
        } else {
            self.source
        }
    }

    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }
}
