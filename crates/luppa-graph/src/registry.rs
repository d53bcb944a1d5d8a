use std::collections::BTreeMap;

use chrono::Utc;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use luppa_core::entity::{Entity, Mention};
use luppa_core::error::{LuppaError, Result};

/// Normalize an entity name for identity matching: Unicode NFKD fold with
/// combining marks dropped, lowercase, punctuation replaced by spaces,
/// whitespace collapsed.
pub fn canonical_key(name: &str) -> String {
    let folded: String = name.nfkd().filter(|c| !is_combining_mark(*c)).collect();

    let stripped: String = folded
        .chars()
        .flat_map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![' ']
            }
        })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalizes and deduplicates entity mentions across documents. Two
/// mentions whose names canonicalize identically are the same entity;
/// the same canonical name under a different entity type is surfaced as an
/// error rather than silently resolved.
#[derive(Debug, Default, Clone)]
pub struct EntityRegistry {
    entities: BTreeMap<Uuid, Entity>,
    by_key: BTreeMap<String, Uuid>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, mention: &Mention) -> Result<Uuid> {
        let key = canonical_key(&mention.name);
        if key.is_empty() {
            return Err(LuppaError::MalformedRelation(format!(
                "mention name {:?} canonicalizes to nothing",
                mention.name
            )));
        }

        if let Some(&id) = self.by_key.get(&key) {
            let entity = self
                .entities
                .get_mut(&id)
                .ok_or_else(|| LuppaError::Internal(format!("dangling registry key {key:?}")))?;

            if entity.entity_type != mention.entity_type {
                return Err(LuppaError::AmbiguousEntity {
                    name: mention.name.clone(),
                    existing: entity.entity_type,
                    incoming: mention.entity_type,
                });
            }

            let name = mention.name.trim();
            if name != entity.display_name && name != entity.canonical_name {
                entity.aliases.insert(name.to_string());
            }
            Self::merge_attributes(entity, mention);
            entity.last_seen = Utc::now();

            tracing::debug!(entity_id = %id, name = %mention.name, "merged mention into existing entity");
            return Ok(id);
        }

        let mut entity = Entity::new(
            mention.entity_type,
            key.clone(),
            mention.name.trim().to_string(),
        );
        entity.attributes = mention.attributes.clone();

        let id = entity.id;
        self.by_key.insert(key, id);
        self.entities.insert(id, entity);

        tracing::debug!(entity_id = %id, name = %mention.name, "registered new entity");
        Ok(id)
    }

    /// Last-write-wins per attribute key; the displaced value is kept as
    /// provenance instead of being dropped.
    fn merge_attributes(entity: &mut Entity, mention: &Mention) {
        for (k, v) in &mention.attributes {
            match entity.attributes.get(k) {
                Some(old) if old != v => {
                    let old = old.clone();
                    entity.overwritten.entry(k.clone()).or_default().push(old);
                    entity.attributes.insert(k.clone(), v.clone());
                }
                Some(_) => {}
                None => {
                    entity.attributes.insert(k.clone(), v.clone());
                }
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
