use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use luppa_core::entity::{EntityType, Mention, RelationMention, RelationType};
use luppa_core::error::Result;
use luppa_core::extraction::{Extractor, RawDocument};

/// Deterministic line-oriented extractor. Exists so the ingestion and
/// analysis pipeline can be exercised end to end without a network call.
///
/// Each non-empty, non-`#` line of the document body is one relation:
///
/// ```text
/// source_type:source_name|relation|target_type:target_name|weight|timestamp|evidence
/// ```
///
/// The last three fields are optional and default to weight 1.0, the
/// document's collection time, and the document ref. Malformed lines are
/// skipped with a warning, never failing the document.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedExtractor;

impl RuleBasedExtractor {
    pub fn new() -> Self {
        Self
    }

    fn parse_endpoint(token: &str) -> Option<Mention> {
        let (kind, name) = token.split_once(':')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let entity_type = match kind.trim().to_lowercase().as_str() {
            "official" => EntityType::Official,
            "company" => EntityType::Company,
            "beneficiary" => EntityType::Beneficiary,
            "pep" => EntityType::Pep,
            _ => return None,
        };
        Some(Mention::new(name, entity_type))
    }

    fn parse_relation(token: &str) -> Option<RelationType> {
        match token.trim().to_lowercase().as_str() {
            "contract" => Some(RelationType::Contract),
            "employment" => Some(RelationType::Employment),
            "ownership" => Some(RelationType::Ownership),
            "family_tie" => Some(RelationType::FamilyTie),
            "donation" => Some(RelationType::Donation),
            "appointment" => Some(RelationType::Appointment),
            _ => None,
        }
    }

    fn parse_timestamp(token: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(token, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    fn parse_line(line: &str, document: &RawDocument) -> Option<RelationMention> {
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() < 3 || fields.len() > 6 {
            return None;
        }

        let source = Self::parse_endpoint(fields[0])?;
        let relation_type = Self::parse_relation(fields[1])?;
        let target = Self::parse_endpoint(fields[2])?;

        let weight = match fields.get(3).filter(|f| !f.is_empty()) {
            Some(raw) => raw.parse::<f64>().ok()?,
            None => 1.0,
        };
        let timestamp = match fields.get(4).filter(|f| !f.is_empty()) {
            Some(raw) => Self::parse_timestamp(raw)?,
            None => document.collected_at,
        };
        let evidence = match fields.get(5).filter(|f| !f.is_empty()) {
            Some(raw) => raw.to_string(),
            None => document.document_ref.clone(),
        };

        Some(RelationMention {
            source,
            target,
            relation_type,
            weight,
            timestamp,
            evidence,
        })
    }
}

#[async_trait]
impl Extractor for RuleBasedExtractor {
    async fn extract(&self, document: &RawDocument) -> Result<Vec<RelationMention>> {
        let mut relations = Vec::new();
        for (line_no, line) in document.content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match Self::parse_line(line, document) {
                Some(relation) => relations.push(relation),
                None => {
                    tracing::warn!(
                        document_ref = %document.document_ref,
                        line = line_no + 1,
                        "skipping malformed relation line"
                    );
                }
            }
        }
        Ok(relations)
    }
}
