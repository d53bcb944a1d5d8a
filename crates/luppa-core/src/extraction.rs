use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::RelationMention;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    AssetDeclaration,
    PublicContract,
    BeneficiaryList,
    InterestDeclaration,
    Other,
}

/// A document handed to an extractor. The core never reads files or network
/// itself; ingestion happens upstream of this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    /// Stable reference used as the evidence identifier for every relation
    /// extracted from this document.
    pub document_ref: String,
    pub title: Option<String>,
    pub document_type: DocumentType,
    pub content: String,
    pub collected_at: DateTime<Utc>,
}

/// Extraction backend seam. Any rule-based or model-backed implementation
/// satisfies it; the output stream is treated as untrusted and possibly
/// duplicate-laden, which is why all dedupe and merge logic lives in the
/// registry and graph builder.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, document: &RawDocument) -> Result<Vec<RelationMention>>;
}
