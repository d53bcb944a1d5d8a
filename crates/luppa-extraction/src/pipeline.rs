use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use luppa_core::config::AppConfig;
use luppa_core::entity::{EntityType, Mention, RelationMention, RelationType};
use luppa_core::error::{LuppaError, Result};
use luppa_core::extraction::{DocumentType, Extractor, RawDocument};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const MODEL: &str = "claude-haiku-4-5-20251001";
const MAX_TOKENS: u32 = 4096;

/// LLM-based relation extraction over the Anthropic Messages API. The
/// output stream is untrusted; anything malformed is skipped with a
/// warning and the rest of the document survives.
pub struct LlmExtractor {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

// ── Anthropic Messages API request/response types ──────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

// ── Intermediate JSON schema for LLM output parsing ────────────────────────

#[derive(Debug, Deserialize)]
struct LlmOutput {
    #[serde(default)]
    relations: Vec<LlmRelation>,
}

#[derive(Debug, Deserialize)]
struct LlmRelation {
    source: LlmMention,
    target: LlmMention,
    #[serde(rename = "type")]
    relation_type: String,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LlmMention {
    name: String,
    #[serde(rename = "type")]
    entity_type: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

fn default_weight() -> f64 {
    1.0
}

// ── Implementation ─────────────────────────────────────────────────────────

impl LlmExtractor {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.anthropic_api_key.clone(),
            model: MODEL.to_string(),
        }
    }

    fn build_system_prompt() -> String {
        r#"You are a relation extraction system for a public-integrity analysis platform.

Given a document, extract every relation between public officials, contracting companies, program beneficiaries, and politically exposed persons.

Return ONLY valid JSON (no markdown fences, no commentary) matching this exact schema:

{
  "relations": [
    {
      "source": { "name": "Entity Name", "type": "official | company | beneficiary | pep", "attributes": { "optional": "string pairs" } },
      "target": { "name": "Entity Name", "type": "official | company | beneficiary | pep", "attributes": {} },
      "type": "contract | employment | ownership | family_tie | donation | appointment",
      "weight": contract value or other magnitude as a number; use 1 when unknown,
      "date": "YYYY-MM-DD or null when unknown"
    }
  ]
}

Rules:
- Choose the most specific entity and relation types that apply.
- Only extract relations clearly supported by the text.
- If nothing can be extracted, return {"relations": []}.
- Output ONLY the JSON object. No additional text."#
            .to_string()
    }

    fn build_user_prompt(document: &RawDocument) -> String {
        let mut prompt = String::new();
        if let Some(title) = &document.title {
            prompt.push_str(&format!("Title: {title}\n"));
        }
        prompt.push_str(&format!("Document kind: {}\n", document_kind(document.document_type)));
        prompt.push_str(&format!("\nDocument content:\n{}", document.content));
        prompt
    }

    async fn call_anthropic(&self, document: &RawDocument) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: Self::build_system_prompt(),
            messages: vec![Message {
                role: "user".to_string(),
                content: Self::build_user_prompt(document),
            }],
        };

        tracing::debug!(
            model = %self.model,
            document_ref = %document.document_ref,
            content_len = document.content.len(),
            "sending extraction request to Anthropic API"
        );

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| LuppaError::Extraction(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(LuppaError::Extraction(format!(
                "Anthropic API returned status {status}: {body}"
            )));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LuppaError::Extraction(format!("failed to parse API response: {e}")))?;

        let text = api_response
            .content
            .iter()
            .find_map(|block| {
                if block.block_type == "text" {
                    block.text.clone()
                } else {
                    None
                }
            })
            .ok_or_else(|| {
                LuppaError::Extraction("no text content block in API response".to_string())
            })?;

        tracing::debug!(
            stop_reason = ?api_response.stop_reason,
            response_len = text.len(),
            "received extraction response from Anthropic API"
        );

        Ok(text)
    }

    fn parse_entity_type(s: &str) -> Option<EntityType> {
        match s.to_lowercase().as_str() {
            "official" | "public_official" | "funcionario" => Some(EntityType::Official),
            "company" | "contractor" | "organization" | "empresa" => Some(EntityType::Company),
            "beneficiary" | "beneficiario" => Some(EntityType::Beneficiary),
            "pep" | "ppe" | "politically_exposed_person" => Some(EntityType::Pep),
            _ => {
                tracing::warn!(entity_type = %s, "unknown entity type, skipping mention");
                None
            }
        }
    }

    fn parse_relation_type(s: &str) -> Option<RelationType> {
        match s.to_lowercase().as_str() {
            "contract" | "contrato" | "comercial" => Some(RelationType::Contract),
            "employment" | "employee_of" | "empleo" => Some(RelationType::Employment),
            "ownership" | "owner_of" | "propiedad" => Some(RelationType::Ownership),
            "family_tie" | "family" | "familiar" => Some(RelationType::FamilyTie),
            "donation" | "donacion" => Some(RelationType::Donation),
            "appointment" | "nombramiento" | "politica" => Some(RelationType::Appointment),
            _ => {
                tracing::warn!(relation_type = %s, "unknown relation type, skipping relation");
                None
            }
        }
    }

    /// Accepts RFC 3339 or a bare date. Anything else fails the relation.
    fn parse_timestamp(raw: Option<&str>, fallback: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let Some(raw) = raw else {
            return Some(fallback);
        };
        if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
            return Some(fallback);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    fn parse_llm_response(raw_json: &str, document: &RawDocument) -> Result<Vec<RelationMention>> {
        // Strip markdown code fences the LLM might include despite instructions
        let cleaned = raw_json.trim();
        let cleaned = if cleaned.starts_with("```") {
            let start = cleaned.find('{').unwrap_or(0);
            let end = cleaned.rfind('}').map(|i| i + 1).unwrap_or(cleaned.len());
            &cleaned[start..end]
        } else {
            cleaned
        };

        let output: LlmOutput = serde_json::from_str(cleaned).map_err(|e| {
            tracing::error!(raw = %cleaned, error = %e, "failed to parse LLM extraction JSON");
            LuppaError::Extraction(format!("failed to parse LLM JSON output: {e}"))
        })?;

        let mut relations = Vec::with_capacity(output.relations.len());
        for llm_rel in output.relations {
            let Some(source_type) = Self::parse_entity_type(&llm_rel.source.entity_type) else {
                continue;
            };
            let Some(target_type) = Self::parse_entity_type(&llm_rel.target.entity_type) else {
                continue;
            };
            let Some(relation_type) = Self::parse_relation_type(&llm_rel.relation_type) else {
                continue;
            };
            let Some(timestamp) =
                Self::parse_timestamp(llm_rel.date.as_deref(), document.collected_at)
            else {
                tracing::warn!(date = ?llm_rel.date, "unparseable relation date, skipping relation");
                continue;
            };

            let mut source = Mention::new(llm_rel.source.name, source_type);
            source.attributes = llm_rel.source.attributes;
            let mut target = Mention::new(llm_rel.target.name, target_type);
            target.attributes = llm_rel.target.attributes;

            relations.push(RelationMention {
                source,
                target,
                relation_type,
                weight: llm_rel.weight,
                timestamp,
                evidence: document.document_ref.clone(),
            });
        }

        tracing::info!(relations = relations.len(), "parsed extraction results");
        Ok(relations)
    }
}

fn document_kind(document_type: DocumentType) -> &'static str {
    match document_type {
        DocumentType::AssetDeclaration => "asset declaration",
        DocumentType::PublicContract => "public contract",
        DocumentType::BeneficiaryList => "program beneficiary list",
        DocumentType::InterestDeclaration => "declaration of interests",
        DocumentType::Other => "other",
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn extract(&self, document: &RawDocument) -> Result<Vec<RelationMention>> {
        tracing::info!(
            document_ref = %document.document_ref,
            title = ?document.title,
            "starting relation extraction for document"
        );

        let raw_json = self.call_anthropic(document).await?;
        let relations = Self::parse_llm_response(&raw_json, document)?;

        tracing::info!(
            document_ref = %document.document_ref,
            relations = relations.len(),
            "extraction complete"
        );

        Ok(relations)
    }
}
