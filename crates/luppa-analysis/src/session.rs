use chrono::Utc;
use uuid::Uuid;

use luppa_core::api_types::{BatchReport, GraphExport, SubgraphView};
use luppa_core::config::AnalysisConfig;
use luppa_core::entity::RelationMention;
use luppa_core::error::Result;
use luppa_core::extraction::{Extractor, RawDocument};
use luppa_core::pattern::{AnalysisReport, PatternInstance, PatternType, RiskScore};
use luppa_graph::GraphStore;

/// One analysis session: a single graph, its registry, and the cached
/// output of the last detect-then-score pass. Session state is never
/// ambient; dropping or resetting the session discards everything.
#[derive(Debug, Clone)]
pub struct Session {
    config: AnalysisConfig,
    store: GraphStore,
    analysis: Option<AnalysisReport>,
}

impl Session {
    /// Fails fast on a nonsensical configuration rather than letting bad
    /// thresholds shape every later detection run.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store: GraphStore::new(),
            analysis: None,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Ingests pre-extracted relations. Any cached analysis is stale once
    /// the graph changes.
    pub fn ingest_relations(&mut self, relations: &[RelationMention]) -> BatchReport {
        self.analysis = None;
        self.store.ingest(relations)
    }

    /// Runs a document through the extractor and ingests whatever it
    /// yields. Extraction failures surface; ingestion failures accumulate
    /// in the report per relation.
    pub async fn ingest_document(
        &mut self,
        extractor: &dyn Extractor,
        document: &RawDocument,
    ) -> Result<BatchReport> {
        let relations = extractor.extract(document).await?;
        tracing::info!(
            document_ref = %document.document_ref,
            relations = relations.len(),
            "extracted relations from document"
        );
        Ok(self.ingest_relations(&relations))
    }

    /// One full detect-then-score pass over the current graph snapshot.
    /// Always recomputes from scratch; prior instances are discarded, never
    /// patched.
    pub fn analyze(&mut self) -> Result<&AnalysisReport> {
        let instances = crate::run_detectors(&self.store, &self.config)?;
        let scores = crate::scoring::score_all(&self.store, &instances, &self.config);

        tracing::info!(
            instances = instances.len(),
            entities = scores.len(),
            "analysis pass complete"
        );

        self.analysis = Some(AnalysisReport {
            instances,
            scores,
            ran_at: Utc::now(),
        });
        Ok(self.analysis.as_ref().expect("just set"))
    }

    pub fn last_analysis(&self) -> Option<&AnalysisReport> {
        self.analysis.as_ref()
    }

    /// Top `n` entities by aggregate risk, descending; ties broken by id so
    /// the ranking is stable.
    pub fn top_risk(&self, n: usize) -> Vec<RiskScore> {
        let Some(report) = &self.analysis else {
            return Vec::new();
        };
        let mut scores: Vec<RiskScore> = report.scores.values().cloned().collect();
        scores.sort_by(|a, b| {
            b.aggregate_score
                .partial_cmp(&a.aggregate_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.entity_id.cmp(&b.entity_id))
        });
        scores.truncate(n);
        scores
    }

    /// Instances of one pattern type, descending raw score.
    pub fn patterns_by_type(&self, pattern_type: PatternType) -> Vec<PatternInstance> {
        let Some(report) = &self.analysis else {
            return Vec::new();
        };
        let mut instances: Vec<PatternInstance> = report
            .instances
            .iter()
            .filter(|i| i.pattern_type == pattern_type)
            .cloned()
            .collect();
        instances.sort_by(|a, b| {
            b.raw_score
                .partial_cmp(&a.raw_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        instances
    }

    pub fn subgraph(&self, seeds: &[Uuid], hop_radius: usize) -> SubgraphView {
        let scores = self.analysis.as_ref().map(|r| &r.scores);
        self.store.subgraph(seeds, hop_radius, scores)
    }

    pub fn export(&self) -> GraphExport {
        self.store.export(self.analysis.as_ref())
    }

    /// Explicit new-session boundary: drops the graph, registry, and any
    /// cached analysis.
    pub fn reset(&mut self) {
        self.store.clear();
        self.analysis = None;
        tracing::info!("session reset");
    }
}
