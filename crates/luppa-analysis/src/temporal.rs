use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use luppa_core::config::AnalysisConfig;
use luppa_core::entity::EdgeKey;
use luppa_core::pattern::{PatternInstance, PatternType};
use luppa_graph::GraphStore;

/// Flags entities whose relation activity bursts: a rolling window holding
/// more observations than a multiple of the entity's trailing baseline
/// rate. Entities without enough history are skipped rather than flagged on
/// sparse data.
pub fn detect(store: &GraphStore, config: &AnalysisConfig) -> Vec<PatternInstance> {
    let window = Duration::days(config.burst_window_days);
    let window_days = config.burst_window_days as f64;

    let mut instances = Vec::new();

    for entity in store.entities() {
        let incident = store.incident_edges(entity.id);
        let mut observations: Vec<DateTime<Utc>> = incident
            .iter()
            .flat_map(|e| e.timestamps.iter().copied())
            .collect();
        observations.sort_unstable();

        let Some(burst) = strongest_burst(&observations, window, window_days, config) else {
            continue;
        };

        let edge_refs: BTreeSet<EdgeKey> = incident
            .iter()
            .filter(|e| {
                e.timestamps
                    .iter()
                    .any(|t| *t > burst.start && *t <= burst.end)
            })
            .map(|e| e.key())
            .collect();
        let evidence: BTreeSet<&String> = edge_refs
            .iter()
            .filter_map(|k| store.edge(k))
            .flat_map(|e| e.evidence.iter())
            .collect();

        instances.push(PatternInstance {
            id: Uuid::new_v4(),
            pattern_type: PatternType::TemporalAnomaly,
            entity_ids: vec![entity.id],
            edge_refs,
            raw_score: burst.ratio,
            evidence_count: evidence.len(),
            explanation: format!(
                "{}: {} new relation observations between {} and {}, {:.1}x the trailing baseline",
                entity.display_name,
                burst.count,
                burst.start.format("%Y-%m-%d"),
                burst.end.format("%Y-%m-%d"),
                burst.ratio
            ),
        });
    }

    instances.sort_by(|a, b| {
        b.raw_score
            .partial_cmp(&a.raw_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.evidence_count.cmp(&a.evidence_count))
            .then(a.entity_ids.cmp(&b.entity_ids))
    });

    tracing::debug!(count = instances.len(), "temporal anomaly detection complete");
    instances
}

struct Burst {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    count: usize,
    ratio: f64,
}

/// Slides a window ending at each observation and compares its count
/// against the expectation from the trailing baseline rate. Returns the
/// strongest burst exceeding the configured multiplier, if any.
fn strongest_burst(
    observations: &[DateTime<Utc>],
    window: Duration,
    window_days: f64,
    config: &AnalysisConfig,
) -> Option<Burst> {
    let first = *observations.first()?;
    let mut best: Option<Burst> = None;

    for (i, &end) in observations.iter().enumerate() {
        let start = end - window;

        let prior = observations.partition_point(|t| *t <= start);
        if prior < config.min_baseline_observations {
            continue;
        }
        let baseline_days = duration_days(start - first);
        if baseline_days <= 0.0 {
            continue;
        }

        let count = i + 1 - prior;
        let expected = (prior as f64 / baseline_days) * window_days;
        if expected <= 0.0 {
            continue;
        }

        let ratio = count as f64 / expected;
        if count as f64 <= config.burst_multiplier * expected {
            continue;
        }

        let stronger = best.as_ref().map(|b| ratio > b.ratio).unwrap_or(true);
        if stronger {
            best = Some(Burst { start, end, count, ratio });
        }
    }
    best
}

fn duration_days(d: Duration) -> f64 {
    d.num_seconds() as f64 / 86_400.0
}
