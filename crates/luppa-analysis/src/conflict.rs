use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use luppa_core::config::AnalysisConfig;
use luppa_core::entity::{Edge, EdgeKey};
use luppa_core::pattern::{PatternInstance, PatternType};
use luppa_graph::GraphStore;

/// For every pair of entities connected by a contract or appointment edge,
/// looks for an independent personal-tie path (family, ownership, donation;
/// direction ignored) between the same two parties. The tie only counts as
/// a second, latent relation when it is evidenced by at least one document
/// none of the pair's transactional edges carry. One instance per pair.
pub fn detect(store: &GraphStore, config: &AnalysisConfig) -> Vec<PatternInstance> {
    let mut pairs: BTreeMap<(Uuid, Uuid), Vec<&Edge>> = BTreeMap::new();
    for edge in store.edges() {
        if edge.relation_type.is_transactional() {
            let pair = ordered_pair(edge.source, edge.target);
            pairs.entry(pair).or_default().push(edge);
        }
    }

    let mut instances = Vec::new();
    for ((a, b), transactional) in &pairs {
        let transactional_evidence: BTreeSet<&String> = transactional
            .iter()
            .flat_map(|e| e.evidence.iter())
            .collect();
        if let Some(path) = independent_path(
            store,
            *a,
            *b,
            &transactional_evidence,
            config.conflict_max_path_len,
        ) {
            instances.push(to_instance(
                store,
                transactional,
                path,
                config.conflict_max_path_len,
            ));
        }
    }

    instances.sort_by(|a, b| {
        b.raw_score
            .partial_cmp(&a.raw_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.evidence_count.cmp(&a.evidence_count))
            .then(a.entity_ids.cmp(&b.entity_ids))
    });

    tracing::debug!(count = instances.len(), "cross-conflict detection complete");
    instances
}

fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

struct TiePath {
    /// Entities from one transactional endpoint to the other, inclusive.
    nodes: Vec<Uuid>,
    edges: Vec<EdgeKey>,
}

/// Shortest qualifying personal-tie path between the two parties, searched
/// by iterative deepening so a direct tie always wins over an indirect one.
fn independent_path(
    store: &GraphStore,
    from: Uuid,
    to: Uuid,
    transactional_evidence: &BTreeSet<&String>,
    max_len: usize,
) -> Option<TiePath> {
    for len in 1..=max_len {
        let mut nodes = vec![from];
        let mut edges = Vec::new();
        if let Some(path) = dfs(store, to, transactional_evidence, len, &mut nodes, &mut edges) {
            return Some(path);
        }
    }
    None
}

fn dfs(
    store: &GraphStore,
    goal: Uuid,
    transactional_evidence: &BTreeSet<&String>,
    remaining: usize,
    nodes: &mut Vec<Uuid>,
    edges: &mut Vec<EdgeKey>,
) -> Option<TiePath> {
    if remaining == 0 {
        return None;
    }
    let current = *nodes.last().expect("path never empty");

    for edge in store.incident_edges(current) {
        if !edge.relation_type.is_personal_tie() {
            continue;
        }
        let key = edge.key();
        if edges.contains(&key) {
            continue;
        }
        let next = edge.other_endpoint(current);

        if next == goal {
            let mut full_edges = edges.clone();
            full_edges.push(key);
            let mut full_nodes = nodes.clone();
            full_nodes.push(next);
            let candidate = TiePath {
                nodes: full_nodes,
                edges: full_edges,
            };
            if has_independent_evidence(store, transactional_evidence, &candidate) {
                return Some(candidate);
            }
            continue;
        }

        if !nodes.contains(&next) {
            nodes.push(next);
            edges.push(key);
            let found = dfs(store, goal, transactional_evidence, remaining - 1, nodes, edges);
            edges.pop();
            nodes.pop();
            if found.is_some() {
                return found;
            }
        }
    }
    None
}

/// The path must contribute evidence the transactional side does not carry;
/// otherwise both observations trace back to one latent relation.
fn has_independent_evidence(
    store: &GraphStore,
    transactional_evidence: &BTreeSet<&String>,
    path: &TiePath,
) -> bool {
    path.edges
        .iter()
        .filter_map(|k| store.edge(k))
        .flat_map(|e| e.evidence.iter())
        .any(|doc| !transactional_evidence.contains(doc))
}

fn to_instance(
    store: &GraphStore,
    transactional: &[&Edge],
    path: TiePath,
    max_len: usize,
) -> PatternInstance {
    let path_len = path.edges.len();
    let raw_score = (max_len as f64 + 1.0 - path_len as f64) / max_len as f64;

    let mut edge_refs: BTreeSet<EdgeKey> = path.edges.iter().copied().collect();
    for edge in transactional {
        edge_refs.insert(edge.key());
    }

    let evidence: BTreeSet<&String> = edge_refs
        .iter()
        .filter_map(|k| store.edge(k))
        .flat_map(|e| e.evidence.iter())
        .collect();

    let name = |id: Uuid| {
        store
            .entity(id)
            .map(|e| e.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let first = *path.nodes.first().expect("path has endpoints");
    let last = *path.nodes.last().expect("path has endpoints");

    PatternInstance {
        id: Uuid::new_v4(),
        pattern_type: PatternType::CrossConflict,
        entity_ids: path.nodes,
        edge_refs,
        raw_score,
        evidence_count: evidence.len(),
        explanation: format!(
            "transactional relation between {} and {} coexists with an independent {}-hop personal tie",
            name(first),
            name(last),
            path_len
        ),
    }
}
