pub mod concentration;
pub mod conflict;
pub mod cycles;
pub mod scoring;
pub mod session;
pub mod temporal;

use luppa_core::config::AnalysisConfig;
use luppa_core::error::Result;
use luppa_core::pattern::PatternInstance;
use luppa_graph::GraphStore;

pub use scoring::score_all;
pub use session::Session;

/// Runs all four detectors against a frozen graph snapshot. Each detector
/// is an independent pure read of the graph; output order is fixed by
/// detector, then by each detector's own ranking. Configuration is
/// validated before anything runs.
pub fn run_detectors(store: &GraphStore, config: &AnalysisConfig) -> Result<Vec<PatternInstance>> {
    config.validate()?;

    let mut instances = cycles::detect(store, config);
    instances.extend(concentration::detect(store, config));
    instances.extend(conflict::detect(store, config));
    instances.extend(temporal::detect(store, config));

    tracing::info!(total = instances.len(), "all detectors complete");
    Ok(instances)
}
