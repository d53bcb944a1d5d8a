use std::sync::Arc;

use tokio::sync::RwLock;

use luppa_analysis::Session;
use luppa_core::extraction::Extractor;
use luppa_core::AppConfig;

/// Shared server state. The session sits behind an async RwLock: ingestion
/// and analysis take the write lock, queries take read locks.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub session: Arc<RwLock<Session>>,
    pub extractor: Arc<dyn Extractor>,
}
