use std::sync::Arc;

use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod handlers;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("luppa=info".parse().unwrap()))
        .init();

    let config = luppa_core::AppConfig::from_env();
    let host = config.server_host.clone();
    let port = config.server_port;

    let session = match luppa_analysis::Session::new(config.analysis.clone()) {
        Ok(session) => Arc::new(RwLock::new(session)),
        Err(e) => {
            tracing::error!("invalid analysis configuration: {e}");
            std::process::exit(1);
        }
    };
    let extractor: Arc<dyn luppa_core::extraction::Extractor> =
        Arc::new(luppa_extraction::LlmExtractor::new(&config));

    let state = AppState {
        config,
        session,
        extractor,
    };

    let app = routes::create_router()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{host}:{port}");
    tracing::info!("LUPPA server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
