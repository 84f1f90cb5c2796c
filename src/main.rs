//! Slip agent - human-in-the-loop tool-calling agent for delivery slips
//!
//! Each session alternates between a reasoning step and a tool step, pausing
//! for explicit approval before any tool runs. Sessions survive restarts.

mod api;
mod config;
mod db;
mod history;
mod llm;
mod runtime;
mod state_machine;
mod tools;

use api::{create_router, AppState};
use config::{AppConfig, StoreKind};
use db::Database;
use llm::LlmService;
use runtime::{CheckpointStore, DatabaseStore, MemoryStore, ToolExecutor, WorkflowEngine};
use std::net::SocketAddr;
use std::sync::Arc;
use tools::ToolRegistry;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slip_agent=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;

    // Checkpoint store
    let store: Arc<dyn CheckpointStore> = match &config.store {
        StoreKind::Sqlite(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %path.display(), "Opening checkpoint database");
            Arc::new(DatabaseStore::new(Database::open(path)?))
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory checkpoints; sessions are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Reasoning model
    let llm = config.llm.build_service()?;
    tracing::info!(model = %llm.model_id(), "Reasoning model configured");

    let tools: Arc<dyn ToolExecutor> = Arc::new(ToolRegistry::standard()?);

    let engine = WorkflowEngine::new(store, llm, tools, config.workflow);
    let state = AppState::new(engine);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Slip agent listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
