use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Extension, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use chat_api_server::config::Settings;
use chat_api_server::handlers;
use chat_api_server::services::memory::{RedisHistoryStore, TokenEstimator};
use chat_api_server::services::{ChatOrchestrator, ConversationMemory, GeminiClient, LlmProvider};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,chat_api_server=debug".to_string()),
        )
        .with_target(true)
        .json()
        .init();

    let settings = Settings::load()?;
    info!(
        "Starting {} v{} ({})",
        settings.app.name,
        env!("CARGO_PKG_VERSION"),
        settings.app.environment
    );

    let store = RedisHistoryStore::new(&settings.redis)?;
    let memory = Arc::new(ConversationMemory::new(
        Box::new(store),
        TokenEstimator::new(),
        settings.redis.ttl_seconds,
        settings.memory.clone(),
    ));

    // Eager connect so a bad store URL fails at startup, not on the
    // first request.
    memory.connect().await?;

    let llm: Arc<dyn LlmProvider> = Arc::new(GeminiClient::new(settings.gemini.clone()));
    let orchestrator = Arc::new(ChatOrchestrator::new(memory.clone(), llm));

    let app = build_router(orchestrator, memory.clone(), settings.clone());

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down application");
    memory.disconnect().await;

    Ok(())
}

fn build_router(
    orchestrator: Arc<ChatOrchestrator>,
    memory: Arc<ConversationMemory>,
    settings: Settings,
) -> Router {
    let cors = match settings.cors.origin_values() {
        None => CorsLayer::permissive(),
        Some(origins) => CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    };

    Router::new()
        .route("/", get(handlers::health::service_info))
        .route("/health", get(handlers::health::health_check))
        .route("/api/chat", post(handlers::chat::chat_stream_handler))
        .route(
            "/api/chat/{session_id}",
            delete(handlers::chat::clear_history_handler),
        )
        .layer(Extension(orchestrator))
        .layer(Extension(memory))
        .layer(Extension(settings))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()),
        )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
