//! Codechat - a single-conversation chat assistant for coding questions
//!
//! Serves a browser UI backed by an OpenAI-compatible chat completions
//! endpoint, keeping a bounded history window per request.

mod api;
mod config;
mod conversation;
mod gate;
mod llm;
mod render;
mod runtime;

use api::{create_router, AppState};
use config::AppConfig;
use conversation::Conversation;
use gate::AccessGate;
use llm::{CompletionClient, OpenAIService};
use runtime::ConversationRuntime;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codechat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;

    if config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; completions will fail");
    }

    let service = OpenAIService::new(
        config.api_url.clone(),
        config.api_key.clone().unwrap_or_default(),
        config.model.clone(),
    )?;
    let completion = CompletionClient::new(Arc::new(service));

    let conversation = Conversation::new(config.history_length, config.system_message.clone());
    let handle = ConversationRuntime::start(conversation, completion);

    let gate = match &config.access_hash {
        Some(hash) => AccessGate::with_hash(hash),
        None => AccessGate::open(),
    };
    tracing::info!(
        model = %config.model,
        endpoint = %config.api_url,
        history_length = config.history_length.get(),
        gated = !gate.is_open(),
        "Configuration loaded"
    );

    let state = AppState::new(handle, gate);

    // Create router
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
    tracing::info!("Codechat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
