mod auth;
mod config;
mod db;
mod errors;
mod extract;
mod interview;
mod jobs;
mod llm_client;
mod models;
mod routes;
mod speech;
mod state;
mod upload;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::jwt::JwtKeys;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::GeminiClient;
use crate::routes::{build_router, cors_layer};
use crate::speech::ElevenLabsClient;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview Coach API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs pending migrations)
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_models.clone())?;
    info!("LLM client initialized (models: {})", llm.models().join(", "));

    // One ElevenLabs client serves both directions
    let speech = Arc::new(ElevenLabsClient::new(
        config.elevenlabs_api_key.clone(),
        config.elevenlabs_voice_id.clone(),
    )?);
    info!("Speech client initialized (voice: {})", config.elevenlabs_voice_id);

    let cors = cors_layer(&config.client_url)?;

    // Build app state
    let state = AppState {
        db,
        llm: Arc::new(llm),
        stt: speech.clone(),
        tts: speech,
        jwt: JwtKeys::new(&config.jwt_secret),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
