use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::jwt::JwtKeys;
use crate::config::Config;
use crate::llm_client::LanguageModel;
use crate::speech::{SpeechToText, TextToSpeech};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Gemini with model fallback in production.
    pub llm: Arc<dyn LanguageModel>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
    pub jwt: JwtKeys,
    pub config: Config,
}
