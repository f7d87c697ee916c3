use anyhow::{bail, Context, Result};

use crate::llm_client::DEFAULT_MODELS;

const DEFAULT_VOICE_ID: &str = "JBFqnCBsd6RMkjVDRZzb";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gemini_api_key: String,
    /// Ordered fallback list; the first model that answers wins.
    pub gemini_models: Vec<String>,
    pub elevenlabs_api_key: String,
    pub elevenlabs_voice_id: String,
    pub jwt_secret: String,
    pub client_url: String,
    /// Marks the auth cookie `Secure`. True when `APP_ENV=production`.
    pub secure_cookies: bool,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let gemini_models = match std::env::var("GEMINI_MODELS") {
            Ok(raw) => parse_model_list(&raw)?,
            Err(_) => DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        };

        let max_upload_mb = std::env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| "25".to_string())
            .parse::<usize>()
            .context("MAX_UPLOAD_MB must be a whole number of megabytes")?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_models,
            elevenlabs_api_key: require_env("ELEVENLABS_API_KEY")?,
            elevenlabs_voice_id: std::env::var("ELEVENLABS_VOICE_ID")
                .unwrap_or_else(|_| DEFAULT_VOICE_ID.to_string()),
            jwt_secret: require_env("JWT_SECRET")?,
            client_url: std::env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            secure_cookies: std::env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Splits a comma-separated model list, dropping blanks. Rejects an empty result.
pub fn parse_model_list(raw: &str) -> Result<Vec<String>> {
    let models: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect();
    if models.is_empty() {
        bail!("GEMINI_MODELS must name at least one model");
    }
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_list_trims_and_keeps_order() {
        let models = parse_model_list(" gemini-2.5-flash , gemini-2.0-flash,,").unwrap();
        assert_eq!(models, vec!["gemini-2.5-flash", "gemini-2.0-flash"]);
    }

    #[test]
    fn test_parse_model_list_rejects_blank() {
        assert!(parse_model_list(" , ").is_err());
    }
}
