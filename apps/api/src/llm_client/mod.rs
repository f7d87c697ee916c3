/// LLM Client: the single point of entry for all Gemini calls.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All LLM interactions MUST go through the `LanguageModel` trait defined here.
///
/// Requests walk an ordered list of models and return the first success.
use std::future::Future;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod lenient;
pub mod prompts;

#[cfg(test)]
pub mod mock;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Fallback order used when `GEMINI_MODELS` is not set.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-flash-preview-09-2025",
    "gemini-2.0-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash-lite",
];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("No models configured")]
    NoModels,

    #[error("All {attempted} models failed. Last error: {last}")]
    AllModelsFailed { attempted: usize, last: Box<LlmError> },
}

/// Speaker of a chat turn as the model sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// One generation request. `prompt` is the newest user message; `history`
/// holds the earlier turns of a multi-turn chat (empty for single-shot calls).
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateRequest<'a> {
    pub system: Option<&'a str>,
    pub history: &'a [ChatTurn],
    pub prompt: &'a str,
    pub json_mode: bool,
}

impl<'a> GenerateRequest<'a> {
    pub fn json(prompt: &'a str) -> Self {
        Self {
            prompt,
            json_mode: true,
            ..Default::default()
        }
    }
}

/// Text generation backend. Carried in `AppState` as `Arc<dyn LanguageModel>`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, LlmError>;
}

/// Generates in JSON mode and deserializes the reply.
/// The prompt must instruct the model to return valid JSON.
pub async fn generate_json<T: DeserializeOwned>(
    llm: &dyn LanguageModel,
    prompt: &str,
    system: Option<&str>,
) -> Result<T, LlmError> {
    let request = GenerateRequest {
        system,
        prompt,
        json_mode: true,
        ..Default::default()
    };
    let text = llm.generate(&request).await?;
    serde_json::from_str(strip_json_fences(&text)).map_err(LlmError::Parse)
}

/// Runs `attempt` against each model in order and returns the first success.
/// Fails only when every model errors, carrying the last error.
pub async fn with_model_fallback<'m, T, F, Fut>(
    models: &'m [String],
    mut attempt: F,
) -> Result<T, LlmError>
where
    F: FnMut(&'m str) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut last_error: Option<LlmError> = None;

    for model in models {
        debug!(model = %model, "Attempting LLM request");
        match attempt(model.as_str()).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(model = %model, error = %e, "LLM model failed, falling back");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(last) => Err(LlmError::AllModelsFailed {
            attempted: models.len(),
            last: Box::new(last),
        }),
        None => Err(LlmError::NoModels),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent<'a>>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<ChatRole>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GeminiResponse {
    /// Concatenates the text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

fn build_request<'a>(request: &GenerateRequest<'a>) -> GeminiRequest<'a> {
    let mut contents: Vec<GeminiContent<'a>> = request
        .history
        .iter()
        .map(|turn| GeminiContent {
            role: Some(turn.role),
            parts: vec![GeminiPart { text: &turn.text }],
        })
        .collect();
    contents.push(GeminiContent {
        role: Some(ChatRole::User),
        parts: vec![GeminiPart {
            text: request.prompt,
        }],
    });

    GeminiRequest {
        system_instruction: request.system.map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart { text }],
        }),
        contents,
        generation_config: GenerationConfig {
            response_mime_type: if request.json_mode {
                "application/json"
            } else {
                "text/plain"
            },
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Gemini `generateContent` client with ordered model fallback.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    models: Vec<String>,
}

impl GeminiClient {
    pub fn new(api_key: String, models: Vec<String>) -> Result<Self, LlmError> {
        if models.is_empty() {
            return Err(LlmError::NoModels);
        }
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
            models,
        })
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    async fn generate_with_model(
        &self,
        model: &str,
        body: &GeminiRequest<'_>,
    ) -> Result<String, LlmError> {
        let url = format!("{GEMINI_API_URL}/models/{model}:generateContent");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GeminiResponse = response.json().await?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                model,
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "LLM call succeeded"
            );
        }

        parsed.text().ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, LlmError> {
        let body = build_request(request);
        with_model_fallback(&self.models, |model| self.generate_with_model(model, &body)).await
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n[1, 2]\n```";
        assert_eq!(strip_json_fences(input), "[1, 2]");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "  {\"key\": \"value\"}\n";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[tokio::test]
    async fn test_fallback_returns_first_success() {
        let list = models(&["a", "b", "c"]);
        let tried = Mutex::new(Vec::new());

        let result = with_model_fallback(&list, |model| {
            tried.lock().unwrap().push(model.to_string());
            async move {
                if model == "a" {
                    Err(LlmError::EmptyContent)
                } else {
                    Ok(format!("answer from {model}"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "answer from b");
        assert_eq!(*tried.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_fallback_surfaces_last_error() {
        let list = models(&["a", "b"]);

        let err = with_model_fallback(&list, |model| async move {
            Err::<String, _>(LlmError::Api {
                status: 503,
                message: format!("{model} overloaded"),
            })
        })
        .await
        .unwrap_err();

        match err {
            LlmError::AllModelsFailed { attempted, last } => {
                assert_eq!(attempted, 2);
                assert!(last.to_string().contains("b overloaded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fallback_with_no_models() {
        let err = with_model_fallback(&[], |_| async { Ok::<_, LlmError>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NoModels));
    }

    #[test]
    fn test_client_rejects_empty_model_list() {
        assert!(matches!(
            GeminiClient::new("key".into(), vec![]),
            Err(LlmError::NoModels)
        ));
    }

    #[test]
    fn test_build_request_appends_prompt_after_history() {
        let history = vec![ChatTurn::user("context"), ChatTurn::model("hello")];
        let request = GenerateRequest {
            system: Some("be brief"),
            history: &history,
            prompt: "my answer",
            json_mode: false,
        };

        let body = serde_json::to_value(build_request(&request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["role"], "user");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "my answer");
        assert_eq!(body["generationConfig"]["responseMimeType"], "text/plain");
    }

    #[test]
    fn test_build_request_json_mode() {
        let body = serde_json::to_value(build_request(&GenerateRequest::json("x"))).unwrap();
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let json = r#"{
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "there"}]}}],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 2}
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello there"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(response.text().is_none());
    }

    #[tokio::test]
    async fn test_generate_json_strips_fences() {
        let llm = mock::ScriptedModel::new(vec![Ok("```json\n{\"score\": 7}\n```".into())]);
        let value: serde_json::Value = generate_json(&llm, "rate", None).await.unwrap();
        assert_eq!(value["score"], 7);
        assert!(llm.requests()[0].json_mode);
    }
}
