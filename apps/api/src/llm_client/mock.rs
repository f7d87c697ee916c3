//! Scripted `LanguageModel` for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChatTurn, GenerateRequest, LanguageModel, LlmError};

/// Owned copy of a request the mock received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system: Option<String>,
    pub history: Vec<ChatTurn>,
    pub prompt: String,
    pub json_mode: bool,
}

/// Replies with queued results in order. Runs dry with `EmptyContent`.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn failing() -> Self {
        Self::new(vec![Err(LlmError::Api {
            status: 503,
            message: "unavailable".into(),
        })])
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            system: request.system.map(String::from),
            history: request.history.to_vec(),
            prompt: request.prompt.to_string(),
            json_mode: request.json_mode,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}
