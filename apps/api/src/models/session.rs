use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Ai,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::Ai => "ai",
            MessageRole::User => "user",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_application_id: Option<Uuid>,
    pub cv_text: String,
    pub job_description: String,
    pub analysis: Option<Value>,
    pub score: i32,
    pub hiring_probability: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRow {
    /// A session is finalized once its analysis has been written.
    pub fn is_finished(&self) -> bool {
        self.analysis.is_some()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MessageRow {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(skip)]
    pub session_id: Uuid,
    pub seq: i32,
    pub role: String,
    pub content: String,
    pub audio: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessageRow {
    pub fn is_ai(&self) -> bool {
        self.role == MessageRole::Ai.as_str()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: SessionRow,
    pub messages: Vec<MessageRow>,
}

/// History listing entry, joined with the linked job when there is one.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummaryRow {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub score: i32,
    pub hiring_probability: String,
    pub message_count: i64,
    pub analysis: Option<Value>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub job_application_id: Option<Uuid>,
}
