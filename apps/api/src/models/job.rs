use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Active,
    Archived,
    Interviewing,
    Offer,
    Rejected,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Active => "Active",
            JobStatus::Archived => "Archived",
            JobStatus::Interviewing => "Interviewing",
            JobStatus::Offer => "Offer",
            JobStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobApplicationRow {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub company: String,
    pub job_title: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of a job's question bank, including the latest practice result.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRow {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(skip)]
    pub job_id: Uuid,
    pub position: i32,
    pub question: String,
    pub notes: String,
    pub ai_expected_answer: Option<String>,
    pub user_answer: Option<String>,
    pub ai_feedback: Option<String>,
    pub score: Option<i32>,
    pub improved_answer: Option<String>,
    pub practiced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: JobApplicationRow,
    pub questions: Vec<QuestionRow>,
}
