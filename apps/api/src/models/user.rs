use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// What the user is preparing for. Shapes greetings and prompt framing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Purpose {
    #[default]
    #[serde(rename = "Job Interview")]
    JobInterview,
    #[serde(rename = "College Interview")]
    CollegeInterview,
    #[serde(rename = "Scholarship Interview")]
    ScholarshipInterview,
    #[serde(rename = "General Practice")]
    GeneralPractice,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::JobInterview => "Job Interview",
            Purpose::CollegeInterview => "College Interview",
            Purpose::ScholarshipInterview => "Scholarship Interview",
            Purpose::GeneralPractice => "General Practice",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [
            Purpose::JobInterview,
            Purpose::CollegeInterview,
            Purpose::ScholarshipInterview,
            Purpose::GeneralPractice,
        ]
        .into_iter()
        .find(|p| p.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub purpose: String,
    pub password_hash: String,
    pub cv_text: String,
    pub job_description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Stored purpose, falling back to the default for unknown values.
    pub fn purpose(&self) -> Purpose {
        Purpose::parse(&self.purpose).unwrap_or_default()
    }
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub purpose: Purpose,
    pub cv_text: String,
    pub job_description: String,
}

impl From<&UserRow> for ProfileResponse {
    fn from(user: &UserRow) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            purpose: user.purpose(),
            cv_text: user.cv_text.clone(),
            job_description: user.job_description.clone(),
        }
    }
}
