//! Question generation: asks the LLM for a batch of likely interview questions
//! for one application, grounded in the user's CV and the job description.

use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::jobs::prompts::QUESTION_PROMPT_TEMPLATE;
use crate::llm_client::prompts::{fill_template, or_placeholder, JSON_ONLY_SYSTEM};
use crate::llm_client::{generate_json, LanguageModel};
use crate::models::job::JobApplicationRow;
use crate::models::user::UserRow;

/// Questions requested per generation call.
pub const QUESTION_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub ai_expected_answer: Option<String>,
}

/// The model sometimes wraps the array in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionBatch {
    List(Vec<GeneratedQuestion>),
    Wrapped { questions: Vec<GeneratedQuestion> },
}

impl QuestionBatch {
    fn into_vec(self) -> Vec<GeneratedQuestion> {
        match self {
            QuestionBatch::List(list) => list,
            QuestionBatch::Wrapped { questions } => questions,
        }
    }
}

pub fn build_question_prompt(user: &UserRow, job: &JobApplicationRow) -> String {
    let count = QUESTION_BATCH_SIZE.to_string();
    fill_template(
        QUESTION_PROMPT_TEMPLATE,
        &[
            ("count", count.as_str()),
            ("purpose", user.purpose().as_str()),
            ("cv_text", or_placeholder(&user.cv_text, "No CV provided")),
            (
                "description",
                or_placeholder(&job.description, "No description provided"),
            ),
            ("job_title", job.job_title.as_str()),
            ("company", job.company.as_str()),
        ],
    )
}

/// Trims every question and drops the blank ones.
fn clean_questions(raw: Vec<GeneratedQuestion>) -> Vec<GeneratedQuestion> {
    raw.into_iter()
        .filter_map(|q| {
            let question = q.question.trim().to_string();
            if question.is_empty() {
                return None;
            }
            let ai_expected_answer = q
                .ai_expected_answer
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty());
            Some(GeneratedQuestion {
                question,
                ai_expected_answer,
            })
        })
        .collect()
}

pub async fn generate_questions(
    llm: &dyn LanguageModel,
    user: &UserRow,
    job: &JobApplicationRow,
) -> Result<Vec<GeneratedQuestion>, AppError> {
    let prompt = build_question_prompt(user, job);
    let batch: QuestionBatch = generate_json(llm, &prompt, Some(JSON_ONLY_SYSTEM)).await?;

    let raw = batch.into_vec();
    let received = raw.len();
    let questions = clean_questions(raw);
    if questions.len() < received {
        warn!(
            "Dropped {} blank generated questions for job {}",
            received - questions.len(),
            job.id
        );
    }
    if questions.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "The AI did not return any usable questions. Please try again.".to_string(),
        ));
    }

    info!("Generated {} questions for job {}", questions.len(), job.id);
    Ok(questions)
}
