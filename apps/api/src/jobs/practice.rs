//! Single-question practice: transcribe a recorded answer and have the LLM
//! score it against the question and the user's own notes.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::jobs::prompts::PRACTICE_PROMPT_TEMPLATE;
use crate::llm_client::lenient::score_0_100;
use crate::llm_client::prompts::{
    fill_template, or_placeholder, JSON_ONLY_SYSTEM, SECOND_PERSON_INSTRUCTION,
};
use crate::llm_client::{generate_json, LanguageModel};
use crate::speech::{AudioUpload, SpeechToText};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeEvaluation {
    #[serde(default, deserialize_with = "score_0_100")]
    pub score: i32,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub improved_answer: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeOutcome {
    pub user_answer: String,
    pub analysis: PracticeEvaluation,
}

pub fn build_practice_prompt(question: &str, notes: Option<&str>, answer: &str) -> String {
    fill_template(
        PRACTICE_PROMPT_TEMPLATE,
        &[
            ("question", question),
            ("notes", or_placeholder(notes.unwrap_or_default(), "None")),
            ("answer", answer),
            ("second_person", SECOND_PERSON_INSTRUCTION),
        ],
    )
}

/// Transcribes `audio` and evaluates the transcript as an answer to `question`.
/// A recording with no recognisable speech is rejected before any LLM call.
pub async fn evaluate_practice_answer(
    stt: &dyn SpeechToText,
    llm: &dyn LanguageModel,
    question: &str,
    notes: Option<&str>,
    audio: &AudioUpload,
) -> Result<PracticeOutcome, AppError> {
    let user_answer = stt.transcribe(audio).await?;
    if user_answer.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "No speech was detected in the recording".to_string(),
        ));
    }

    let prompt = build_practice_prompt(question, notes, &user_answer);
    let analysis: PracticeEvaluation =
        generate_json(llm, &prompt, Some(JSON_ONLY_SYSTEM)).await?;

    info!(
        score = analysis.score,
        answer_chars = user_answer.len(),
        "Practice answer evaluated"
    );

    Ok(PracticeOutcome {
        user_answer,
        analysis,
    })
}
