//! Interview turn pipeline.
//!
//! Flow: transcribe answer → build chat history → LLM interviewer reply →
//!       synthesize reply audio. Persistence of the resulting message pair is
//!       left to the caller so both messages land in one transaction.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::interview::prompts::{CONTEXT_TURN_TEMPLATE, INTERVIEWER_SYSTEM_TEMPLATE};
use crate::llm_client::prompts::{fill_template, or_placeholder};
use crate::llm_client::{ChatRole, ChatTurn, GenerateRequest, LanguageModel};
use crate::models::session::MessageRow;
use crate::models::user::Purpose;
use crate::speech::{synthesize_base64, AudioUpload, SpeechToText, TextToSpeech};

/// Reply used when every model fails mid-interview, so the session can go on.
pub const LLM_FALLBACK_REPLY: &str =
    "I'm having trouble connecting to my brain right now. Please continue.";

/// What the interviewer knows about the candidate for the whole session.
#[derive(Debug, Clone, Copy)]
pub struct InterviewContext<'a> {
    pub purpose: Purpose,
    pub cv_text: &'a str,
    pub job_description: &'a str,
}

/// Result of one answered turn, ready to persist.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub user_text: String,
    pub ai_text: String,
    /// Base64 mp3 of `ai_text`; `None` when synthesis failed.
    pub ai_audio: Option<String>,
}

/// Opening line of a new session, chosen by what the user is preparing for.
pub fn greeting_for(purpose: Purpose) -> &'static str {
    match purpose {
        Purpose::JobInterview => {
            "Hello! I've reviewed your CV and the job details. I'm ready to start the interview. \
             Please tell me a little about yourself."
        }
        Purpose::CollegeInterview => {
            "Hello! I've reviewed your application details and your CV. I'm ready to help you \
             prepare for your college interview. Could you start by introducing yourself?"
        }
        Purpose::ScholarshipInterview => {
            "Hello! I've looked over your CV. Let's practice for your scholarship interview. \
             To begin, please tell me a bit about yourself and your academic goals."
        }
        Purpose::GeneralPractice => {
            "Hello! I'm here to help you improve your communication skills. Let's have a casual \
             practice session. Tell me, what's on your mind today?"
        }
    }
}

pub fn interviewer_system(purpose: Purpose) -> String {
    fill_template(INTERVIEWER_SYSTEM_TEMPLATE, &[("purpose", purpose.as_str())])
}

fn context_turn(ctx: &InterviewContext<'_>) -> ChatTurn {
    ChatTurn::user(fill_template(
        CONTEXT_TURN_TEMPLATE,
        &[
            ("cv_text", or_placeholder(ctx.cv_text, "No CV provided")),
            (
                "job_description",
                or_placeholder(ctx.job_description, "No job description provided"),
            ),
        ],
    ))
}

/// Appends a turn, folding it into the previous one when the speaker repeats.
fn push_turn(turns: &mut Vec<ChatTurn>, role: ChatRole, text: &str) {
    match turns.last_mut() {
        Some(last) if last.role == role => {
            last.text.push_str("\n\n");
            last.text.push_str(text);
        }
        _ => turns.push(ChatTurn {
            role,
            text: text.to_string(),
        }),
    }
}

/// Builds the model-facing chat for the next reply.
///
/// The chat always opens with a user turn carrying the CV and job description,
/// followed by the stored messages with `ai` mapped to `model`. Turns strictly
/// alternate; a trailing user turn is folded into the returned prompt.
pub fn build_chat(
    ctx: &InterviewContext<'_>,
    messages: &[MessageRow],
    latest_answer: &str,
) -> (Vec<ChatTurn>, String) {
    let mut turns = vec![context_turn(ctx)];
    for message in messages {
        let role = if message.is_ai() {
            ChatRole::Model
        } else {
            ChatRole::User
        };
        push_turn(&mut turns, role, &message.content);
    }

    let mut prompt = latest_answer.to_string();
    if turns.len() > 1 && turns.last().map(|t| t.role) == Some(ChatRole::User) {
        if let Some(pending) = turns.pop() {
            prompt = format!("{}\n\n{}", pending.text, prompt);
        }
    }

    (turns, prompt)
}

/// Asks the LLM for the interviewer's next line. Never fails: when every
/// model errors the fixed fallback reply is returned instead.
pub async fn interviewer_reply(
    llm: &dyn LanguageModel,
    ctx: &InterviewContext<'_>,
    messages: &[MessageRow],
    latest_answer: &str,
) -> String {
    let (history, prompt) = build_chat(ctx, messages, latest_answer);
    let system = interviewer_system(ctx.purpose);
    let request = GenerateRequest {
        system: Some(&system),
        history: &history,
        prompt: &prompt,
        json_mode: false,
    };

    match llm.generate(&request).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            warn!("Interviewer reply was empty, using fallback");
            LLM_FALLBACK_REPLY.to_string()
        }
        Err(e) => {
            warn!(error = %e, "Interviewer reply failed, using fallback");
            LLM_FALLBACK_REPLY.to_string()
        }
    }
}

/// Runs one voice turn: transcribe `audio`, get the interviewer's reply to it
/// given the prior `messages`, and synthesize the reply.
///
/// Transcription failure or a blank transcript aborts the turn; LLM and TTS
/// failures degrade gracefully.
pub async fn run_turn(
    stt: &dyn SpeechToText,
    llm: &dyn LanguageModel,
    tts: &dyn TextToSpeech,
    ctx: &InterviewContext<'_>,
    messages: &[MessageRow],
    audio: &AudioUpload,
) -> Result<TurnOutcome, AppError> {
    let user_text = stt.transcribe(audio).await?;
    if user_text.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "No speech was detected in the recording".to_string(),
        ));
    }
    info!(chars = user_text.len(), "Answer transcribed");

    let ai_text = interviewer_reply(llm, ctx, messages, &user_text).await;
    let ai_audio = synthesize_base64(tts, &ai_text).await;

    Ok(TurnOutcome {
        user_text,
        ai_text,
        ai_audio,
    })
}
