//! End-of-session analysis report.
//!
//! The model's JSON is read leniently: missing fields take defaults, scores
//! are clamped, and unrecognised hiring probabilities become `Unknown`. Output
//! that is not JSON at all still yields a report carrying the raw text.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::interview::conversation::InterviewContext;
use crate::interview::prompts::ANALYSIS_PROMPT_TEMPLATE;
use crate::llm_client::lenient::score_0_100;
use crate::llm_client::prompts::{
    fill_template, or_placeholder, JSON_ONLY_SYSTEM, SECOND_PERSON_INSTRUCTION,
};
use crate::llm_client::{strip_json_fences, GenerateRequest, LanguageModel, LlmError};
use crate::models::session::MessageRow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum HiringProbability {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl HiringProbability {
    pub fn as_str(&self) -> &'static str {
        match self {
            HiringProbability::High => "High",
            HiringProbability::Medium => "Medium",
            HiringProbability::Low => "Low",
            HiringProbability::Unknown => "Unknown",
        }
    }
}

impl<'de> Deserialize<'de> for HiringProbability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let parsed = match value.as_str().map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "high" => HiringProbability::High,
            Some(s) if s == "medium" => HiringProbability::Medium,
            Some(s) if s == "low" => HiringProbability::Low,
            _ => HiringProbability::Unknown,
        };
        Ok(parsed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "score_0_100")]
    pub score: i32,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReview {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default, deserialize_with = "score_0_100")]
    pub score: i32,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub improvement: String,
}

/// Report stored on a finished session and returned to the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(default, deserialize_with = "score_0_100")]
    pub score: i32,
    #[serde(default)]
    pub hiring_probability: HiringProbability,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub categories: Vec<CategoryScore>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub questions: Vec<QuestionReview>,
}

impl Analysis {
    fn unparseable(raw: &str) -> Self {
        Self {
            feedback: format!("Could not parse analysis. {}", raw.trim()),
            ..Default::default()
        }
    }

    fn no_answers() -> Self {
        Self {
            feedback: "The session ended before you answered any questions, so there is \
                       nothing to evaluate yet. Answer at least one question next time."
                .to_string(),
            ..Default::default()
        }
    }
}

/// Reads the model's report, falling back to a zero-score report carrying the
/// raw text when it is not a JSON object.
pub fn parse_analysis(raw: &str) -> Analysis {
    match serde_json::from_str::<Analysis>(strip_json_fences(raw)) {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(error = %e, "Session analysis was not valid JSON");
            Analysis::unparseable(raw)
        }
    }
}

/// One line per message, `AI:` or `USER:` prefixed, in conversation order.
pub fn build_transcript(messages: &[MessageRow]) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = if m.is_ai() { "AI" } else { "USER" };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_analysis_prompt(ctx: &InterviewContext<'_>, transcript: &str) -> String {
    fill_template(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("purpose", ctx.purpose.as_str()),
            ("cv_text", or_placeholder(ctx.cv_text, "Not provided")),
            (
                "job_description",
                or_placeholder(ctx.job_description, "Not provided"),
            ),
            ("transcript", transcript),
            ("second_person", SECOND_PERSON_INSTRUCTION),
        ],
    )
}

/// Produces the report for a session's transcript.
///
/// A session the user never answered in gets a fixed report without an LLM
/// call. An LLM failure is returned so the session stays open for a retry.
pub async fn analyze_session(
    llm: &dyn LanguageModel,
    ctx: &InterviewContext<'_>,
    messages: &[MessageRow],
) -> Result<Analysis, LlmError> {
    if messages.iter().all(MessageRow::is_ai) {
        info!("No answers in session, skipping analysis call");
        return Ok(Analysis::no_answers());
    }

    let prompt = build_analysis_prompt(ctx, &build_transcript(messages));
    let request = GenerateRequest {
        system: Some(JSON_ONLY_SYSTEM),
        ..GenerateRequest::json(&prompt)
    };
    let raw = llm.generate(&request).await?;
    let analysis = parse_analysis(&raw);

    info!(
        score = analysis.score,
        hiring_probability = analysis.hiring_probability.as_str(),
        "Session analysed"
    );
    Ok(analysis)
}
