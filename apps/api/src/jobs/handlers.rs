//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::jobs::practice::{evaluate_practice_answer, PracticeOutcome};
use crate::jobs::questions::generate_questions;
use crate::jobs::store::{self, JobUpdate, NewJob};
use crate::models::job::{JobDetail, JobStatus};
use crate::state::AppState;
use crate::upload::FormData;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub description: Option<String>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotesRequest {
    pub question_id: Uuid,
    #[serde(default)]
    pub notes: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("{field} is not a valid id")))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobDetail>), AppError> {
    let company = req.company.trim();
    let job_title = req.job_title.trim();
    if company.is_empty() || job_title.is_empty() {
        return Err(AppError::Validation(
            "company and jobTitle are required".to_string(),
        ));
    }

    let job = store::insert_job(
        &state.db,
        NewJob {
            user_id: user.id,
            company,
            job_title,
            description: req.description.trim(),
        },
    )
    .await?;

    info!("Created job application {} for user {}", job.id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(JobDetail {
            job,
            questions: vec![],
        }),
    ))
}

/// GET /api/jobs
///
/// Newest first, each with its question bank.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<JobDetail>>, AppError> {
    let jobs = store::list_jobs(&state.db, user.id).await?;
    let ids: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
    let questions = store::list_questions_for_jobs(&state.db, &ids).await?;
    Ok(Json(store::attach_questions(jobs, questions)))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobDetail>, AppError> {
    let job = store::find_owned_job(&state.db, job_id, user.id).await?;
    Ok(Json(store::load_job_detail(&state.db, job).await?))
}

/// PATCH /api/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateJobRequest>,
) -> Result<Json<JobDetail>, AppError> {
    store::find_owned_job(&state.db, job_id, user.id).await?;

    let update = JobUpdate {
        company: non_blank(req.company),
        job_title: non_blank(req.job_title),
        description: req.description.map(|d| d.trim().to_string()),
        status: req.status,
    };
    let job = store::update_job(&state.db, job_id, &update).await?;
    Ok(Json(store::load_job_detail(&state.db, job).await?))
}

/// DELETE /api/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    store::find_owned_job(&state.db, job_id, user.id).await?;
    store::delete_job(&state.db, job_id).await?;
    info!("Deleted job application {job_id}");
    Ok(Json(json!({ "message": "Job removed" })))
}

/// POST /api/jobs/:id/generate-questions
///
/// Appends a fresh batch of AI-generated questions to the job's question bank.
pub async fn handle_generate_questions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobDetail>, AppError> {
    let job = store::find_owned_job(&state.db, job_id, user.id).await?;

    let questions = generate_questions(state.llm.as_ref(), &user, &job).await?;
    store::append_questions(&state.db, job.id, &questions).await?;

    Ok(Json(store::load_job_detail(&state.db, job).await?))
}

/// PUT /api/jobs/:id/questions
pub async fn handle_update_question_notes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateNotesRequest>,
) -> Result<Json<JobDetail>, AppError> {
    let job = store::find_owned_job(&state.db, job_id, user.id).await?;

    let updated = store::update_question_notes(&state.db, job.id, req.question_id, &req.notes).await?;
    if !updated {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(Json(store::load_job_detail(&state.db, job).await?))
}

/// POST /api/jobs/practice
///
/// Multipart form: `audio` (required), `question` (required), `notes`, and
/// optionally `jobId` + `questionId` to store the result on that question.
pub async fn handle_practice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Json<PracticeOutcome>, AppError> {
    let mut form = FormData::read(multipart).await?;

    let audio = form
        .take_file("audio")
        .ok_or_else(|| AppError::Validation("No audio file uploaded".to_string()))?
        .into_audio();
    let question = form
        .text("question")
        .ok_or_else(|| AppError::Validation("question is required".to_string()))?
        .to_string();
    let notes = form.text("notes").map(String::from);

    // Resolve the target question before spending any AI calls on it.
    let target = match (form.text("jobId"), form.text("questionId")) {
        (Some(job_id), Some(question_id)) => {
            let job_id = parse_uuid(job_id, "jobId")?;
            let question_id = parse_uuid(question_id, "questionId")?;
            store::find_owned_job(&state.db, job_id, user.id).await?;
            Some((job_id, question_id))
        }
        _ => None,
    };

    let outcome = evaluate_practice_answer(
        state.stt.as_ref(),
        state.llm.as_ref(),
        &question,
        notes.as_deref(),
        &audio,
    )
    .await?;

    if let Some((job_id, question_id)) = target {
        let stored = store::record_practice(
            &state.db,
            job_id,
            question_id,
            &outcome.user_answer,
            &outcome.analysis,
        )
        .await?;
        if !stored {
            warn!("Practice result for unknown question {question_id} on job {job_id} was not stored");
        }
    }

    Ok(Json(outcome))
}
