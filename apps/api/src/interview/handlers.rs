//! Axum route handlers for the Interview API.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::interview::analysis::analyze_session;
use crate::interview::conversation::{greeting_for, run_turn, InterviewContext};
use crate::interview::store::{self, NewSession};
use crate::jobs::store::find_owned_job;
use crate::models::session::{MessageRow, SessionDetail, SessionRow, SessionSummaryRow};
use crate::models::user::UserRow;
use crate::speech::synthesize_base64;
use crate::state::AppState;
use crate::upload::FormData;

// ────────────────────────────────────────────────────────────────────────────
// Request / response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    pub session_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub user_text: String,
    pub ai_text: String,
    pub ai_audio: Option<String>,
    pub history: Vec<MessageRow>,
}

impl StartSessionRequest {
    /// An empty body starts an unlinked session. Anything else must be a
    /// valid request; a malformed `jobId` is rejected rather than ignored.
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("Invalid session request: {e}")))
    }
}

fn context_for<'a>(user: &UserRow, session: &'a SessionRow) -> InterviewContext<'a> {
    InterviewContext {
        purpose: user.purpose(),
        cv_text: &session.cv_text,
        job_description: &session.job_description,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/interview/session
///
/// Body is optional; `{ "jobId": ... }` links the session to an application
/// and uses its description as interview context.
pub async fn handle_start_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Result<(StatusCode, Json<SessionDetail>), AppError> {
    let req = StartSessionRequest::from_body(&body)?;

    let job = match req.job_id {
        Some(job_id) => Some(find_owned_job(&state.db, job_id, user.id).await?),
        None => None,
    };
    let job_description = job
        .as_ref()
        .map(|j| j.description.as_str())
        .unwrap_or(user.job_description.as_str());

    let greeting = greeting_for(user.purpose());
    let greeting_audio = synthesize_base64(state.tts.as_ref(), greeting).await;

    let detail = store::create_session_with_greeting(
        &state.db,
        NewSession {
            user_id: user.id,
            job_application_id: job.as_ref().map(|j| j.id),
            cv_text: &user.cv_text,
            job_description,
        },
        greeting,
        greeting_audio.as_deref(),
    )
    .await?;

    info!(
        "Started interview session {} for user {} (job: {:?})",
        detail.session.id, user.id, detail.session.job_application_id
    );

    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/interview/session/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionDetail>, AppError> {
    let session = store::find_owned_session(&state.db, session_id, user.id).await?;
    Ok(Json(store::load_session_detail(&state.db, session).await?))
}

/// POST /api/interview/answer
///
/// Multipart form: `sessionId` and the recorded `audio` answer.
pub async fn handle_answer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Json<AnswerResponse>, AppError> {
    let mut form = FormData::read(multipart).await?;

    let audio = form
        .take_file("audio")
        .ok_or_else(|| AppError::Validation("No audio file uploaded".to_string()))?
        .into_audio();
    let session_id = form
        .text("sessionId")
        .ok_or_else(|| AppError::Validation("sessionId is required".to_string()))
        .and_then(|raw| {
            Uuid::parse_str(raw)
                .map_err(|_| AppError::Validation("sessionId is not a valid id".to_string()))
        })?;

    let session = store::find_owned_session(&state.db, session_id, user.id).await?;
    if session.is_finished() {
        return Err(AppError::Conflict(
            "This interview session has already ended".to_string(),
        ));
    }
    let messages = store::list_messages(&state.db, session.id).await?;

    let turn = run_turn(
        state.stt.as_ref(),
        state.llm.as_ref(),
        state.tts.as_ref(),
        &context_for(&user, &session),
        &messages,
        &audio,
    )
    .await?;

    let history = store::append_turn(&state.db, session.id, &turn).await?;

    Ok(Json(AnswerResponse {
        user_text: turn.user_text,
        ai_text: turn.ai_text,
        ai_audio: turn.ai_audio,
        history,
    }))
}

/// POST /api/interview/end
///
/// Analyses the transcript and stores the report. Ending twice is a 409.
pub async fn handle_end_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<EndSessionRequest>,
) -> Result<Json<SessionDetail>, AppError> {
    let session = store::find_owned_session(&state.db, req.session_id, user.id).await?;
    if session.is_finished() {
        return Err(AppError::Conflict(
            "This interview session has already ended".to_string(),
        ));
    }
    let messages = store::list_messages(&state.db, session.id).await?;

    let analysis = analyze_session(state.llm.as_ref(), &context_for(&user, &session), &messages).await?;
    let session = store::finalize_session(&state.db, session.id, &analysis).await?;

    info!(
        "Ended interview session {} with score {}",
        session.id, session.score
    );

    Ok(Json(SessionDetail { session, messages }))
}

/// GET /api/interview/history?jobId=
pub async fn handle_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<SessionSummaryRow>>, AppError> {
    Ok(Json(store::list_history(&state.db, user.id, query.job_id).await?))
}

/// DELETE /api/interview/session/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    store::find_owned_session(&state.db, session_id, user.id).await?;
    store::delete_session(&state.db, session_id).await?;
    info!("Deleted interview session {session_id}");
    Ok(Json(json!({ "message": "Session removed" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_start_request_job_id_is_optional() {
        let req: StartSessionRequest = serde_json::from_str("{}").unwrap();
        assert!(req.job_id.is_none());

        let id = Uuid::new_v4();
        let req: StartSessionRequest =
            serde_json::from_value(json!({ "jobId": id.to_string() })).unwrap();
        assert_eq!(req.job_id, Some(id));
    }

    #[test]
    fn test_start_body_may_be_empty() {
        assert!(StartSessionRequest::from_body(b"").unwrap().job_id.is_none());
        assert!(StartSessionRequest::from_body(b" \n").unwrap().job_id.is_none());
        assert!(StartSessionRequest::from_body(b"{}").unwrap().job_id.is_none());
    }

    #[test]
    fn test_start_body_rejects_malformed_job_id() {
        let err = StartSessionRequest::from_body(br#"{"jobId": "not-a-uuid"}"#).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = StartSessionRequest::from_body(b"{\"jobId\":").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_start_body_reads_job_id() {
        let id = Uuid::new_v4();
        let body = json!({ "jobId": id }).to_string();
        assert_eq!(
            StartSessionRequest::from_body(body.as_bytes()).unwrap().job_id,
            Some(id)
        );
    }

    #[test]
    fn test_end_request_requires_session_id() {
        assert!(serde_json::from_str::<EndSessionRequest>("{}").is_err());
    }

    #[test]
    fn test_answer_response_shape() {
        let response = AnswerResponse {
            user_text: "Hi".into(),
            ai_text: "Hello".into(),
            ai_audio: None,
            history: vec![MessageRow {
                id: Uuid::new_v4(),
                session_id: Uuid::new_v4(),
                seq: 1,
                role: "ai".into(),
                content: "Hello".into(),
                audio: None,
                created_at: Utc::now(),
            }],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["userText"], "Hi");
        assert!(json["aiAudio"].is_null());
        assert_eq!(json["history"][0]["role"], "ai");
        assert!(json["history"][0].get("sessionId").is_none());
    }
}
