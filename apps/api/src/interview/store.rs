use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::auth::ensure_owner;
use crate::errors::AppError;
use crate::interview::analysis::Analysis;
use crate::interview::conversation::TurnOutcome;
use crate::models::session::{MessageRole, MessageRow, SessionDetail, SessionRow, SessionSummaryRow};

pub struct NewSession<'a> {
    pub user_id: Uuid,
    pub job_application_id: Option<Uuid>,
    pub cv_text: &'a str,
    pub job_description: &'a str,
}

const ALREADY_ENDED: &str = "This interview session has already ended";

async fn insert_message(
    tx: &mut Transaction<'_, Postgres>,
    session_id: Uuid,
    seq: i32,
    role: MessageRole,
    content: &str,
    audio: Option<&str>,
) -> Result<MessageRow, sqlx::Error> {
    sqlx::query_as::<_, MessageRow>(
        r#"
        INSERT INTO session_messages (id, session_id, seq, role, content, audio)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(seq)
    .bind(role.as_str())
    .bind(content)
    .bind(audio)
    .fetch_one(&mut **tx)
    .await
}

/// Creates a session whose first message is the interviewer's greeting.
pub async fn create_session_with_greeting(
    pool: &PgPool,
    session: NewSession<'_>,
    greeting: &str,
    greeting_audio: Option<&str>,
) -> Result<SessionDetail, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, SessionRow>(
        r#"
        INSERT INTO interview_sessions (id, user_id, job_application_id, cv_text, job_description)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session.user_id)
    .bind(session.job_application_id)
    .bind(session.cv_text)
    .bind(session.job_description)
    .fetch_one(&mut *tx)
    .await?;

    let greeting = insert_message(&mut tx, row.id, 1, MessageRole::Ai, greeting, greeting_audio).await?;

    tx.commit().await?;
    Ok(SessionDetail {
        session: row,
        messages: vec![greeting],
    })
}

/// Loads a session, failing with 404 when missing and 401 when it belongs
/// to another user.
pub async fn find_owned_session(
    pool: &PgPool,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<SessionRow, AppError> {
    let session =
        sqlx::query_as::<_, SessionRow>("SELECT * FROM interview_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
    ensure_owner(session.user_id, user_id)?;
    Ok(session)
}

pub async fn list_messages(pool: &PgPool, session_id: Uuid) -> Result<Vec<MessageRow>, sqlx::Error> {
    sqlx::query_as::<_, MessageRow>(
        "SELECT * FROM session_messages WHERE session_id = $1 ORDER BY seq ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await
}

pub async fn load_session_detail(pool: &PgPool, session: SessionRow) -> Result<SessionDetail, sqlx::Error> {
    let messages = list_messages(pool, session.id).await?;
    Ok(SessionDetail { session, messages })
}

/// Appends the user's answer and the interviewer's reply as the next two
/// messages. Fails with 409 if the session was ended meanwhile.
pub async fn append_turn(
    pool: &PgPool,
    session_id: Uuid,
    turn: &TurnOutcome,
) -> Result<Vec<MessageRow>, AppError> {
    let mut tx = pool.begin().await?;

    // Row lock on the session serializes concurrent turns and the end call.
    let finished: bool = sqlx::query_scalar(
        "SELECT analysis IS NOT NULL FROM interview_sessions WHERE id = $1 FOR UPDATE",
    )
    .bind(session_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
    if finished {
        return Err(AppError::Conflict(ALREADY_ENDED.to_string()));
    }

    let last: Option<i32> =
        sqlx::query_scalar("SELECT MAX(seq) FROM session_messages WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(&mut *tx)
            .await?;
    let next = last.unwrap_or(0) + 1;

    insert_message(&mut tx, session_id, next, MessageRole::User, &turn.user_text, None).await?;
    insert_message(
        &mut tx,
        session_id,
        next + 1,
        MessageRole::Ai,
        &turn.ai_text,
        turn.ai_audio.as_deref(),
    )
    .await?;

    sqlx::query("UPDATE interview_sessions SET updated_at = NOW() WHERE id = $1")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(list_messages(pool, session_id).await?)
}

/// Writes the analysis exactly once. A second call fails with 409.
pub async fn finalize_session(
    pool: &PgPool,
    session_id: Uuid,
    analysis: &Analysis,
) -> Result<SessionRow, AppError> {
    let report = serde_json::to_value(analysis).map_err(anyhow::Error::from)?;

    sqlx::query_as::<_, SessionRow>(
        r#"
        UPDATE interview_sessions SET
            analysis           = $2,
            score              = $3,
            hiring_probability = $4,
            updated_at         = NOW()
        WHERE id = $1 AND analysis IS NULL
        RETURNING *
        "#,
    )
    .bind(session_id)
    .bind(report)
    .bind(analysis.score)
    .bind(analysis.hiring_probability.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Conflict(ALREADY_ENDED.to_string()))
}

/// Session summaries for a user, newest first, optionally for one job only.
pub async fn list_history(
    pool: &PgPool,
    user_id: Uuid,
    job_id: Option<Uuid>,
) -> Result<Vec<SessionSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, SessionSummaryRow>(
        r#"
        SELECT
            s.id,
            s.created_at,
            s.score,
            s.hiring_probability,
            (SELECT COUNT(*) FROM session_messages m WHERE m.session_id = s.id) AS message_count,
            s.analysis,
            j.job_title,
            j.company,
            s.job_application_id
        FROM interview_sessions s
        LEFT JOIN job_applications j ON j.id = s.job_application_id
        WHERE s.user_id = $1
          AND ($2::uuid IS NULL OR s.job_application_id = $2)
        ORDER BY s.created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(job_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_session(pool: &PgPool, session_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM interview_sessions WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}
