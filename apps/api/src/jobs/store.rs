use std::collections::HashMap;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::ensure_owner;
use crate::errors::AppError;
use crate::jobs::practice::PracticeEvaluation;
use crate::jobs::questions::GeneratedQuestion;
use crate::models::job::{JobApplicationRow, JobDetail, JobStatus, QuestionRow};

pub struct NewJob<'a> {
    pub user_id: Uuid,
    pub company: &'a str,
    pub job_title: &'a str,
    pub description: &'a str,
}

/// Fields to overwrite on an application. `None` leaves the stored value.
#[derive(Debug, Default)]
pub struct JobUpdate {
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub description: Option<String>,
    pub status: Option<JobStatus>,
}

pub async fn insert_job(pool: &PgPool, job: NewJob<'_>) -> Result<JobApplicationRow, sqlx::Error> {
    sqlx::query_as::<_, JobApplicationRow>(
        r#"
        INSERT INTO job_applications (id, user_id, company, job_title, description, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job.user_id)
    .bind(job.company)
    .bind(job.job_title)
    .bind(job.description)
    .bind(JobStatus::default().as_str())
    .fetch_one(pool)
    .await
}

/// Loads an application, failing with 404 when missing and 401 when it
/// belongs to another user.
pub async fn find_owned_job(
    pool: &PgPool,
    job_id: Uuid,
    user_id: Uuid,
) -> Result<JobApplicationRow, AppError> {
    let job = sqlx::query_as::<_, JobApplicationRow>("SELECT * FROM job_applications WHERE id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;
    ensure_owner(job.user_id, user_id)?;
    Ok(job)
}

pub async fn list_jobs(pool: &PgPool, user_id: Uuid) -> Result<Vec<JobApplicationRow>, sqlx::Error> {
    sqlx::query_as::<_, JobApplicationRow>(
        "SELECT * FROM job_applications WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Fails with 404 when the application no longer exists.
pub async fn update_job(
    pool: &PgPool,
    job_id: Uuid,
    update: &JobUpdate,
) -> Result<JobApplicationRow, AppError> {
    sqlx::query_as::<_, JobApplicationRow>(
        r#"
        UPDATE job_applications SET
            company     = COALESCE($2, company),
            job_title   = COALESCE($3, job_title),
            description = COALESCE($4, description),
            status      = COALESCE($5, status),
            updated_at  = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(job_id)
    .bind(update.company.as_deref())
    .bind(update.job_title.as_deref())
    .bind(update.description.as_deref())
    .bind(update.status.map(|s| s.as_str()))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Job not found".to_string()))
}

/// Deletes the application and its questions. Linked interview sessions are
/// kept and lose their job link.
pub async fn delete_job(pool: &PgPool, job_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM job_applications WHERE id = $1")
        .bind(job_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_questions(pool: &PgPool, job_id: Uuid) -> Result<Vec<QuestionRow>, sqlx::Error> {
    sqlx::query_as::<_, QuestionRow>(
        "SELECT * FROM job_questions WHERE job_id = $1 ORDER BY position ASC",
    )
    .bind(job_id)
    .fetch_all(pool)
    .await
}

pub async fn list_questions_for_jobs(
    pool: &PgPool,
    job_ids: &[Uuid],
) -> Result<Vec<QuestionRow>, sqlx::Error> {
    sqlx::query_as::<_, QuestionRow>(
        "SELECT * FROM job_questions WHERE job_id = ANY($1) ORDER BY job_id, position ASC",
    )
    .bind(job_ids)
    .fetch_all(pool)
    .await
}

pub async fn load_job_detail(pool: &PgPool, job: JobApplicationRow) -> Result<JobDetail, sqlx::Error> {
    let questions = list_questions(pool, job.id).await?;
    Ok(JobDetail { job, questions })
}

/// Pairs each job with its questions, preserving the job order.
pub fn attach_questions(jobs: Vec<JobApplicationRow>, questions: Vec<QuestionRow>) -> Vec<JobDetail> {
    let mut by_job: HashMap<Uuid, Vec<QuestionRow>> = HashMap::new();
    for question in questions {
        by_job.entry(question.job_id).or_default().push(question);
    }
    jobs.into_iter()
        .map(|job| {
            let mut questions = by_job.remove(&job.id).unwrap_or_default();
            questions.sort_by_key(|q| q.position);
            JobDetail { job, questions }
        })
        .collect()
}

/// Appends questions after the current last position, atomically.
pub async fn append_questions(
    pool: &PgPool,
    job_id: Uuid,
    questions: &[GeneratedQuestion],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    // Row lock on the job serializes concurrent appends.
    sqlx::query("SELECT id FROM job_applications WHERE id = $1 FOR UPDATE")
        .bind(job_id)
        .execute(&mut *tx)
        .await?;

    let last: Option<i32> =
        sqlx::query_scalar("SELECT MAX(position) FROM job_questions WHERE job_id = $1")
            .bind(job_id)
            .fetch_one(&mut *tx)
            .await?;
    let mut position = last.unwrap_or(0);

    for q in questions {
        position += 1;
        sqlx::query(
            r#"
            INSERT INTO job_questions (id, job_id, position, question, notes, ai_expected_answer)
            VALUES ($1, $2, $3, $4, '', $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(position)
        .bind(&q.question)
        .bind(q.ai_expected_answer.as_deref())
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE job_applications SET updated_at = NOW() WHERE id = $1")
        .bind(job_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

/// Returns false when the question does not belong to the job.
pub async fn update_question_notes(
    pool: &PgPool,
    job_id: Uuid,
    question_id: Uuid,
    notes: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE job_questions SET notes = $1 WHERE id = $2 AND job_id = $3")
        .bind(notes)
        .bind(question_id)
        .bind(job_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Stores the latest practice attempt on a question.
/// Returns false when the question does not belong to the job.
pub async fn record_practice(
    pool: &PgPool,
    job_id: Uuid,
    question_id: Uuid,
    user_answer: &str,
    evaluation: &PracticeEvaluation,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE job_questions SET
            user_answer     = $1,
            ai_feedback     = $2,
            score           = $3,
            improved_answer = $4,
            practiced_at    = $5
        WHERE id = $6 AND job_id = $7
        "#,
    )
    .bind(user_answer)
    .bind(&evaluation.feedback)
    .bind(evaluation.score)
    .bind(&evaluation.improved_answer)
    .bind(Utc::now())
    .bind(question_id)
    .bind(job_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}
