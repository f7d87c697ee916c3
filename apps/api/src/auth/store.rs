use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::{Purpose, UserRow};

pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub purpose: Purpose,
    pub password_hash: &'a str,
}

/// Profile fields to overwrite. `None` leaves the stored value in place.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub purpose: Option<Purpose>,
    pub cv_text: Option<String>,
    pub job_description: Option<String>,
}

pub async fn insert_user(pool: &PgPool, user: NewUser<'_>) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, email, name, purpose, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.email)
    .bind(user.name)
    .bind(user.purpose.as_str())
    .bind(user.password_hash)
    .fetch_one(pool)
    .await
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    update: &ProfileUpdate,
) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users SET
            name            = COALESCE($2, name),
            purpose         = COALESCE($3, purpose),
            cv_text         = COALESCE($4, cv_text),
            job_description = COALESCE($5, job_description),
            updated_at      = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(update.name.as_deref())
    .bind(update.purpose.map(|p| p.as_str()))
    .bind(update.cv_text.as_deref())
    .bind(update.job_description.as_deref())
    .fetch_one(pool)
    .await
}

/// True when `err` is a unique-constraint violation (duplicate email).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
