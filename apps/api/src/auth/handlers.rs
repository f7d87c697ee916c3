use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::cookie::{auth_cookie, cleared_cookie};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::store::{self, NewUser, ProfileUpdate};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::models::user::{ProfileResponse, Purpose, UserRow};
use crate::state::AppState;
use crate::upload::FormData;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub name: Option<String>,
    pub purpose: Option<Purpose>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
}

impl From<&UserRow> for AuthResponse {
    fn from(user: &UserRow) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Display name for a user who registered without one: the email's local part.
fn default_name(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("Please add all fields".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("Email address is invalid".to_string()));
    }

    if store::find_user_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Validation("User already exists".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_name(&email))
        .to_string();

    let user = store::insert_user(
        &state.db,
        NewUser {
            email: &email,
            name: &name,
            purpose: req.purpose.unwrap_or_default(),
            password_hash: &password_hash,
        },
    )
    .await
    .map_err(|e| {
        if store::is_unique_violation(&e) {
            AppError::Validation("User already exists".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    info!("Registered user {}", user.id);

    let token = state.jwt.issue(user.id)?;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, auth_cookie(&token, state.config.secure_cookies))],
        Json(AuthResponse::from(&user)),
    ))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&req.email);
    let user = store::find_user_by_email(&state.db, &email).await?;

    let user = match user {
        Some(u) if verify_password(&req.password, &u.password_hash) => u,
        _ => {
            warn!("Failed login attempt");
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let token = state.jwt.issue(user.id)?;
    Ok((
        [(header::SET_COOKIE, auth_cookie(&token, state.config.secure_cookies))],
        Json(AuthResponse::from(&user)),
    ))
}

/// POST /api/auth/logout
pub async fn handle_logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, cleared_cookie())],
        Json(json!({ "message": "Logged out" })),
    )
}

/// GET /api/auth/profile
pub async fn handle_get_profile(CurrentUser(user): CurrentUser) -> Json<ProfileResponse> {
    Json(ProfileResponse::from(&user))
}

/// PUT /api/auth/profile
///
/// Multipart form: `name`, `purpose`, `cvText`, `jobDescription`, and an optional
/// `resume` PDF whose extracted text replaces the CV. Blank fields are ignored.
pub async fn handle_update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Json<ProfileResponse>, AppError> {
    let mut form = FormData::read(multipart).await?;

    let purpose = match form.text("purpose") {
        Some(raw) => Some(
            Purpose::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown purpose '{raw}'")))?,
        ),
        None => None,
    };

    let mut update = ProfileUpdate {
        name: form.text("name").map(String::from),
        purpose,
        cv_text: form.text("cvText").map(String::from),
        job_description: form.text("jobDescription").map(String::from),
    };

    if let Some(resume) = form.take_file("resume") {
        let text = extract_pdf_text(resume.bytes.to_vec()).await?;
        info!(chars = text.len(), "Extracted CV text from uploaded PDF");
        update.cv_text = Some(text);
    }

    let updated = store::update_profile(&state.db, user.id, &update).await?;
    Ok(Json(ProfileResponse::from(&updated)))
}

async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, AppError> {
    // The parser can panic on malformed input; that is a bad upload, not a server fault.
    let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| {
            if e.is_panic() {
                AppError::Validation("Failed to parse PDF: malformed document".to_string())
            } else {
                AppError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}"))
            }
        })?;

    let text = extracted.map_err(|e| {
        warn!("PDF parse error: {e}");
        AppError::Validation(format!("Failed to parse PDF: {e}"))
    })?;

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation(
            "Failed to parse PDF: no extractable text".to_string(),
        ));
    }
    Ok(text)
}
