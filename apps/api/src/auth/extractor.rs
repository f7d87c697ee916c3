use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::auth::cookie::token_from_headers;
use crate::auth::store::find_user_by_id;
use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

/// The authenticated caller, loaded fresh from the database on every request.
pub struct CurrentUser(pub UserRow);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;

        let user_id = state.jwt.verify(&token)?;

        let user = find_user_by_id(&state.db, user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Not authorized, user not found".to_string()))?;

        Ok(CurrentUser(user))
    }
}
