use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

/// The logged-in caller, resolved from `Authorization: Bearer <session>`.
pub struct CurrentUser {
    pub username: String,
    pub session: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let session = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header".to_string(),
            ))?;

        match state.sessions.resolve(session) {
            Some(username) => Ok(CurrentUser { username, session }),
            None => {
                warn!(%session, "unknown or closed session");
                Err((StatusCode::UNAUTHORIZED, "Please log in".to_string()))
            }
        }
    }
}
