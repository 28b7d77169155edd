use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::PublicUser,
        extractors::CurrentUser,
        validation::{is_valid_dob, is_valid_name},
    },
    avatars::mime_from_path,
    error::internal,
    state::AppState,
    store::ProfilePatch,
};

const AVATAR_FIELD: &str = "avatar";

pub fn profile_routes(max_avatar_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).patch(update_profile))
        .route(
            "/profile/avatar",
            put(upload_avatar)
                .get(get_avatar)
                .delete(delete_avatar)
                // Multipart framing adds a little on top of the image itself.
                .layer(DefaultBodyLimit::max(max_avatar_bytes + 64 * 1024)),
        )
}

#[instrument(skip(state, current))]
pub async fn get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    load_public(&state, &current.username).await.map(Json)
}

#[instrument(skip(state, current, patch))]
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    for name in [&patch.first_name, &patch.last_name].into_iter().flatten() {
        if !is_valid_name(name) {
            return Err((StatusCode::BAD_REQUEST, "Name is too long".into()));
        }
    }
    if let Some(Some(dob)) = patch.dob {
        if !is_valid_dob(dob) {
            warn!(username = %current.username, %dob, "date of birth out of range");
            return Err((StatusCode::BAD_REQUEST, "Invalid date of birth".into()));
        }
    }

    if !patch.is_empty() {
        apply_patch(&state, &current.username, patch).await?;
        info!(username = %current.username, "profile updated");
    }
    load_public(&state, &current.username).await.map(Json)
}

#[instrument(skip(state, current, mp))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    current: CurrentUser,
    mut mp: Multipart,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let mut upload: Option<(Bytes, String)> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        upload = Some((data, content_type));
        break;
    }

    let Some((body, content_type)) = upload else {
        return Err((StatusCode::BAD_REQUEST, "avatar field is required".into()));
    };
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "avatar is empty".into()));
    }
    if body.len() > state.config.max_avatar_bytes {
        warn!(username = %current.username, bytes = body.len(), "avatar too large");
        return Err((StatusCode::PAYLOAD_TOO_LARGE, "avatar is too large".into()));
    }
    if crate::avatars::ext_from_mime(&content_type).is_none() {
        return Err((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("unsupported image type {content_type}"),
        ));
    }

    let path = state
        .avatars
        .put(&current.username, body, &content_type)
        .await
        .map_err(internal)?;

    let patch = ProfilePatch {
        avatar: Some(Some(path.clone())),
        ..Default::default()
    };
    if let Err(e) = apply_patch(&state, &current.username, patch).await {
        if let Err(cleanup) = state.avatars.delete(&path).await {
            warn!(error = %cleanup, %path, "orphaned avatar left behind");
        }
        return Err(e);
    }

    info!(username = %current.username, %path, "avatar updated");
    load_public(&state, &current.username).await.map(Json)
}

#[instrument(skip(state, current))]
pub async fn get_avatar(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, (StatusCode, String)> {
    let not_found = || (StatusCode::NOT_FOUND, "No avatar".to_string());

    let path = find_avatar_path(&state, &current.username)
        .await?
        .ok_or_else(not_found)?;
    let body = state
        .avatars
        .get(&path)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            warn!(username = %current.username, %path, "avatar file missing");
            not_found()
        })?;

    Ok(([(header::CONTENT_TYPE, mime_from_path(&path))], body).into_response())
}

#[instrument(skip(state, current))]
pub async fn delete_avatar(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, (StatusCode, String)> {
    let Some(path) = find_avatar_path(&state, &current.username).await? else {
        return Ok(StatusCode::NO_CONTENT);
    };

    let patch = ProfilePatch {
        avatar: Some(None),
        ..Default::default()
    };
    apply_patch(&state, &current.username, patch).await?;
    state.avatars.delete(&path).await.map_err(internal)?;

    info!(username = %current.username, "avatar removed");
    Ok(StatusCode::NO_CONTENT)
}

async fn apply_patch(
    state: &AppState,
    username: &str,
    patch: ProfilePatch,
) -> Result<(), (StatusCode, String)> {
    let name = username.to_string();
    let found = state
        .with_store(move |store| store.update_profile(&name, &patch))
        .await
        .map_err(internal)?;
    if !found {
        warn!(username, "session user has no record");
        return Err((StatusCode::NOT_FOUND, "User not found".into()));
    }
    Ok(())
}

async fn load_public(state: &AppState, username: &str) -> Result<PublicUser, (StatusCode, String)> {
    let name = username.to_string();
    state
        .with_store(move |store| store.find_user(&name))
        .await
        .map_err(internal)?
        .map(PublicUser::from)
        .ok_or((StatusCode::NOT_FOUND, "User not found".into()))
}

async fn find_avatar_path(
    state: &AppState,
    username: &str,
) -> Result<Option<String>, (StatusCode, String)> {
    let name = username.to_string();
    let user = state
        .with_store(move |store| store.find_user(&name))
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;
    Ok(user.avatar)
}
