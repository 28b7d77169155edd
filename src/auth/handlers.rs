use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
        extractors::CurrentUser,
        password::verify_stored,
        validation::{is_valid_username, password_problem},
    },
    error::{internal, StoreError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    let username = payload.username;

    if payload.password != payload.confirm_password {
        warn!(%username, "password confirmation mismatch");
        return Err((StatusCode::BAD_REQUEST, "Passwords do not match".into()));
    }
    if username.is_empty() || payload.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username and password cannot be empty".into(),
        ));
    }
    if !is_valid_username(&username) {
        warn!(%username, "invalid username");
        return Err((StatusCode::BAD_REQUEST, "Invalid username".into()));
    }
    if let Some(problem) = password_problem(&payload.password, state.config.password_min_length) {
        warn!(%username, %problem, "weak password");
        return Err((StatusCode::BAD_REQUEST, problem));
    }

    let hash = state
        .config
        .password_scheme
        .hash(&payload.password)
        .map_err(internal)?;

    let name = username.clone();
    let user = match state
        .with_store(move |store| store.register_user(&name, &hash))
        .await
    {
        Ok(u) => u,
        Err(StoreError::DuplicateUsername(_)) => {
            warn!(%username, "username already exists");
            return Err((StatusCode::CONFLICT, "Username already exists".into()));
        }
        Err(e) => return Err(internal(e)),
    };

    info!(%username, "registration complete");
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid username or password".to_string());

    let name = payload.username.clone();
    let mut user = state
        .with_store(move |store| store.find_user(&name))
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            warn!(username = %payload.username, "login unknown username");
            invalid()
        })?;

    let ok = verify_stored(&payload.password, &user.password_hash).map_err(internal)?;
    if !ok {
        warn!(username = %user.username, "login invalid password");
        return Err(invalid());
    }

    let scheme = state.config.password_scheme;
    if scheme.needs_rehash(&user.password_hash) {
        match scheme.hash(&payload.password) {
            Ok(upgraded) => {
                let name = user.username.clone();
                let hash = upgraded.clone();
                match state
                    .with_store(move |store| store.replace_password_hash(&name, &hash))
                    .await
                {
                    Ok(_) => {
                        info!(username = %user.username, ?scheme, "password digest upgraded");
                        user.password_hash = upgraded;
                    }
                    Err(e) => warn!(error = %e, "password digest upgrade failed"),
                }
            }
            Err(e) => warn!(error = %e, "password rehash failed"),
        }
    }

    let session = state.sessions.open(&user.username);
    info!(username = %user.username, %session, "user logged in");
    Ok(Json(LoginResponse {
        session,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, current))]
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> StatusCode {
    state.sessions.close(current.session);
    info!(username = %current.username, "user logged out");
    StatusCode::NO_CONTENT
}
