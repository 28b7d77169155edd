use crate::state::AppState;
use axum::Router;

pub(crate) mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod session;
pub(crate) mod validation;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
