pub mod handlers;

use crate::state::AppState;
use axum::Router;

pub fn router(max_avatar_bytes: usize) -> Router<AppState> {
    handlers::profile_routes(max_avatar_bytes)
}
