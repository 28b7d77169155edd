mod app;
mod auth;
mod avatars;
mod config;
mod error;
mod profile;
mod state;
mod store;

use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let app_state = AppState::init()?;

    // Surface a broken users file at startup rather than on the first request.
    let count = app_state
        .with_store(|store| store.load_all().map(|users| users.len()))
        .await?;
    tracing::info!(users = count, path = %app_state.store.path().display(), "user store ready");

    let addr = app_state.config.listen_addr;
    app::serve(app::build_app(app_state), addr).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("userbook=debug,axum=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.with_target(false).json().init(),
        _ => builder.init(),
    }
}
