use std::sync::Arc;

use crate::auth::session::SessionRegistry;
use crate::avatars::{AvatarStorage, LocalAvatarStorage};
use crate::config::AppConfig;
use crate::error::StoreResult;
use crate::store::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<UserStore>,
    pub sessions: SessionRegistry,
    pub avatars: Arc<dyn AvatarStorage>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        tracing::info!(
            users_file = %config.users_file.display(),
            avatar_dir = %config.avatar_dir.display(),
            scheme = ?config.password_scheme,
            session_ttl_secs = config.session_ttl.as_secs(),
            "configuration loaded"
        );
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let store = Arc::new(UserStore::new(config.users_file.clone()));
        let sessions = SessionRegistry::new(config.session_ttl);
        let avatars =
            Arc::new(LocalAvatarStorage::new(config.avatar_dir.clone())) as Arc<dyn AvatarStorage>;
        Self {
            config,
            store,
            sessions,
            avatars,
        }
    }

    /// Run a blocking store operation off the async runtime.
    pub async fn with_store<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&UserStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref())).await?
    }

    #[cfg(test)]
    pub fn fake(dir: &std::path::Path) -> Self {
        use crate::auth::password::PasswordScheme;

        let config = Arc::new(AppConfig {
            listen_addr: ([127, 0, 0, 1], 0).into(),
            users_file: dir.join("users.json"),
            avatar_dir: dir.join("avatars"),
            password_scheme: PasswordScheme::Sha256,
            password_min_length: 8,
            max_avatar_bytes: 1024 * 1024,
            session_ttl: std::time::Duration::from_secs(3600),
        });
        Self::from_config(config)
    }
}
