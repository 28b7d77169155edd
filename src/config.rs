use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::auth::password::PasswordScheme;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub users_file: PathBuf,
    pub avatar_dir: PathBuf,
    pub password_scheme: PasswordScheme,
    pub password_min_length: usize,
    pub max_avatar_bytes: usize,
    pub session_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = var("APP_PORT").unwrap_or_else(|| "8080".into());
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("APP_HOST/APP_PORT {host}:{port}"))?;

        let password_scheme = match var("PASSWORD_SCHEME") {
            Some(v) => v.parse().context("PASSWORD_SCHEME")?,
            None => PasswordScheme::default(),
        };
        let number = |key: &str, default: u64| -> anyhow::Result<u64> {
            var(key)
                .map(|v| v.parse::<u64>().with_context(|| format!("{key}={v}")))
                .transpose()
                .map(|v| v.unwrap_or(default))
        };

        Ok(Self {
            listen_addr,
            users_file: var("USERS_FILE")
                .unwrap_or_else(|| "data/users.json".into())
                .into(),
            avatar_dir: var("AVATAR_DIR")
                .unwrap_or_else(|| "data/avatars".into())
                .into(),
            password_scheme,
            password_min_length: number("PASSWORD_MIN_LENGTH", 8)? as usize,
            max_avatar_bytes: number("MAX_AVATAR_BYTES", 5 * 1024 * 1024)? as usize,
            session_ttl: Duration::from_secs(number("SESSION_TTL_MINUTES", 60)? * 60),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.users_file, PathBuf::from("data/users.json"));
        assert_eq!(config.avatar_dir, PathBuf::from("data/avatars"));
        assert_eq!(config.password_scheme, PasswordScheme::Sha256);
        assert_eq!(config.password_min_length, 8);
        assert_eq!(config.max_avatar_bytes, 5 * 1024 * 1024);
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("APP_HOST", "127.0.0.1"),
            ("APP_PORT", "9000"),
            ("PASSWORD_SCHEME", "argon2"),
            ("SESSION_TTL_MINUTES", "5"),
            ("MAX_AVATAR_BYTES", "1024"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.password_scheme, PasswordScheme::Argon2);
        assert_eq!(config.session_ttl, Duration::from_secs(300));
        assert_eq!(config.max_avatar_bytes, 1024);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[("APP_PORT", "http")]).is_err());
        assert!(config_from(&[("SESSION_TTL_MINUTES", "soon")]).is_err());
        assert!(config_from(&[("PASSWORD_SCHEME", "md5")]).is_err());
    }
}
