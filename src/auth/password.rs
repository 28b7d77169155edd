use std::str::FromStr;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::PasswordError;
use crate::store;

const ARGON2_PREFIX: &str = "$argon2";

/// How new digests are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PasswordScheme {
    /// Unsalted hex SHA-256, the format the users file has always held.
    #[default]
    Sha256,
    /// Salted Argon2id PHC string.
    Argon2,
}

impl FromStr for PasswordScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "argon2" | "argon2id" => Ok(Self::Argon2),
            other => anyhow::bail!("unknown password scheme: {other}"),
        }
    }
}

impl PasswordScheme {
    pub fn hash(self, plain: &str) -> Result<String, PasswordError> {
        match self {
            Self::Sha256 => Ok(store::hash_password(plain)),
            Self::Argon2 => argon2_hash(plain),
        }
    }

    /// True when a stored digest should be rewritten in this scheme.
    pub fn needs_rehash(self, stored: &str) -> bool {
        self == Self::Argon2 && !is_argon2(stored)
    }
}

/// Check `plain` against whatever kind of digest is stored.
pub fn verify_stored(plain: &str, stored: &str) -> Result<bool, PasswordError> {
    if is_argon2(stored) {
        argon2_verify(plain, stored)
    } else {
        Ok(store::verify_password(plain, stored))
    }
}

fn is_argon2(stored: &str) -> bool {
    stored.starts_with(ARGON2_PREFIX)
}

fn argon2_hash(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Argon2(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

fn argon2_verify(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        PasswordError::Argon2(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
