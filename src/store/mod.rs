//! File-backed user store.
//!
//! The whole collection lives in a single JSON array. Every mutation loads
//! the file, changes one record and rewrites the file in full.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

mod record;

pub use record::{ProfilePatch, UserRecord};

pub struct UserStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record. A missing or unparsable file yields an empty list;
    /// individual records that cannot be read are skipped.
    pub fn load_all(&self) -> StoreResult<Vec<UserRecord>> {
        Ok(self.read_file()?.users)
    }

    fn read_file(&self) -> StoreResult<Loaded> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "users file not found; starting empty");
                return Ok(Loaded::default());
            }
            Err(e) => return Err(e.into()),
        };

        let entries = match serde_json::from_slice::<Vec<serde_json::Value>>(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "users file is not a JSON array; treating as empty"
                );
                return Ok(Loaded {
                    users: Vec::new(),
                    lossy: true,
                });
            }
        };

        let total = entries.len();
        let users: Vec<UserRecord> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(idx, entry)| match serde_json::from_value(entry) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(path = %self.path.display(), index = idx, error = %e, "skipping unreadable user record");
                    None
                }
            })
            .collect();
        let lossy = users.len() != total;
        Ok(Loaded { users, lossy })
    }

    /// Rewrite after a read-modify-write. If the read dropped anything, the
    /// original file is copied aside first so the rewrite cannot destroy it.
    fn write_back(&self, loaded: &Loaded) -> StoreResult<()> {
        if loaded.lossy {
            let backup = self.backup_path();
            fs::copy(&self.path, &backup)?;
            warn!(
                path = %self.path.display(),
                backup = %backup.display(),
                "users file had unreadable content; original kept as backup"
            );
        }
        self.save_all(&loaded.users)
    }

    /// Replace the file with exactly `users`.
    pub fn save_all(&self, users: &[UserRecord]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let body = serde_json::to_vec_pretty(users)?;
        let tmp = self.tmp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(path = %self.path.display(), count = users.len(), "users file written");
        Ok(())
    }

    pub fn find_user(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|u| u.username == username))
    }

    /// Append a new account, refusing names that are already taken.
    pub fn register_user(&self, username: &str, password_hash: &str) -> StoreResult<UserRecord> {
        let _guard = self.lock();
        let mut loaded = self.read_file()?;
        if loaded.users.iter().any(|u| u.username == username) {
            return Err(StoreError::DuplicateUsername(username.to_string()));
        }

        let record = UserRecord::new(username, password_hash);
        loaded.users.push(record.clone());
        self.write_back(&loaded)?;

        info!(username, "user registered");
        Ok(record)
    }

    /// Merge `patch` into the named record. Returns `false`, writing nothing,
    /// when no such user exists.
    pub fn update_profile(&self, username: &str, patch: &ProfilePatch) -> StoreResult<bool> {
        self.modify(username, |rec| rec.apply(patch))
    }

    pub fn replace_password_hash(&self, username: &str, password_hash: &str) -> StoreResult<bool> {
        self.modify(username, |rec| rec.password_hash = password_hash.to_string())
    }

    fn modify(&self, username: &str, f: impl FnOnce(&mut UserRecord)) -> StoreResult<bool> {
        let _guard = self.lock();
        let mut loaded = self.read_file()?;
        let Some(rec) = loaded.users.iter_mut().find(|u| u.username == username) else {
            debug!(username, "no record to update");
            return Ok(false);
        };
        f(rec);
        self.write_back(&loaded)?;
        Ok(true)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        // The guarded unit carries no state, so a poisoned lock is still usable.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tmp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    fn backup_path(&self) -> PathBuf {
        let stamp = OffsetDateTime::now_utc().unix_timestamp_nanos();
        self.sibling(&format!(".bak-{stamp}"))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

#[derive(Default)]
struct Loaded {
    users: Vec<UserRecord>,
    // Something on disk was dropped while reading.
    lossy: bool,
}

/// Unsalted hex SHA-256 of `plain`.
pub fn hash_password(plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plain.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Plain equality against `hash_password(plain)`.
pub fn verify_password(plain: &str, digest: &str) -> bool {
    hash_password(plain) == digest
}
