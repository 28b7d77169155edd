use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Where avatar images live. The user store only keeps the returned path.
#[async_trait]
pub trait AvatarStorage: Send + Sync {
    /// Store the image for `username`, replacing any previous one, and
    /// return the path to record on the user.
    async fn put(&self, username: &str, body: Bytes, content_type: &str) -> anyhow::Result<String>;
    async fn get(&self, path: &str) -> anyhow::Result<Option<Bytes>>;
    async fn delete(&self, path: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct LocalAvatarStorage {
    dir: PathBuf,
}

impl LocalAvatarStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File stem for a user. Hashed so no username can reach outside `dir`.
    fn stem(username: &str) -> String {
        format!("{:x}", Sha256::digest(username.as_bytes()))
    }
}

#[async_trait]
impl AvatarStorage for LocalAvatarStorage {
    async fn put(&self, username: &str, body: Bytes, content_type: &str) -> anyhow::Result<String> {
        let ext = ext_from_mime(content_type)
            .with_context(|| format!("unsupported avatar type {content_type}"))?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create avatar dir {}", self.dir.display()))?;

        let stem = Self::stem(username);

        // One file per user: drop siblings with another extension first.
        for other in SUPPORTED_EXTS.iter().filter(|e| **e != ext) {
            let stale = self.dir.join(format!("{stem}.{other}"));
            match tokio::fs::remove_file(&stale).await {
                Ok(()) => debug!(path = %stale.display(), "removed stale avatar"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).context("remove stale avatar"),
            }
        }

        let path = self.dir.join(format!("{stem}.{ext}"));
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write avatar {}", path.display()))?;
        debug!(path = %path.display(), bytes = body.len(), "avatar stored");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn get(&self, path: &str) -> anyhow::Result<Option<Bytes>> {
        match tokio::fs::read(path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read avatar {path}")),
        }
    }

    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("delete avatar {path}")),
        }
    }
}

const SUPPORTED_EXTS: [&str; 4] = ["jpg", "png", "webp", "gif"];

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

pub(crate) fn mime_from_path(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
