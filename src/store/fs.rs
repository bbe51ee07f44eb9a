//! Filesystem-backed stores.
//!
//! Every write goes to a sibling temp file first and is renamed into place, so
//! readers never observe a half-written object or record.

use super::{ObjectStore, SessionStore};
use crate::error::StoreError;
use crate::session::{PersistedConversation, SessionKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Metadata written next to each object as `<file>.meta.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub content_type: String,
    pub size: usize,
    pub stored_at: DateTime<Utc>,
}

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a storage key onto a path under the root, refusing anything that could escape it
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let invalid = || StoreError::InvalidKey {
            key: key.to_string(),
        };

        let bad_segment = |s: &str| s.is_empty() || s == "." || s == "..";
        if key.is_empty() || key.contains('\\') || key.split('/').any(bad_segment) {
            return Err(invalid());
        }
        let relative = Path::new(key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(invalid());
        }
        Ok(self.root.join(relative))
    }

    /// Content metadata for a stored object
    pub async fn meta(&self, key: &str) -> Result<ObjectMeta, StoreError> {
        let path = sidecar_path(&self.resolve(key)?);
        let raw = read_or_not_found(&path, key).await?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(key)?;
        read_or_not_found(&path, key).await
    }

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        let meta = ObjectMeta {
            content_type: content_type.to_string(),
            size: bytes.len(),
            stored_at: Utc::now(),
        };

        write_atomically(&path, bytes).await?;
        write_atomically(&sidecar_path(&path), &serde_json::to_vec_pretty(&meta)?).await?;
        debug!("Stored {} ({} bytes) at {}", key, bytes.len(), path.display());
        Ok(())
    }
}

/// One JSON document per record at `<root>/<session_id>/<lecture_id>.json`
pub struct FsSessionStore {
    root: PathBuf,
}

impl FsSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, key: &SessionKey) -> Result<PathBuf, StoreError> {
        for segment in [&key.session_id, &key.lecture_id] {
            let safe = !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
            if !safe {
                return Err(StoreError::InvalidKey {
                    key: key.to_string(),
                });
            }
        }
        Ok(self
            .root
            .join(&key.session_id)
            .join(format!("{}.json", key.lecture_id)))
    }
}

#[async_trait]
impl SessionStore for FsSessionStore {
    async fn get(&self, key: &SessionKey) -> Result<Option<PersistedConversation>, StoreError> {
        let path = self.record_path(key)?;
        match fs::read(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert(&self, record: &PersistedConversation) -> Result<(), StoreError> {
        let path = self.record_path(&record.key())?;
        write_atomically(&path, &serde_json::to_vec_pretty(record)?).await
    }
}

fn sidecar_path(path: &Path) -> PathBuf {
    with_suffix(path, ".meta.json")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

async fn read_or_not_found(path: &Path, key: &str) -> Result<Vec<u8>, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
            key: key.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = with_suffix(path, &format!(".{}.tmp", uuid::Uuid::new_v4()));
    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
