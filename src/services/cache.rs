//! Disk-backed artifact cache.
//!
//! One file per [`CacheKey`] beneath `root`. Artifacts are written once and
//! never expire; there is no eviction or invalidation. Writes go through a
//! temporary file in the destination directory and are renamed into place, so
//! readers only ever see whole artifacts and racing writers resolve to
//! last-writer-wins.

use crate::models::{format::OutputFormat, request::TransformRequest};
use bytes::Bytes;
use std::{
    fmt,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("reading cached artifact `{key}`: {source}")]
    Read { key: String, source: io::Error },
    #[error("writing cached artifact `{key}`: {source}")]
    Write { key: String, source: io::Error },
}

/// Literal, human-readable cache key:
/// `{identifier}_{width}x{height}_q{quality}_crop{true|false}.{ext}`.
///
/// Every field after the identifier has a fixed shape with no `_`, so a key
/// parses back unambiguously from the right and distinct requests never share
/// a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(request: &TransformRequest, format: OutputFormat) -> Self {
        Self(format!(
            "{}_{}x{}_q{}_crop{}.{}",
            request.identifier,
            request.width,
            request.height,
            request.quality,
            request.crop,
            format.extension()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact for `key`. Identifiers containing `/` nest.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Look up an artifact. `Ok(None)` is a miss; any other I/O failure is an
    /// error the caller can tell apart from a miss.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        match fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Persist an artifact, creating parent directories as needed.
    pub async fn put(&self, key: &CacheKey, data: &[u8]) -> Result<(), CacheError> {
        let wrap = |source: io::Error| CacheError::Write {
            key: key.to_string(),
            source,
        };

        let file_path = self.path_for(key);
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| wrap(io::Error::other("artifact path missing parent directory")))?;
        fs::create_dir_all(&parent).await.map_err(wrap)?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        if let Err(err) = write_synced(&tmp_path, data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(wrap(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(wrap(err));
        }

        debug!("stored artifact {} ({} bytes)", file_path.display(), data.len());
        Ok(())
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await
}
