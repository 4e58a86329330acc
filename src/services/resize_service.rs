//! ResizeService — the resize-and-cache pipeline behind `GET /resize`.
//!
//! validate → cache key → (per-key lock) → cache lookup → on miss:
//! resolve → fetch/decode → transform → encode → store.
//!
//! Cache read failures degrade to a miss and cache write failures are only
//! logged: a storage fault never turns a good transform into a failed request.

use crate::{
    models::{
        format::OutputFormat,
        request::{RawParams, TransformRequest, ValidationError},
    },
    services::{
        cache::{ArtifactCache, CacheKey},
        encoder::{self, EncodeError},
        fetcher::{DecodeError, FetchError, SourceError, SourceFetcher},
        inflight::KeyLocks,
        resolver::IdentifierResolver,
        transform::{self, TransformError},
    },
};
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::{self, JoinError};
use tracing::{debug, info, warn};

/// Default cap on requested width and height.
pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

#[derive(Debug, Error)]
pub enum ResizeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("image processing task failed: {0}")]
    Task(#[from] JoinError),
}

impl From<SourceError> for ResizeError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Fetch(err) => Self::Fetch(err),
            SourceError::Decode(err) => Self::Decode(err),
        }
    }
}

impl ResizeError {
    /// True when the caller sent a bad request rather than the service failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type ResizeResult<T> = Result<T, ResizeError>;

/// Encoded output ready to be served.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Bytes,
    pub format: OutputFormat,
    /// True when served from disk without touching the source store.
    pub cache_hit: bool,
}

#[derive(Clone)]
pub struct ResizeService {
    resolver: Arc<IdentifierResolver>,
    fetcher: SourceFetcher,
    cache: ArtifactCache,
    /// `None` disables single-flight; concurrent misses then race.
    locks: Option<Arc<KeyLocks>>,
    format: OutputFormat,
    max_dimension: u32,
}

impl ResizeService {
    /// Build a service with single-flight enabled and the default dimension cap.
    pub fn new(resolver: IdentifierResolver, fetcher: SourceFetcher, cache: ArtifactCache) -> Self {
        Self {
            resolver: Arc::new(resolver),
            fetcher,
            cache,
            locks: Some(Arc::new(KeyLocks::new())),
            format: OutputFormat::default(),
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.locks = enabled.then(|| Arc::new(KeyLocks::new()));
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Validate raw parameters and run the pipeline.
    ///
    /// Validation happens before anything else, so an invalid request never
    /// reaches the cache or the source store.
    pub async fn resize_image(&self, raw: &RawParams<'_>) -> ResizeResult<Artifact> {
        let request = TransformRequest::parse(raw, self.max_dimension)?;
        self.resize(&request).await
    }

    /// Serve `request` from cache or compute, store and return it.
    pub async fn resize(&self, request: &TransformRequest) -> ResizeResult<Artifact> {
        let key = CacheKey::new(request, self.format);

        if let Some(bytes) = self.lookup(&key).await {
            return Ok(self.artifact(bytes, true));
        }

        let _guard = match &self.locks {
            Some(locks) => {
                let guard = locks.lock(key.as_str()).await;
                // Whoever held the lock before us may have stored it already.
                if let Some(bytes) = self.lookup(&key).await {
                    return Ok(self.artifact(bytes, true));
                }
                Some(guard)
            }
            None => None,
        };

        let location = self.resolver.resolve(&request.identifier);
        info!(
            "cache miss for {}, fetching {}/{}",
            key, location.namespace, location.relative_path
        );
        let source = self.fetcher.fetch(&location).await?;

        let (width, height, crop, quality, format) = (
            request.width,
            request.height,
            request.crop,
            request.quality,
            self.format,
        );
        let bytes = task::spawn_blocking(move || -> ResizeResult<Bytes> {
            let output = transform::transform(&source, width, height, crop)?;
            debug!(
                "transformed {}x{} -> {}x{} (crop={})",
                source.width(),
                source.height(),
                output.width(),
                output.height(),
                crop
            );
            Ok(encoder::encode(&output, quality, format)?)
        })
        .await??;

        if let Err(err) = self.cache.put(&key, &bytes).await {
            warn!("failed to persist artifact, serving it anyway: {}", err);
        }

        Ok(self.artifact(bytes, false))
    }

    async fn lookup(&self, key: &CacheKey) -> Option<Bytes> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => {
                info!("serving {} from disk cache", key);
                Some(bytes)
            }
            Ok(None) => None,
            Err(err) => {
                warn!("{}; recomputing", err);
                None
            }
        }
    }

    fn artifact(&self, bytes: Bytes, cache_hit: bool) -> Artifact {
        Artifact {
            bytes,
            format: self.format,
            cache_hit,
        }
    }
}
