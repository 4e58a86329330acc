//! Source retrieval: pull bytes from the remote store and decode them.
//!
//! The store itself sits behind [`SourceStore`] so the pipeline can be run
//! against an in-memory fake. [`HttpSourceStore`] is the production
//! implementation.

use crate::models::{format::SourceFormat, source::SourceLocation};
use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use reqwest::{Client, header::CONTENT_TYPE};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("source returned status {0}")]
    Status(u16),
    #[error("source request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported source content type `{0}`")]
    UnsupportedContentType(String),
    #[error("corrupt source image: {0}")]
    Corrupt(#[from] image::ImageError),
}

/// Raw payload returned by a source store.
#[derive(Debug, Clone)]
pub struct RemoteBlob {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Read-only blob access by URL.
#[async_trait]
pub trait SourceStore: Send + Sync + 'static {
    /// Fetch the blob at `url`. Non-success responses are errors.
    async fn get(&self, url: &str) -> Result<RemoteBlob, FetchError>;
}

/// [`SourceStore`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSourceStore {
    client: Client,
}

impl HttpSourceStore {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceStore for HttpSourceStore {
    async fn get(&self, url: &str) -> Result<RemoteBlob, FetchError> {
        debug!("downloading source image from {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        Ok(RemoteBlob {
            content_type,
            bytes,
        })
    }
}

/// Errors from [`SourceFetcher::fetch`].
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Fetches a source location and decodes it into pixels.
#[derive(Clone)]
pub struct SourceFetcher {
    store: Arc<dyn SourceStore>,
}

impl SourceFetcher {
    pub fn new(store: Arc<dyn SourceStore>) -> Self {
        Self { store }
    }

    pub async fn fetch(&self, location: &SourceLocation) -> Result<DynamicImage, SourceError> {
        let blob = self.store.get(&location.url).await?;
        Ok(decode(&blob)?)
    }
}

/// Decode a blob using the format its declared content type names.
pub fn decode(blob: &RemoteBlob) -> Result<DynamicImage, DecodeError> {
    let declared = blob.content_type.as_deref().unwrap_or_default();
    let format = SourceFormat::from_content_type(declared)
        .ok_or_else(|| DecodeError::UnsupportedContentType(declared.to_string()))?;

    let image = image::load_from_memory_with_format(&blob.bytes, format.image_format())?;
    debug!(
        "decoded {:?} source {}x{}",
        format,
        image.width(),
        image.height()
    );
    Ok(image)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::source::Namespace;
    use axum::{Router, http::header, response::IntoResponse, routing::get};
    use image::{ImageFormat, Rgb, RgbImage};
    use std::{
        collections::HashMap,
        io::Cursor,
        sync::atomic::{AtomicUsize, Ordering},
    };

    /// Encode a solid-colour image in `format`.
    pub(crate) fn sample_bytes(width: u32, height: u32, format: ImageFormat) -> Bytes {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, format)
            .expect("encode sample");
        Bytes::from(buf.into_inner())
    }

    /// In-memory store that counts every `get`.
    #[derive(Default)]
    pub(crate) struct CountingStore {
        pub blobs: HashMap<String, RemoteBlob>,
        pub calls: AtomicUsize,
    }

    impl CountingStore {
        pub(crate) fn with_blob(url: &str, content_type: &str, bytes: Bytes) -> Self {
            let mut blobs = HashMap::new();
            blobs.insert(
                url.to_string(),
                RemoteBlob {
                    content_type: Some(content_type.to_string()),
                    bytes,
                },
            );
            Self {
                blobs,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SourceStore for CountingStore {
        async fn get(&self, url: &str) -> Result<RemoteBlob, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.blobs.get(url).cloned().ok_or(FetchError::Status(404))
        }
    }

    fn location(url: &str) -> SourceLocation {
        SourceLocation {
            namespace: Namespace::Ads,
            relative_path: "x".into(),
            url: url.into(),
        }
    }

    #[test]
    fn decodes_each_supported_format() {
        for (content_type, format) in [
            ("image/jpeg", ImageFormat::Jpeg),
            ("image/jpg", ImageFormat::Jpeg),
            ("image/png", ImageFormat::Png),
            ("image/webp", ImageFormat::WebP),
        ] {
            let blob = RemoteBlob {
                content_type: Some(content_type.into()),
                bytes: sample_bytes(12, 8, format),
            };
            let img = decode(&blob).unwrap_or_else(|e| panic!("{content_type}: {e}"));
            assert_eq!((img.width(), img.height()), (12, 8));
        }
    }

    #[test]
    fn unknown_content_type_is_an_error() {
        let blob = RemoteBlob {
            content_type: Some("image/gif".into()),
            bytes: sample_bytes(4, 4, ImageFormat::Png),
        };
        assert!(matches!(
            decode(&blob),
            Err(DecodeError::UnsupportedContentType(ct)) if ct == "image/gif"
        ));

        let blob = RemoteBlob {
            content_type: None,
            bytes: sample_bytes(4, 4, ImageFormat::Png),
        };
        assert!(matches!(
            decode(&blob),
            Err(DecodeError::UnsupportedContentType(_))
        ));
    }

    #[test]
    fn corrupt_bytes_are_a_decode_error() {
        let mut bytes = sample_bytes(32, 32, ImageFormat::Png).to_vec();
        bytes.truncate(bytes.len() / 3);
        let blob = RemoteBlob {
            content_type: Some("image/png".into()),
            bytes: Bytes::from(bytes),
        };
        assert!(matches!(decode(&blob), Err(DecodeError::Corrupt(_))));
    }

    #[test]
    fn content_type_wins_over_payload() {
        // PNG bytes declared as JPEG must not be sniffed into success.
        let blob = RemoteBlob {
            content_type: Some("image/jpeg".into()),
            bytes: sample_bytes(4, 4, ImageFormat::Png),
        };
        assert!(matches!(decode(&blob), Err(DecodeError::Corrupt(_))));
    }

    #[tokio::test]
    async fn fetcher_propagates_store_status() {
        let fetcher = SourceFetcher::new(Arc::new(CountingStore::default()));
        let err = fetcher
            .fetch(&location("https://cdn/missing.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Fetch(FetchError::Status(404))));
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn http_store_reads_body_and_content_type() {
        let png = sample_bytes(6, 3, ImageFormat::Png);
        let body = png.clone();
        let router = Router::new().route(
            "/ads/logo.png",
            get(move || {
                let body = body.clone();
                async move { ([(header::CONTENT_TYPE, "image/png")], body).into_response() }
            }),
        );
        let base = serve(router).await;

        let store = HttpSourceStore::new(Duration::from_secs(5)).unwrap();
        let blob = store.get(&format!("{}/ads/logo.png", base)).await.unwrap();
        assert_eq!(blob.content_type.as_deref(), Some("image/png"));
        assert_eq!(blob.bytes, png);

        let fetcher = SourceFetcher::new(Arc::new(store));
        let img = fetcher
            .fetch(&location(&format!("{}/ads/logo.png", base)))
            .await
            .unwrap();
        assert_eq!((img.width(), img.height()), (6, 3));
    }

    #[tokio::test]
    async fn http_store_maps_non_success_status() {
        let base = serve(Router::new()).await;
        let store = HttpSourceStore::new(Duration::from_secs(5)).unwrap();
        let err = store
            .get(&format!("{}/ads/nope.jpg", base))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }
}
