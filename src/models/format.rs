//! Closed sets of image formats: what the source store may hand back and what
//! this service produces.

use image::ImageFormat;

/// Formats the source store is allowed to serve.
///
/// Built from the `Content-Type` the store declares, never from sniffing the
/// payload. Anything outside this set is rejected before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    /// Already-converted assets stored in the output codec.
    WebP,
}

impl SourceFormat {
    /// Map a declared content type to a decodable format.
    ///
    /// Media type parameters (`; charset=...`) are ignored and the comparison
    /// is ASCII case-insensitive. Returns `None` for anything unsupported.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
        }
    }
}

/// The codec every artifact is encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    WebP,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::WebP => "image/webp",
        }
    }

    /// File extension used as the cache key suffix.
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebP => "webp",
        }
    }
}
