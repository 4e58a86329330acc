//! Output encoding. WebP is the only codec this service produces.

use crate::models::format::OutputFormat;
use bytes::Bytes;
use image::DynamicImage;
use thiserror::Error;

/// Highest quality libwebp accepts.
const MAX_QUALITY: u32 = 100;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("quality {0} is outside the codec range 1-100")]
    QualityOutOfRange(u32),
    #[error("{format:?} encoding failed: {reason}")]
    Codec {
        format: OutputFormat,
        reason: String,
    },
}

/// Encode `image` as lossy `format` at `quality`.
pub fn encode(
    image: &DynamicImage,
    quality: u32,
    format: OutputFormat,
) -> Result<Bytes, EncodeError> {
    if quality > MAX_QUALITY {
        return Err(EncodeError::QualityOutOfRange(quality));
    }

    match format {
        OutputFormat::WebP => encode_webp(image, quality as f32),
    }
}

fn encode_webp(image: &DynamicImage, quality: f32) -> Result<Bytes, EncodeError> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), width, height)
        .encode_simple(false, quality)
        .map_err(|err| EncodeError::Codec {
            format: OutputFormat::WebP,
            reason: format!("{:?}", err),
        })?;
    Ok(Bytes::copy_from_slice(&encoded))
}
