//! Resize and center-crop.
//!
//! Geometry is worked out by the pure [`plan`] function and then applied to
//! pixels by [`transform`], so the dimension math is testable without images.
//!
//! - **No crop**: width is fixed to the target, height follows the source
//!   aspect ratio. The requested height is ignored.
//! - **Crop**: scale until the target rectangle is fully covered, then trim
//!   equal margins from both sides of the overflowing axis.
//!
//! The free axis follows the source aspect ratio, so a plan is refused when
//! its canvas or output would be too large to allocate or encode.

use image::{DynamicImage, imageops::FilterType};
use thiserror::Error;

const FILTER: FilterType = FilterType::Lanczos3;

/// Largest resize canvas: 100 megapixels, 400MB as RGBA.
pub const MAX_PIXELS: u64 = 100_000_000;

/// Largest output side the WebP format can hold.
pub const MAX_OUTPUT_SIDE: u32 = 16383;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("resize canvas {width}x{height} exceeds {} pixels", MAX_PIXELS)]
    CanvasTooLarge { width: u32, height: u32 },
    #[error("output {width}x{height} exceeds the maximum side of {}", MAX_OUTPUT_SIDE)]
    OutputTooLarge { width: u32, height: u32 },
}

/// Rectangle cut out of the resized canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Resize dimensions plus an optional crop applied afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformPlan {
    pub resize: (u32, u32),
    pub crop: Option<CropRect>,
}

impl TransformPlan {
    /// Dimensions of the finished image.
    pub fn output(&self) -> (u32, u32) {
        match self.crop {
            Some(rect) => (rect.width, rect.height),
            None => self.resize,
        }
    }

    fn checked(self) -> Result<Self, TransformError> {
        let (width, height) = self.resize;
        if u64::from(width) * u64::from(height) > MAX_PIXELS {
            return Err(TransformError::CanvasTooLarge { width, height });
        }
        let (width, height) = self.output();
        if width > MAX_OUTPUT_SIDE || height > MAX_OUTPUT_SIDE {
            return Err(TransformError::OutputTooLarge { width, height });
        }
        Ok(self)
    }
}

/// Work out how a `source` sized image becomes `target`.
pub fn plan(
    source: (u32, u32),
    target: (u32, u32),
    crop: bool,
) -> Result<TransformPlan, TransformError> {
    let (src_w, src_h) = (source.0.max(1), source.1.max(1));
    let (tgt_w, tgt_h) = target;
    let src_aspect = src_w as f64 / src_h as f64;

    if !crop {
        let h = scaled(tgt_w as f64 / src_aspect);
        return TransformPlan {
            resize: (tgt_w, h),
            crop: None,
        }
        .checked();
    }

    let tgt_aspect = tgt_w as f64 / tgt_h as f64;
    let (w, h) = if src_aspect > tgt_aspect {
        // Source is wider: height matches, width overflows.
        (scaled(tgt_h as f64 * src_aspect).max(tgt_w), tgt_h)
    } else {
        // Source is taller or equal: width matches, height overflows.
        (tgt_w, scaled(tgt_w as f64 / src_aspect).max(tgt_h))
    };

    // The free axis is never smaller than the target, so offsets cannot go
    // negative; saturating_sub keeps that true even for degenerate targets.
    TransformPlan {
        resize: (w, h),
        crop: Some(CropRect {
            x: w.saturating_sub(tgt_w) / 2,
            y: h.saturating_sub(tgt_h) / 2,
            width: tgt_w,
            height: tgt_h,
        }),
    }
    .checked()
}

/// Saturates at `u32::MAX`, which every limit check then rejects.
fn scaled(value: f64) -> u32 {
    (value.round() as u32).max(1)
}

/// Resize (and optionally center-crop) `image` to the requested geometry.
pub fn transform(
    image: &DynamicImage,
    width: u32,
    height: u32,
    crop: bool,
) -> Result<DynamicImage, TransformError> {
    let plan = plan((image.width(), image.height()), (width, height), crop)?;
    let (resize_w, resize_h) = plan.resize;
    let resized = image.resize_exact(resize_w, resize_h, FILTER);

    Ok(match plan.crop {
        Some(rect) => resized.crop_imm(rect.x, rect.y, rect.width, rect.height),
        None => resized,
    })
}
