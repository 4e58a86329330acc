//! A validated resize request.
//!
//! Raw query parameters arrive as strings; [`TransformRequest::parse`] turns
//! them into a request or the first [`ValidationError`] it meets. Nothing past
//! this point ever sees an unvalidated value.

use thiserror::Error;

/// Longest identifier accepted. The identifier becomes part of a cache path.
const MAX_IDENTIFIER_LEN: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing image identifier")]
    MissingIdentifier,
    #[error("image identifier `{0}` is not allowed")]
    UnsafeIdentifier(String),
    #[error("quality value `{0}` is not valid")]
    InvalidQuality(String),
    #[error("width value `{0}` is not valid")]
    InvalidWidth(String),
    #[error("height value `{0}` is not valid")]
    InvalidHeight(String),
    #[error("{field} {value} exceeds the maximum of {max}")]
    DimensionTooLarge {
        field: &'static str,
        value: u32,
        max: u32,
    },
}

/// Raw, unparsed parameters as received by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct RawParams<'a> {
    pub identifier: Option<&'a str>,
    pub quality: Option<&'a str>,
    pub width: Option<&'a str>,
    pub height: Option<&'a str>,
    pub crop: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformRequest {
    /// Opaque identifier exactly as the caller sent it.
    pub identifier: String,
    pub width: u32,
    pub height: u32,
    pub quality: u32,
    pub crop: bool,
}

impl TransformRequest {
    /// Validate raw parameters.
    ///
    /// Quality, width and height must be positive integers; width and height
    /// are further capped at `max_dimension`. Quality has no upper bound here.
    /// `crop` is true only for the literal `true` (any case).
    pub fn parse(raw: &RawParams<'_>, max_dimension: u32) -> Result<Self, ValidationError> {
        let identifier = raw
            .identifier
            .filter(|id| !id.is_empty())
            .ok_or(ValidationError::MissingIdentifier)?;
        ensure_identifier_safe(identifier)?;

        let quality = parse_positive(raw.quality)
            .ok_or_else(|| ValidationError::InvalidQuality(display_raw(raw.quality)))?;
        let width = parse_positive(raw.width)
            .ok_or_else(|| ValidationError::InvalidWidth(display_raw(raw.width)))?;
        let height = parse_positive(raw.height)
            .ok_or_else(|| ValidationError::InvalidHeight(display_raw(raw.height)))?;

        for (field, value) in [("width", width), ("height", height)] {
            if value > max_dimension {
                return Err(ValidationError::DimensionTooLarge {
                    field,
                    value,
                    max: max_dimension,
                });
            }
        }

        let crop = raw.crop.is_some_and(|c| c.eq_ignore_ascii_case("true"));

        Ok(Self {
            identifier: identifier.to_string(),
            width,
            height,
            quality,
            crop,
        })
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw?.parse::<u32>().ok().filter(|value| *value > 0)
}

fn display_raw(raw: Option<&str>) -> String {
    raw.unwrap_or_default().to_string()
}

/// Reject identifiers that could escape the cache root once they become part
/// of a file path: absolute paths, `..` segments, backslashes and control
/// bytes. A directory segment shaped like an artifact file name is refused
/// too, since the directory would sit on another key's artifact path.
fn ensure_identifier_safe(identifier: &str) -> Result<(), ValidationError> {
    let mut segments = identifier.rsplit('/');
    segments.next();
    let shadows_artifact = segments.any(is_artifact_name);

    let unsafe_id = identifier.len() > MAX_IDENTIFIER_LEN
        || identifier.starts_with('/')
        || identifier.split('/').any(|seg| seg == "..")
        || shadows_artifact
        || identifier
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\');

    if unsafe_id {
        return Err(ValidationError::UnsafeIdentifier(identifier.to_string()));
    }
    Ok(())
}

/// Matches `{anything}_{w}x{h}_q{q}_crop{true|false}.{ext}`.
fn is_artifact_name(segment: &str) -> bool {
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    let Some((head, tail)) = segment.rsplit_once("_crop") else {
        return false;
    };
    let Some((flag, ext)) = tail.split_once('.') else {
        return false;
    };
    if !matches!(flag, "true" | "false") || ext.is_empty() {
        return false;
    }
    let Some((head, quality)) = head.rsplit_once("_q") else {
        return false;
    };
    let Some((_, dims)) = head.rsplit_once('_') else {
        return false;
    };
    dims.split_once('x')
        .is_some_and(|(w, h)| digits(w) && digits(h) && digits(quality))
}
