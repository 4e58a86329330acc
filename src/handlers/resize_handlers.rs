//! HTTP handler for `GET /resize`.
//! Parameters arrive as raw strings so malformed numbers surface as our own
//! 400 responses instead of extractor rejections.

use crate::{
    errors::AppError,
    models::request::RawParams,
    services::resize_service::{Artifact, ResizeService},
};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Deserialize;
use tracing::{debug, error};

/// Artifacts never change for a given URL, so clients may keep them a year.
const CACHE_CONTROL: &str = "public, max-age=31536000";

#[derive(Debug, Default, Deserialize)]
pub struct ResizeQuery {
    pub filename: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub quality: Option<String>,
    pub crop: Option<String>,
}

/// `GET /resize?filename=&width=&height=&quality=&crop=`
pub async fn resize_image(
    State(service): State<ResizeService>,
    Query(q): Query<ResizeQuery>,
) -> Result<Response, AppError> {
    let raw = RawParams {
        identifier: q.filename.as_deref(),
        quality: q.quality.as_deref(),
        width: q.width.as_deref(),
        height: q.height.as_deref(),
        crop: q.crop.as_deref(),
    };

    let artifact = service.resize_image(&raw).await.map_err(|err| {
        if err.is_client_error() {
            debug!("rejected resize of {:?}: {}", q.filename, err);
        } else {
            error!("resize of {:?} failed: {}", q.filename, err);
        }
        AppError::from(err)
    })?;

    debug!(
        "served {:?} ({} bytes, cache_hit={})",
        q.filename,
        artifact.bytes.len(),
        artifact.cache_hit
    );
    Ok(image_response(artifact))
}

fn image_response(artifact: Artifact) -> Response {
    let length = artifact.bytes.len();
    let mut response = Response::new(Body::from(artifact.bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(artifact.format.mime_type()),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    response
}
