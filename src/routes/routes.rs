//! Routes for the resizing proxy.
//!
//! - `GET /resize`  — resize, crop and re-encode a source image (cached)
//! - `GET /healthz` — liveness
//! - `GET /readyz`  — readiness (cache directory writable)

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        resize_handlers::resize_image,
    },
    services::resize_service::ResizeService,
};
use axum::{Router, routing::get};

/// Build the router. Handlers share the [`ResizeService`] state.
pub fn routes() -> Router<ResizeService> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/resize", get(resize_image))
}
