//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the artifact cache is writable

use crate::services::resize_service::ResizeService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::HashMap, path::Path};
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Liveness probe. Always 200, never touches disk or network.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Writes, reads back and deletes a probe file in the cache root. 200 when
/// that round trip works, 503 otherwise. The source store is not probed; a
/// cache hit can be served without it.
pub async fn readyz(State(service): State<ResizeService>) -> impl IntoResponse {
    let cache_check = probe_dir(service.cache().root()).await;
    let overall_ok = cache_check.ok;

    let mut checks = HashMap::new();
    checks.insert("cache", cache_check);

    let body = ReadyResponse {
        status: (if overall_ok { "ok" } else { "error" }).into(),
        checks,
    };
    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

async fn probe_dir(dir: &Path) -> CheckStatus {
    let tmp_path = dir.join(format!(".readyz-{}", Uuid::new_v4()));
    let failed = |error: String| CheckStatus {
        ok: false,
        error: Some(error),
    };

    if let Err(e) = fs::write(&tmp_path, b"readyz").await {
        return failed(format!("could not write tmp file: {}", e));
    }
    let read = fs::read(&tmp_path).await;
    let removed = fs::remove_file(&tmp_path).await;

    match read {
        Ok(bytes) if bytes == b"readyz" => CheckStatus {
            ok: true,
            error: removed
                .err()
                .map(|e| format!("could not remove tmp file: {}", e)),
        },
        Ok(_) => failed("file content mismatch".into()),
        Err(e) => failed(format!("could not read tmp file: {}", e)),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::resize_service::tests::{jpeg_store, service};
    use tempfile::TempDir;

    #[tokio::test]
    async fn ready_when_cache_is_writable() {
        let dir = TempDir::new().unwrap();
        let svc = service(jpeg_store("uploads/a.jpg", 1, 1), dir.path());
        let resp = readyz(State(svc)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn not_ready_when_cache_root_is_missing() {
        let dir = TempDir::new().unwrap();
        let svc = service(jpeg_store("uploads/a.jpg", 1, 1), &dir.path().join("gone"));
        let resp = readyz(State(svc)).await.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        assert_eq!(healthz().await.into_response().status(), StatusCode::OK);
    }
}
