use anyhow::Result;
use axum::Router;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{
    cache::ArtifactCache,
    fetcher::{HttpSourceStore, SourceFetcher},
    resize_service::ResizeService,
    resolver::IdentifierResolver,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting image-resizer with config: {:?}", cfg);

    // --- Ensure cache directory exists ---
    if !Path::new(&cfg.cache_dir).exists() {
        fs::create_dir_all(&cfg.cache_dir)?;
        tracing::info!("Created cache directory at {}", cfg.cache_dir);
    }

    // --- Initialize core service ---
    let store = HttpSourceStore::new(cfg.fetch_timeout)?;
    let service = ResizeService::new(
        IdentifierResolver::new(cfg.source_base_url.clone()),
        SourceFetcher::new(Arc::new(store)),
        ArtifactCache::new(&cfg.cache_dir),
    )
    .with_single_flight(cfg.single_flight)
    .with_max_dimension(cfg.max_dimension);

    if !cfg.single_flight {
        tracing::warn!("single-flight disabled; concurrent misses may compute the same artifact");
    }

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
