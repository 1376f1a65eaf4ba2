use anyhow::{Context, Result};
use meowcv_core::{AssetResolver, FaceMesh, ThresholdStore};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod http;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("meowcvd starting");

    let config = config::Config::from_env();
    tracing::debug!(?config, "configuration loaded");

    let model_path = config.face_mesh_model_path();
    let engine = engine::spawn_engine(
        config.inference_workers,
        Duration::from_secs(config.detect_timeout_secs),
        Arc::new(ThresholdStore::default()),
        AssetResolver::new(config.assets_root.clone()),
        |worker| {
            tracing::debug!(worker, path = %model_path, "loading face mesh");
            FaceMesh::load(&model_path, config.tensor_layout, config.min_face_confidence)
        },
    )
    .context("failed to start inference engine")?;

    let app = http::router(http::AppState {
        engine,
        assets_root: config.assets_root.clone(),
        bind: config.bind,
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "meowcvd ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await
        .context("http server error")?;

    tracing::info!("meowcvd shutting down");
    Ok(())
}
