mod config;
mod errors;
mod extraction;
mod intake;
mod models;
mod ranking;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::models::inference_client::InferenceClient;
use crate::models::{ConfiguredLoader, ModelRegistry};
use crate::ranking::RankingEngine;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.log_level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Ranking API v{}", env!("CARGO_PKG_VERSION"));

    // Model capabilities: loaded lazily, at most once, shared by every request
    let inference = InferenceClient::new(config.models.inference_api_key.clone(), config.model_timeout)
        .context("Failed to build inference HTTP client")?;
    let registry = Arc::new(ModelRegistry::new(Box::new(ConfiguredLoader::new(
        config.models.clone(),
        inference,
    ))));

    // Warm up in the background so the listener comes up immediately
    let warmup = registry.clone();
    tokio::spawn(async move { warmup.warm_up().await });

    let engine = Arc::new(RankingEngine::new(
        registry,
        config.rank_workers,
        config.model_timeout,
    ));
    info!(
        "Ranking engine ready ({} workers, {:?} model timeout)",
        config.rank_workers, config.model_timeout
    );

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    let state = AppState {
        config: config.clone(),
        engine,
        s3,
    };

    let app = build_router(state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// S3 client from the default credential chain. `S3_ENDPOINT` points it at MinIO or
/// another compatible store.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.storage.aws_region.clone()));
    if let Some(endpoint) = &config.storage.s3_endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let shared = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(config.storage.s3_endpoint.is_some())
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
