use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;

use crate::config::Config;
use crate::ranking::RankingEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Owns the lazily loaded model registry and the worker-pool size.
    pub engine: Arc<RankingEngine>,
    /// Used by the Lambda surface to list and fetch resumes from a bucket.
    pub s3: S3Client,
}

/// Local-only state: hashing embedder, no NER, an S3 client that is never called.
#[cfg(test)]
pub fn test_state() -> AppState {
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

    let config = Config::for_tests();
    let engine = Arc::new(crate::ranking::orchestrator::local_engine(config.rank_workers));
    let s3_config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(config.storage.aws_region.clone()))
        .credentials_provider(Credentials::new("test", "test", None, None, "resume-ranker-tests"))
        .build();

    AppState {
        config,
        engine,
        s3: S3Client::from_conf(s3_config),
    }
}
