//! Request intake: turns JSON bodies, multipart uploads, Lambda events and bucket
//! listings into one `RankRequest`, then hands it to the ranking engine.

pub mod handlers;
pub mod lambda;
pub mod multipart;
pub mod storage;
pub mod validation;

use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::ranking::composite::round2;
use crate::ranking::{DroppedResume, RankedCandidate, RankingEngine, RankingOutcome, ResumeDocument};

/// Request-level limits applied by every intake path.
#[derive(Debug, Clone, Copy)]
pub struct IntakeLimits {
    pub max_resumes: usize,
    pub default_top_k: usize,
}

impl From<&Config> for IntakeLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_resumes: config.max_resumes_per_request,
            default_top_k: config.default_top_k,
        }
    }
}

/// A validated ranking request. `rejected` holds resumes that were refused before
/// extraction (bad base64, unsupported type, empty file); they never abort the batch.
#[derive(Debug)]
pub struct RankRequest {
    pub job_description: String,
    pub top_k: usize,
    pub documents: Vec<ResumeDocument>,
    pub rejected: Vec<DroppedResume>,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub success: bool,
    pub total_resumes_processed: usize,
    pub top_candidates: usize,
    pub ranked_resumes: Vec<RankedCandidate>,
    pub processing_time_seconds: f64,
}

impl RankResponse {
    fn new(outcome: RankingOutcome, processing_time_seconds: f64) -> Self {
        Self {
            success: true,
            total_resumes_processed: outcome.total_scored,
            top_candidates: outcome.ranked.len(),
            ranked_resumes: outcome.ranked,
            processing_time_seconds,
        }
    }
}

/// Ranks a validated request. `started` is when the request arrived, so the reported
/// processing time covers decoding and validation too.
pub async fn run_ranking(
    engine: &RankingEngine,
    request: RankRequest,
    started: Instant,
) -> Result<RankResponse, AppError> {
    for rejected in &request.rejected {
        warn!(resume_index = rejected.index, "Dropping resume: {}", rejected.reason);
    }

    if request.documents.is_empty() {
        warn!(
            rejected = request.rejected.len(),
            "Every resume was rejected before extraction"
        );
        return Err(AppError::EmptyBatch);
    }

    info!(
        "Processing {} resumes, returning top {}",
        request.documents.len(),
        request.top_k
    );

    let outcome = engine
        .rank_documents(request.documents, &request.job_description, request.top_k)
        .await?;

    let processing_time_seconds = round2(started.elapsed().as_secs_f64());
    info!(
        dropped_during_ranking = outcome.dropped.len(),
        "Request completed in {processing_time_seconds}s"
    );

    Ok(RankResponse::new(outcome, processing_time_seconds))
}
