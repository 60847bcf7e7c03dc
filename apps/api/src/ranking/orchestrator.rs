//! Batch Orchestrator: scores every resume in a request and returns the top candidates.
//!
//! ## Flow
//!
//! 1. Derive the `RequirementProfile` and embed the job description once.
//! 2. Spawn one task per resume, admitted through a `Semaphore` sized by `RANK_WORKERS`.
//! 3. Each task produces a `ResumeOutcome`: scored, or dropped with a reason.
//! 4. Sort survivors by composite descending, index ascending; keep `top_k`.
//!
//! Outstanding tasks are aborted when the batch future is dropped, so a timed-out or
//! abandoned request never merges partial work.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::extraction::{extract_text_blocking, usable_text, ResumeFormat};
use crate::models::{with_timeout, Embedder, EntityTagger, ModelRegistry};
use crate::ranking::composite::{RankedCandidate, ScoreBreakdown};
use crate::ranking::entity_extractor;
use crate::ranking::requirements::{extract_requirements, RequirementProfile};
use crate::ranking::signals::{experience_score, semantic_score, skills_score};

/// Extracted resume text, tagged with its position in the request.
#[derive(Debug, Clone)]
pub struct ResumeInput {
    pub index: usize,
    pub text: String,
    pub format: ResumeFormat,
}

/// Raw uploaded bytes that still need text extraction.
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub index: usize,
    pub bytes: Bytes,
    pub format: ResumeFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedResume {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RankingOutcome {
    /// Best first, at most `top_k` entries.
    pub ranked: Vec<RankedCandidate>,
    /// Resumes that were scored, before `top_k` truncation.
    pub total_scored: usize,
    pub dropped: Vec<DroppedResume>,
}

#[derive(Debug, Error)]
pub enum RankError {
    #[error("none of the {submitted} submitted resumes could be scored")]
    EmptyBatch { submitted: usize },
}

enum ResumeJob {
    Text(ResumeInput),
    Document(ResumeDocument),
}

impl ResumeJob {
    fn index(&self) -> usize {
        match self {
            ResumeJob::Text(input) => input.index,
            ResumeJob::Document(doc) => doc.index,
        }
    }
}

enum ResumeOutcome {
    Scored(RankedCandidate),
    Dropped(DroppedResume),
}

/// Read-only state shared by every task in one batch.
struct BatchContext {
    profile: RequirementProfile,
    job_embedding: Option<Vec<f32>>,
    embedder: Option<Arc<dyn Embedder>>,
    tagger: Option<Arc<dyn EntityTagger>>,
    model_timeout: Duration,
}

/// Aborts every task it still holds when dropped.
struct TaskGroup<T> {
    handles: Vec<(usize, JoinHandle<T>)>,
}

impl<T> TaskGroup<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            handles: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, index: usize, handle: JoinHandle<T>) {
        self.handles.push((index, handle));
    }
}

impl<T> Drop for TaskGroup<T> {
    fn drop(&mut self) {
        for (_, handle) in &self.handles {
            handle.abort();
        }
    }
}

pub struct RankingEngine {
    models: Arc<ModelRegistry>,
    workers: usize,
    model_timeout: Duration,
}

impl RankingEngine {
    pub fn new(models: Arc<ModelRegistry>, workers: usize, model_timeout: Duration) -> Self {
        Self {
            models,
            workers: workers.max(1),
            model_timeout,
        }
    }

    /// Ranks already-extracted resume texts.
    pub async fn rank(
        &self,
        resumes: Vec<ResumeInput>,
        job_description: &str,
        top_k: usize,
    ) -> Result<RankingOutcome, RankError> {
        let jobs = resumes.into_iter().map(ResumeJob::Text).collect();
        self.run(jobs, job_description, top_k).await
    }

    /// Extracts and ranks uploaded documents. Extraction runs inside the worker pool,
    /// so a bad file is just another dropped resume.
    pub async fn rank_documents(
        &self,
        documents: Vec<ResumeDocument>,
        job_description: &str,
        top_k: usize,
    ) -> Result<RankingOutcome, RankError> {
        let jobs = documents.into_iter().map(ResumeJob::Document).collect();
        self.run(jobs, job_description, top_k).await
    }

    async fn run(
        &self,
        jobs: Vec<ResumeJob>,
        job_description: &str,
        top_k: usize,
    ) -> Result<RankingOutcome, RankError> {
        let span = info_span!("rank_batch", batch_id = %Uuid::new_v4());
        self.run_batch(jobs, job_description, top_k)
            .instrument(span)
            .await
    }

    async fn run_batch(
        &self,
        jobs: Vec<ResumeJob>,
        job_description: &str,
        top_k: usize,
    ) -> Result<RankingOutcome, RankError> {
        let submitted = jobs.len();
        info!(submitted, top_k, workers = self.workers, "Ranking batch");

        let ctx = Arc::new(self.prepare(job_description).await);
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = TaskGroup::with_capacity(submitted);

        for job in jobs {
            let index = job.index();
            let ctx = ctx.clone();
            let semaphore = semaphore.clone();
            let handle = tokio::spawn(
                async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => return ResumeOutcome::Dropped(dropped(index, e)),
                    };
                    process_resume(&ctx, job).await
                }
                .in_current_span(),
            );
            tasks.push(index, handle);
        }

        let mut ranked = Vec::with_capacity(submitted);
        let mut dropped_resumes = Vec::new();

        for (index, handle) in tasks.handles.iter_mut() {
            match handle.await {
                Ok(ResumeOutcome::Scored(candidate)) => ranked.push(candidate),
                Ok(ResumeOutcome::Dropped(skipped)) => dropped_resumes.push(skipped),
                Err(e) => {
                    warn!(resume_index = *index, "Scoring task failed: {e}");
                    dropped_resumes.push(dropped(*index, format!("scoring task failed: {e}")));
                }
            }
        }

        if ranked.is_empty() {
            warn!(submitted, "No resume survived extraction and scoring");
            return Err(RankError::EmptyBatch { submitted });
        }

        let total_scored = ranked.len();
        sort_candidates(&mut ranked);
        ranked.truncate(top_k);

        info!(
            total_scored,
            dropped = dropped_resumes.len(),
            returned = ranked.len(),
            "Batch ranked"
        );

        Ok(RankingOutcome {
            ranked,
            total_scored,
            dropped: dropped_resumes,
        })
    }

    /// Resolves the model capabilities and embeds the job description. Every failure
    /// here degrades a signal for the whole batch and is logged once.
    async fn prepare(&self, job_description: &str) -> BatchContext {
        let profile = extract_requirements(job_description);

        let embedder = match self.models.embedder().await {
            Ok(embedder) => Some(embedder),
            Err(e) => {
                warn!("Embedding model unavailable, semantic signal disabled for batch: {e}");
                None
            }
        };

        let tagger = match self.models.tagger().await {
            Ok(tagger) => Some(tagger),
            Err(e) => {
                warn!("NER pipeline unavailable, name detection falls back to heuristics: {e}");
                None
            }
        };

        let job_embedding = match &embedder {
            Some(embedder) => {
                match with_timeout(self.model_timeout, embedder.embed(job_description)).await {
                    Ok(vector) => Some(vector),
                    Err(e) => {
                        warn!("Job description embedding failed, semantic signal is 0.0 for batch: {e}");
                        None
                    }
                }
            }
            None => None,
        };

        debug!(
            embedder = embedder.as_ref().map(|e| e.name()),
            tagger = tagger.as_ref().map(|t| t.name()),
            required_skills = profile.required_skills.len(),
            required_years = ?profile.required_experience_years,
            "Batch context ready"
        );

        BatchContext {
            profile,
            job_embedding,
            embedder,
            tagger,
            model_timeout: self.model_timeout,
        }
    }
}

async fn process_resume(ctx: &BatchContext, job: ResumeJob) -> ResumeOutcome {
    let input = match job {
        ResumeJob::Text(input) => input,
        ResumeJob::Document(doc) => match extract_text_blocking(doc.bytes, doc.format).await {
            Ok(text) => ResumeInput {
                index: doc.index,
                text,
                format: doc.format,
            },
            Err(e) => {
                warn!(resume_index = doc.index, "Dropping resume: {e}");
                return ResumeOutcome::Dropped(dropped(doc.index, e));
            }
        },
    };

    let text = match usable_text(&input.text) {
        Ok(text) => text,
        Err(e) => {
            warn!(resume_index = input.index, "Dropping resume: {e}");
            return ResumeOutcome::Dropped(dropped(input.index, e));
        }
    };

    debug!(
        resume_index = input.index,
        format = ?input.format,
        chars = text.len(),
        "Scoring resume"
    );
    ResumeOutcome::Scored(score_resume(ctx, input.index, text).await)
}

async fn score_resume(ctx: &BatchContext, index: usize, text: &str) -> RankedCandidate {
    let facts =
        entity_extractor::extract(text, ctx.tagger.as_deref(), ctx.model_timeout, index).await;

    let semantic = semantic_score(
        ctx.job_embedding.as_deref(),
        text,
        ctx.embedder.as_deref(),
        ctx.model_timeout,
        index,
    )
    .await;
    let skills = skills_score(&facts.skills, &ctx.profile);
    let experience = experience_score(facts.years_of_experience, &ctx.profile);

    RankedCandidate::new(
        index,
        facts,
        ScoreBreakdown::compose(semantic, skills, experience),
        &ctx.profile,
    )
}

/// Composite descending; equal composites keep request order.
pub fn sort_candidates(candidates: &mut [RankedCandidate]) {
    candidates.sort_by(|a, b| {
        b.match_score
            .total_cmp(&a.match_score)
            .then_with(|| a.index.cmp(&b.index))
    });
}

fn dropped(index: usize, reason: impl ToString) -> DroppedResume {
    DroppedResume {
        index,
        reason: reason.to_string(),
    }
}

/// Engine over the local hashing embedder with NER disabled.
#[cfg(test)]
pub(crate) fn local_engine(workers: usize) -> RankingEngine {
    use crate::config::Config;
    use crate::models::inference_client::InferenceClient;
    use crate::models::ConfiguredLoader;

    let config = Config::for_tests();
    let client = InferenceClient::new(None, config.model_timeout).unwrap();
    let registry = ModelRegistry::new(Box::new(ConfiguredLoader::new(config.models, client)));
    RankingEngine::new(Arc::new(registry), workers, config.model_timeout)
}
