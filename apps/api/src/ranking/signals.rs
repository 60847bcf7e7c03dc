//! Signal Scorers: semantic similarity, skills overlap and experience adequacy.
//!
//! Each returns a score in [0, 1]. The composite ranker rescales to 0-100.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, warn};

use crate::models::{cosine_similarity, with_timeout, Embedder};
use crate::ranking::requirements::RequirementProfile;

/// Skills score when the posting names no recognised skill.
pub const NEUTRAL_SKILLS_SCORE: f64 = 0.5;

/// Cosine similarity between the job-description embedding and the resume's,
/// clamped to [0, 1]. Any capability failure or timeout degrades to 0.0.
pub async fn semantic_score(
    job_embedding: Option<&[f32]>,
    resume_text: &str,
    embedder: Option<&dyn Embedder>,
    timeout: Duration,
    resume_index: usize,
) -> f64 {
    let (Some(job_embedding), Some(embedder)) = (job_embedding, embedder) else {
        debug!(resume_index, "Semantic signal degraded to 0.0: no job-description embedding");
        return 0.0;
    };

    match with_timeout(timeout, embedder.embed(resume_text)).await {
        Ok(resume_embedding) => cosine_similarity(job_embedding, &resume_embedding).clamp(0.0, 1.0),
        Err(e) => {
            warn!(resume_index, "Semantic signal degraded to 0.0: {e}");
            0.0
        }
    }
}

/// Fraction of required skills the candidate has. Order-independent and
/// case-insensitive; 0.5 when nothing is required, 0.0 when the candidate lists none.
pub fn skills_score(candidate_skills: &BTreeSet<String>, profile: &RequirementProfile) -> f64 {
    let required = &profile.required_skills;
    if required.is_empty() {
        return NEUTRAL_SKILLS_SCORE;
    }
    if candidate_skills.is_empty() {
        return 0.0;
    }

    let candidate: BTreeSet<String> = candidate_skills.iter().map(|s| s.to_lowercase()).collect();
    let matched = candidate.intersection(required).count();
    (matched as f64 / required.len() as f64).min(1.0)
}

/// Banded experience adequacy.
///
/// With a stated requirement R: 1.0 at ≥R, 0.7 at ≥0.7R, 0.5 at ≥0.5R, else 0.3.
/// Without one: 0.8 at ≥5y, 0.6 at ≥2y, 0.4 at ≥1y, else 0.2.
pub fn experience_score(candidate_years: f64, profile: &RequirementProfile) -> f64 {
    match profile.required_experience_years {
        Some(required) => {
            if candidate_years >= required {
                1.0
            } else if candidate_years >= required * 0.7 {
                0.7
            } else if candidate_years >= required * 0.5 {
                0.5
            } else {
                0.3
            }
        }
        None => {
            if candidate_years >= 5.0 {
                0.8
            } else if candidate_years >= 2.0 {
                0.6
            } else if candidate_years >= 1.0 {
                0.4
            } else {
                0.2
            }
        }
    }
}
