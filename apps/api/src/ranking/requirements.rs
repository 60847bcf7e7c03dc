//! Job Requirement Extractor: required skills and stated years from a job description.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ranking::vocabulary::{first_years_match, match_skills, EXPERIENCE_PHRASES};

/// Resume phrasings plus the looser forms postings use: "N+ years experience"
/// without "of", and "minimum N years".
static REQUIREMENT_PHRASES: Lazy<Vec<Regex>> = Lazy::new(|| {
    let mut patterns = EXPERIENCE_PHRASES.clone();
    patterns.extend(
        [
            r"(?i)(\d+(?:\.\d+)?)\+?\s*years?\s+(?:of\s+)?experience",
            r"(?i)minimum\s+(?:of\s+)?(\d+(?:\.\d+)?)\+?\s*years?",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid requirement pattern")),
    );
    patterns
});

/// Derived once per batch and shared read-only by every resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementProfile {
    /// Lower-cased skill names.
    pub required_skills: BTreeSet<String>,
    pub required_experience_years: Option<f64>,
}

/// No year-span fallback here: postings rarely carry date ranges, and the years
/// they do mention (founding dates, deadlines) are not requirements.
pub fn extract_requirements(job_description: &str) -> RequirementProfile {
    RequirementProfile {
        required_skills: match_skills(job_description)
            .into_iter()
            .map(str::to_lowercase)
            .collect(),
        required_experience_years: first_years_match(job_description, &REQUIREMENT_PHRASES),
    }
}
