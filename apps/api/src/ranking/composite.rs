use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ranking::entity_extractor::FactSheet;
use crate::ranking::requirements::RequirementProfile;
use crate::ranking::vocabulary::title_case;

/// Blend of the three signals. Fixed for the process; never taken from a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalWeights {
    pub semantic: f64,
    pub skills: f64,
    pub experience: f64,
}

pub const WEIGHTS: SignalWeights = SignalWeights {
    semantic: 0.5,
    skills: 0.3,
    experience: 0.2,
};

/// Per-signal scores on the 0-100 scale, each rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(rename = "semantic_similarity")]
    pub semantic: f64,
    #[serde(rename = "skills_match")]
    pub skills: f64,
    #[serde(rename = "experience_match")]
    pub experience: f64,
    pub composite: f64,
}

impl ScoreBreakdown {
    /// Takes raw [0, 1] signals. The composite is computed from the unrounded
    /// signals and rounded once.
    pub fn compose(semantic: f64, skills: f64, experience: f64) -> Self {
        let composite = 100.0
            * (WEIGHTS.semantic * semantic
                + WEIGHTS.skills * skills
                + WEIGHTS.experience * experience);

        ScoreBreakdown {
            semantic: round2(semantic * 100.0),
            skills: round2(skills * 100.0),
            experience: round2(experience * 100.0),
            composite: round2(composite),
        }
    }
}

/// One scored resume, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// Position of the resume in the original request.
    pub index: usize,
    #[serde(flatten)]
    pub facts: FactSheet,
    pub match_score: f64,
    pub score_breakdown: ScoreBreakdown,
    /// Candidate skills that the posting asked for, title-cased. Explanatory only.
    pub matched_skills: BTreeSet<String>,
}

impl RankedCandidate {
    pub fn new(
        index: usize,
        facts: FactSheet,
        score_breakdown: ScoreBreakdown,
        profile: &RequirementProfile,
    ) -> Self {
        let matched_skills = matched_skills(&facts.skills, profile);
        RankedCandidate {
            index,
            facts,
            match_score: score_breakdown.composite,
            score_breakdown,
            matched_skills,
        }
    }
}

pub fn matched_skills(
    candidate_skills: &BTreeSet<String>,
    profile: &RequirementProfile,
) -> BTreeSet<String> {
    profile
        .required_skills
        .iter()
        .map(|s| title_case(s))
        .filter(|s| candidate_skills.contains(s))
        .collect()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let sum = WEIGHTS.semantic + WEIGHTS.skills + WEIGHTS.experience;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_compose_matches_weighted_formula() {
        let b = ScoreBreakdown::compose(0.8, 0.5, 1.0);
        assert_eq!(b.composite, 75.0);
        assert_eq!(b.semantic, 80.0);
        assert_eq!(b.skills, 50.0);
        assert_eq!(b.experience, 100.0);
    }

    #[test]
    fn test_compose_rounds_to_two_decimals() {
        let b = ScoreBreakdown::compose(0.123456, 0.0, 0.0);
        assert_eq!(b.semantic, 12.35);
        assert_eq!(b.composite, 6.17);
    }

    #[test]
    fn test_compose_stays_within_bounds() {
        let grid = [0.0, 0.001, 0.25, 0.333, 0.5, 0.7, 0.999, 1.0];
        for &s in &grid {
            for &k in &grid {
                for &e in &grid {
                    let c = ScoreBreakdown::compose(s, k, e).composite;
                    assert!((0.0..=100.0).contains(&c), "composite {c} out of range");
                }
            }
        }
        assert_eq!(ScoreBreakdown::compose(1.0, 1.0, 1.0).composite, 100.0);
        assert_eq!(ScoreBreakdown::compose(0.0, 0.0, 0.0).composite, 0.0);
    }

    #[test]
    fn test_matched_skills_intersection() {
        let profile = RequirementProfile {
            required_skills: ["python", "node.js", "aws"].iter().map(|s| s.to_string()).collect(),
            required_experience_years: None,
        };
        let candidate: BTreeSet<String> =
            ["Python", "Node.Js", "React"].iter().map(|s| s.to_string()).collect();
        let matched = matched_skills(&candidate, &profile);
        let expected: BTreeSet<String> = ["Node.Js", "Python"].iter().map(|s| s.to_string()).collect();
        assert_eq!(matched, expected);
    }

    #[test]
    fn test_ranked_candidate_json_shape() {
        let facts = FactSheet {
            name: Some("Jane Doe".to_string()),
            skills: ["Python".to_string()].into_iter().collect(),
            years_of_experience: 6.0,
            ..Default::default()
        };
        let profile = RequirementProfile {
            required_skills: ["python".to_string()].into_iter().collect(),
            required_experience_years: Some(5.0),
        };
        let candidate =
            RankedCandidate::new(2, facts, ScoreBreakdown::compose(0.6, 1.0, 1.0), &profile);
        let json = serde_json::to_value(&candidate).unwrap();

        assert_eq!(json["index"], 2);
        assert_eq!(json["name"], "Jane Doe");
        assert_eq!(json["email"], serde_json::Value::Null);
        assert_eq!(json["years_of_experience"], 6.0);
        assert_eq!(json["match_score"], 80.0);
        assert_eq!(json["score_breakdown"]["semantic_similarity"], 60.0);
        assert_eq!(json["score_breakdown"]["skills_match"], 100.0);
        assert_eq!(json["matched_skills"][0], "Python");
        assert!(json["education"].as_array().unwrap().is_empty());
    }
}
