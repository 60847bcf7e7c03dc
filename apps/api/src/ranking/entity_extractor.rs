//! Entity Extractor: turns resume plain text into a `FactSheet`.
//!
//! Never fails. Each field is produced by its own stage; a stage that finds nothing
//! leaves its field at the default and the rest carry on. Phone, years-of-experience
//! and name are ordered strategy lists where the first hit wins.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{with_timeout, EntityTagger, TaggedEntity};
use crate::ranking::vocabulary::{
    first_years_match, is_section_header, match_skills, title_case, EDUCATION_KEYWORDS,
    EXPERIENCE_PHRASES,
};

/// NER only looks at the head of the document, where the name normally is.
const NER_WINDOW_CHARS: usize = 1000;
const NER_MIN_CONFIDENCE: f32 = 0.9;
const NER_MAX_NAME_TOKENS: usize = 3;
const HEADER_SCAN_LINES: usize = 10;
const EARLIEST_CAREER_YEAR: i32 = 1990;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid email regex")
});

/// Phone shapes in priority order: international with separators, local with
/// separators, bare digit run.
static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\+?\d{1,3}[-.\s]?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}",
        r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}",
        r"\+?\d{10,15}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid phone regex"))
    .collect()
});

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").expect("valid year regex"));

static PRESENT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:present|now|current)\b").expect("valid present regex"));

/// Structured facts pulled from one resume. Built once, never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactSheet {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Title-cased skill names.
    pub skills: BTreeSet<String>,
    pub years_of_experience: f64,
    #[serde(rename = "education")]
    pub education_signals: BTreeSet<String>,
    pub has_degree: bool,
}

/// Full extraction including the NER name stage. NER failure or timeout is logged
/// against `resume_index` and the name falls through to the heuristic strategies.
pub async fn extract(
    text: &str,
    tagger: Option<&dyn EntityTagger>,
    timeout: Duration,
    resume_index: usize,
) -> FactSheet {
    let ner_name = match tagger {
        Some(tagger) => {
            let head = head_chars(text, NER_WINDOW_CHARS);
            match with_timeout(timeout, tagger.tag(head)).await {
                Ok(entities) => name_from_entities(&entities),
                Err(e) => {
                    warn!(resume_index, "NER extraction failed, falling back: {e}");
                    None
                }
            }
        }
        None => None,
    };

    extract_facts(text, ner_name)
}

/// Every stage except the NER call. `ner_name` is whatever the NER stage produced.
pub fn extract_facts(text: &str, ner_name: Option<String>) -> FactSheet {
    if text.trim().is_empty() {
        return FactSheet::default();
    }

    let email = extract_email(text);
    let phone = extract_phone(text);
    let skills = extract_skills(text);
    let years_of_experience = extract_years_of_experience(text);
    let education_signals = extract_education(text);
    let has_degree = !education_signals.is_empty();
    let name = resolve_name(ner_name, text, email.as_deref());

    FactSheet {
        name,
        email,
        phone,
        skills,
        years_of_experience,
        education_signals,
        has_degree,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Contact details
// ────────────────────────────────────────────────────────────────────────────

fn extract_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_string())
}

fn extract_phone(text: &str) -> Option<String> {
    PHONE_PATTERNS
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Skills & education
// ────────────────────────────────────────────────────────────────────────────

fn extract_skills(text: &str) -> BTreeSet<String> {
    match_skills(text).into_iter().map(title_case).collect()
}

fn extract_education(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    EDUCATION_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .map(|kw| title_case(kw))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Years of experience
// ────────────────────────────────────────────────────────────────────────────

type YearsStrategy = fn(&str) -> Option<f64>;

/// Tried in order; the first strategy that yields a value wins, otherwise 0.0.
const YEARS_STRATEGIES: &[YearsStrategy] = &[explicit_years, year_span];

pub fn extract_years_of_experience(text: &str) -> f64 {
    YEARS_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(text))
        .unwrap_or(0.0)
}

fn explicit_years(text: &str) -> Option<f64> {
    first_years_match(text, &EXPERIENCE_PHRASES)
}

fn year_span(text: &str) -> Option<f64> {
    year_span_at(text, Utc::now().year())
}

/// Span between the earliest and latest year referenced in the text, floored at
/// one year. "Present"/"now"/"current" count as `current_year`. Unrelated years
/// (graduation, publications) widen the span too; that is accepted behaviour.
pub fn year_span_at(text: &str, current_year: i32) -> Option<f64> {
    let mut years: Vec<i32> = YEAR
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<i32>().ok())
        .filter(|y| (EARLIEST_CAREER_YEAR..=current_year).contains(y))
        .collect();

    if PRESENT_MARKER.is_match(text) {
        years.push(current_year);
    }

    if years.len() < 2 {
        return None;
    }

    let earliest = years.iter().min()?;
    let latest = years.iter().max()?;
    Some(f64::from(latest - earliest).max(1.0))
}

// ────────────────────────────────────────────────────────────────────────────
// Name
// ────────────────────────────────────────────────────────────────────────────

/// Resolves the name from, in order: the NER result, a title-cased line near the
/// top of the document, the email local part.
fn resolve_name(ner_name: Option<String>, text: &str, email: Option<&str>) -> Option<String> {
    let strategies: [&dyn Fn() -> Option<String>; 3] = [
        &|| ner_name.clone().filter(|n| !is_section_header(n)),
        &|| name_from_leading_lines(text),
        &|| email.and_then(name_from_email),
    ];
    strategies.iter().find_map(|strategy| strategy())
}

/// Joins up to three confident person entities that are not section headers.
pub fn name_from_entities(entities: &[TaggedEntity]) -> Option<String> {
    let tokens: Vec<&str> = entities
        .iter()
        .filter(|e| is_person(&e.entity_type) && e.confidence > NER_MIN_CONFIDENCE)
        .map(|e| e.text.trim())
        .filter(|t| !t.is_empty() && !is_section_header(t))
        .take(NER_MAX_NAME_TOKENS)
        .collect();

    if tokens.is_empty() {
        return None;
    }

    let name = tokens
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!is_section_header(&name)).then_some(name)
}

fn is_person(entity_type: &str) -> bool {
    matches!(entity_type, "PER" | "PERSON" | "B-PER" | "I-PER")
}

/// First of the leading non-empty lines with 2-4 words, each starting upper-case,
/// that is not a section header.
fn name_from_leading_lines(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(HEADER_SCAN_LINES)
        .find(|line| {
            let words: Vec<&str> = line.split_whitespace().collect();
            (2..=4).contains(&words.len())
                && !is_section_header(line)
                && words
                    .iter()
                    .all(|w| w.chars().next().is_some_and(char::is_uppercase))
        })
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// `jane.doe@x.com` → "Jane Doe". Components containing digits are dropped;
/// at least two must remain.
fn name_from_email(email: &str) -> Option<String> {
    let local = email.split('@').next()?;
    let parts: Vec<String> = local
        .split(['.', '_'])
        .filter(|p| !p.is_empty() && !p.chars().any(|c| c.is_ascii_digit()))
        .map(title_case)
        .collect();
    (parts.len() >= 2).then(|| parts.join(" "))
}

/// First `max` characters of `text`, cut on a char boundary.
fn head_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
