//! Fixed vocabularies and compiled patterns shared by the resume and job-description extractors.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Skills recognised in resumes and job descriptions. Matching is exact and
/// case-insensitive on whole words; there is no fuzzy or partial matching.
pub const SKILL_KEYWORDS: &[&str] = &[
    // Programming languages
    "python", "java", "javascript", "typescript", "c++", "c#", "ruby", "php",
    "swift", "kotlin", "go", "rust", "scala", "r", "matlab", "perl",
    // Web
    "react", "angular", "vue", "node.js", "express", "django", "flask",
    "spring", "asp.net", "html", "css", "sass", "webpack", "next.js",
    // Databases
    "sql", "mysql", "postgresql", "mongodb", "redis", "cassandra",
    "dynamodb", "oracle", "sqlite", "elasticsearch",
    // Cloud & DevOps
    "aws", "azure", "gcp", "docker", "kubernetes", "jenkins", "gitlab",
    "terraform", "ansible", "ci/cd", "microservices",
    // Data science & ML
    "machine learning", "deep learning", "tensorflow", "pytorch", "keras",
    "scikit-learn", "pandas", "numpy", "nlp", "computer vision", "data analysis",
    // Tools & practices
    "git", "linux", "agile", "scrum", "jira", "rest api", "graphql",
    "testing", "junit", "selenium", "postman",
];

/// Degree names and institution words; matched as plain substrings.
pub const EDUCATION_KEYWORDS: &[&str] = &[
    "bachelor", "master", "phd", "degree", "university", "college",
    "b.tech", "m.tech", "b.s", "m.s", "mba", "computer science",
    "engineering", "graduate",
];

/// Section headers that must never be mistaken for a candidate's name.
pub const SECTION_HEADERS: &[&str] = &[
    "PROFESSIONAL SUMMARY", "SUMMARY", "OBJECTIVE", "EXPERIENCE",
    "WORK EXPERIENCE", "EDUCATION", "SKILLS", "CONTACT", "PROJECTS",
    "CERTIFICATIONS", "LANGUAGES", "REFERENCES", "RESUME", "CV",
    "CURRICULUM VITAE", "ABOUT ME", "PROFILE", "PERSONAL PROFILE",
    "CAREER SUMMARY", "TECHNICAL SKILLS", "KEY SKILLS",
];

/// One compiled matcher per skill. A match must not touch a letter, digit or
/// underscore on either side, which keeps `java` out of `javascript` while still
/// matching symbol-terminated skills such as `c++` and `c#`.
static SKILL_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SKILL_KEYWORDS
        .iter()
        .map(|skill| {
            let pattern = format!(r"(?i)(?:^|[^\w]){}(?:[^\w]|$)", regex::escape(skill));
            (*skill, Regex::new(&pattern).expect("valid skill pattern"))
        })
        .collect()
});

/// Explicit "N years of experience" phrasings, tried in order. Capture 1 is the count.
pub static EXPERIENCE_PHRASES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(\d+(?:\.\d+)?)\+?\s*years?\s+of\s+experience",
        r"(?i)(\d+(?:\.\d+)?)\+?\s*yrs?\s+experience",
        r"(?i)experience\s*:\s*(\d+(?:\.\d+)?)\+?\s*years?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid experience pattern"))
    .collect()
});

/// Skill keywords (lower-case, as listed) that occur in `text`.
pub fn match_skills(text: &str) -> BTreeSet<&'static str> {
    SKILL_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(skill, _)| *skill)
        .collect()
}

/// First count captured by `patterns`, in pattern order.
pub fn first_years_match(text: &str, patterns: &[Regex]) -> Option<f64> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    })
}

pub fn is_section_header(candidate: &str) -> bool {
    let upper = candidate.trim().to_uppercase();
    SECTION_HEADERS.iter().any(|h| *h == upper)
}

/// Title-cases the way resume vocabularies are usually displayed: a letter is
/// upper-cased when it follows a non-letter, lower-cased otherwise
/// (`node.js` → `Node.Js`, `ci/cd` → `Ci/Cd`).
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_match_respects_word_boundaries() {
        let skills = match_skills("Built JavaScript frontends");
        assert!(skills.contains("javascript"));
        assert!(!skills.contains("java"));
    }

    #[test]
    fn test_skill_match_handles_symbols() {
        let skills = match_skills("Languages: C++, C#; runtime Node.js; CI/CD with Jenkins");
        for expected in ["c++", "c#", "node.js", "ci/cd", "jenkins"] {
            assert!(skills.contains(expected), "missing {expected}: {skills:?}");
        }
    }

    #[test]
    fn test_skill_match_multi_word_and_case() {
        let skills = match_skills("Focus on MACHINE LEARNING and Computer Vision.");
        assert!(skills.contains("machine learning"));
        assert!(skills.contains("computer vision"));
        assert!(!skills.contains("deep learning"));
    }

    #[test]
    fn test_skill_match_rejects_partial_words() {
        let skills = match_skills("Gopher enthusiast, rusty on perlite");
        assert!(!skills.contains("go"));
        assert!(!skills.contains("rust"));
        assert!(!skills.contains("perl"));
    }

    #[test]
    fn test_first_years_match_order_and_decimals() {
        assert_eq!(
            first_years_match("I have 2.5 years of experience", &EXPERIENCE_PHRASES),
            Some(2.5)
        );
        assert_eq!(
            first_years_match("Experience: 7 years in fintech", &EXPERIENCE_PHRASES),
            Some(7.0)
        );
        assert_eq!(first_years_match("10+ yrs experience", &EXPERIENCE_PHRASES), Some(10.0));
        assert_eq!(first_years_match("lots of experience", &EXPERIENCE_PHRASES), None);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("python"), "Python");
        assert_eq!(title_case("node.js"), "Node.Js");
        assert_eq!(title_case("machine learning"), "Machine Learning");
        assert_eq!(title_case("c++"), "C++");
        assert_eq!(title_case("JOHN"), "John");
    }

    #[test]
    fn test_section_header_detection() {
        assert!(is_section_header("Work Experience"));
        assert!(is_section_header("  SUMMARY "));
        assert!(!is_section_header("Jane Doe"));
    }
}
