//! Text extraction: turns uploaded resume bytes into plain text.
//!
//! PDF goes through `pdf-extract`; DOCX is read straight out of its zip container
//! (see `docx`). Both are CPU-bound, so `extract_text_blocking` runs them on the
//! blocking pool and turns a decoder panic into an error for that one resume.

mod docx;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resumes with fewer usable characters than this carry no signal and are never scored.
pub const MIN_USABLE_CHARS: usize = 50;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type '{0}'. Please use 'pdf' or 'docx'.")]
    UnsupportedFormat(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Insufficient text content ({chars} usable characters)")]
    InsufficientText { chars: usize },

    #[error("Extractor panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeFormat {
    #[default]
    Pdf,
    Docx,
}

impl ResumeFormat {
    /// Parses the `file_type` field of a JSON resume entry.
    pub fn parse(value: &str) -> Result<Self, ExtractionError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ResumeFormat::Pdf),
            "docx" => Ok(ResumeFormat::Docx),
            other => Err(ExtractionError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Infers the format from a filename or object key extension.
    pub fn from_filename(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            Some(ResumeFormat::Pdf)
        } else if lower.ends_with(".docx") {
            Some(ResumeFormat::Docx)
        } else {
            None
        }
    }
}

/// Synchronous extraction. Prefer `extract_text_blocking` from async code.
pub fn extract_text(bytes: &[u8], format: ResumeFormat) -> Result<String, ExtractionError> {
    match format {
        ResumeFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractionError::Pdf(e.to_string())),
        ResumeFormat::Docx => docx::extract_docx_text(bytes),
    }
}

/// Runs `extract_text` on the blocking pool.
pub async fn extract_text_blocking(
    bytes: bytes::Bytes,
    format: ResumeFormat,
) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract_text(&bytes, format))
        .await
        .map_err(|e| ExtractionError::Panicked(e.to_string()))?
}

/// Number of non-whitespace characters in `text`.
pub fn usable_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Rejects text below the usable-length threshold.
pub fn usable_text(text: &str) -> Result<&str, ExtractionError> {
    let chars = usable_chars(text);
    if chars < MIN_USABLE_CHARS {
        return Err(ExtractionError::InsufficientText { chars });
    }
    Ok(text)
}

#[cfg(test)]
pub(crate) use docx::build_docx;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_is_case_insensitive() {
        assert_eq!(ResumeFormat::parse("PDF").unwrap(), ResumeFormat::Pdf);
        assert_eq!(ResumeFormat::parse(" docx ").unwrap(), ResumeFormat::Docx);
    }

    #[test]
    fn test_parse_format_rejects_unknown() {
        let err = ResumeFormat::parse("rtf").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(ref f) if f == "rtf"));
    }

    #[test]
    fn test_format_from_filename() {
        assert_eq!(ResumeFormat::from_filename("Jane_CV.PDF"), Some(ResumeFormat::Pdf));
        assert_eq!(ResumeFormat::from_filename("cv/jane.docx"), Some(ResumeFormat::Docx));
        assert_eq!(ResumeFormat::from_filename("jane.doc"), None);
        assert_eq!(ResumeFormat::from_filename("folder/"), None);
    }

    #[test]
    fn test_usable_text_counts_non_whitespace_only() {
        let padded = format!("{}{}", " \n\t".repeat(40), "a".repeat(49));
        assert!(matches!(
            usable_text(&padded),
            Err(ExtractionError::InsufficientText { chars: 49 })
        ));
        let enough = "a".repeat(50);
        assert!(usable_text(&enough).is_ok());
    }

    #[tokio::test]
    async fn test_garbage_pdf_bytes_fail_without_panicking_the_caller() {
        let result = extract_text_blocking(
            bytes::Bytes::from_static(b"definitely not a pdf"),
            ResumeFormat::Pdf,
        )
        .await;
        assert!(matches!(
            result,
            Err(ExtractionError::Pdf(_)) | Err(ExtractionError::Panicked(_))
        ));
    }

    #[tokio::test]
    async fn test_docx_round_trip_through_blocking_pool() {
        let bytes = build_docx(&["Jane Doe", "Rust engineer with 6 years of experience"]);
        let text = extract_text_blocking(bytes::Bytes::from(bytes), ResumeFormat::Docx)
            .await
            .unwrap();
        assert!(text.starts_with("Jane Doe\n"));
        assert!(text.contains("6 years of experience"));
    }
}
