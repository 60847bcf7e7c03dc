//! Validation of ranking requests and decoding of their resume entries.
//!
//! Anything wrong with the request as a whole is an `AppError::Validation` and the
//! batch never starts. Anything wrong with a single resume becomes a `DroppedResume`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::extraction::{ExtractionError, ResumeFormat};
use crate::intake::multipart::UploadedFile;
use crate::intake::{IntakeLimits, RankRequest};
use crate::ranking::{DroppedResume, ResumeDocument};

pub const MIN_JOB_DESCRIPTION_CHARS: usize = 50;

impl RankRequest {
    /// Validates a `POST /rank_resumes` body.
    pub fn from_json(body: &Value, limits: &IntakeLimits) -> Result<Self, AppError> {
        let body = match body.as_object() {
            Some(map) if !map.is_empty() => map,
            _ => return Err(AppError::validation("Request body is empty")),
        };

        let job_description = body
            .get("job_description")
            .ok_or_else(|| AppError::validation("Missing 'job_description' field"))?;
        let resumes = body
            .get("resumes")
            .ok_or_else(|| AppError::validation("Missing 'resumes' field"))?;

        let job_description = job_description_text(job_description)?;
        check_job_description_length(job_description)?;

        let entries = resumes
            .as_array()
            .ok_or_else(|| AppError::validation("'resumes' must be a list"))?;
        check_resume_count(entries.len(), limits, "No resumes provided")?;
        check_entries(entries)?;

        let top_k = top_k_from_json(body.get("top_k"), limits.default_top_k)?;
        let (documents, rejected) = decode_entries(entries);

        Ok(RankRequest {
            job_description: job_description.to_string(),
            top_k,
            documents,
            rejected,
        })
    }
}

pub fn job_description_text(value: &Value) -> Result<&str, AppError> {
    match value.as_str() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AppError::validation(
            "Job description must be a non-empty string",
        )),
    }
}

pub fn check_job_description_length(text: &str) -> Result<(), AppError> {
    if text.trim().chars().count() < MIN_JOB_DESCRIPTION_CHARS {
        return Err(AppError::validation(
            "Job description is too short (minimum 50 characters)",
        ));
    }
    Ok(())
}

/// `empty_message` differs per surface ("No resumes provided", "No resume files provided").
pub fn check_resume_count(
    count: usize,
    limits: &IntakeLimits,
    empty_message: &str,
) -> Result<(), AppError> {
    if count == 0 {
        return Err(AppError::validation(empty_message));
    }
    if count > limits.max_resumes {
        return Err(AppError::validation(format!(
            "Too many resumes (maximum {})",
            limits.max_resumes
        )));
    }
    Ok(())
}

/// Structural checks on every JSON resume entry. Runs before any decoding.
pub fn check_entries(entries: &[Value]) -> Result<(), AppError> {
    for (idx, entry) in entries.iter().enumerate() {
        let entry = entry.as_object().ok_or_else(|| {
            AppError::validation(format!("Resume at index {idx} is not a valid object"))
        })?;
        match entry.get("file_base64") {
            None => {
                return Err(AppError::validation(format!(
                    "Resume at index {idx} missing 'file_base64' field"
                )))
            }
            Some(Value::Null) => {
                return Err(AppError::validation(format!(
                    "Resume at index {idx} has empty 'file_base64'"
                )))
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(AppError::validation(format!(
                    "Resume at index {idx} has empty 'file_base64'"
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// `top_k` from a JSON body: absent or null means the default; otherwise a positive integer.
pub fn top_k_from_json(value: Option<&Value>, default: usize) -> Result<usize, AppError> {
    match value {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v
            .as_u64()
            .filter(|k| *k >= 1)
            .map(|k| k as usize)
            .ok_or_else(|| AppError::validation("'top_k' must be a positive integer")),
    }
}

/// `top_k` from a form field.
pub fn top_k_from_text(value: Option<&str>, default: usize) -> Result<usize, AppError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    let parsed: i64 = raw
        .parse()
        .map_err(|_| AppError::validation("'top_k' must be a valid integer"))?;
    if parsed < 1 {
        return Err(AppError::validation("'top_k' must be a positive integer"));
    }
    Ok(parsed as usize)
}

/// Decodes already-checked JSON entries. Failures are per resume.
pub fn decode_entries(entries: &[Value]) -> (Vec<ResumeDocument>, Vec<DroppedResume>) {
    let mut documents = Vec::with_capacity(entries.len());
    let mut rejected = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let decoded = entry
            .as_object()
            .ok_or_else(|| "not a valid object".to_string())
            .and_then(decode_entry);
        match decoded {
            Ok((bytes, format)) => documents.push(ResumeDocument { index, bytes, format }),
            Err(reason) => rejected.push(DroppedResume { index, reason }),
        }
    }

    (documents, rejected)
}

fn decode_entry(entry: &Map<String, Value>) -> Result<(Bytes, ResumeFormat), String> {
    let format = match entry.get("file_type") {
        None | Some(Value::Null) => ResumeFormat::default(),
        Some(Value::String(declared)) => ResumeFormat::parse(declared).map_err(|e| e.to_string())?,
        Some(other) => return Err(format!("'file_type' must be a string, got {other}")),
    };

    let encoded = entry
        .get("file_base64")
        .and_then(Value::as_str)
        .ok_or_else(|| "'file_base64' must be a string".to_string())?;

    let bytes = decode_base64(encoded).map_err(|e| e.to_string())?;
    if bytes.is_empty() {
        return Err("empty file content".to_string());
    }
    Ok((bytes, format))
}

/// Standard base64, tolerating a `data:...;base64,` prefix and embedded line breaks.
pub fn decode_base64(encoded: &str) -> Result<Bytes, ExtractionError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(Bytes::from(STANDARD.decode(compact)?))
}

/// Turns uploaded file parts into documents. Index is the part's position among the
/// `resumes` parts.
pub fn documents_from_files(files: Vec<UploadedFile>) -> (Vec<ResumeDocument>, Vec<DroppedResume>) {
    let mut documents = Vec::with_capacity(files.len());
    let mut rejected = Vec::new();

    for (index, file) in files.into_iter().enumerate() {
        let filename = file.filename.unwrap_or_default();
        if filename.trim().is_empty() {
            rejected.push(DroppedResume {
                index,
                reason: "empty file".to_string(),
            });
            continue;
        }
        let Some(format) = ResumeFormat::from_filename(&filename) else {
            rejected.push(DroppedResume {
                index,
                reason: format!("unsupported file type - {filename}"),
            });
            continue;
        };
        if file.bytes.is_empty() {
            rejected.push(DroppedResume {
                index,
                reason: format!("empty file content - {filename}"),
            });
            continue;
        }
        documents.push(ResumeDocument {
            index,
            bytes: file.bytes,
            format,
        });
    }

    (documents, rejected)
}
