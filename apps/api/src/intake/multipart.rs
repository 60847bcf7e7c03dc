//! Multipart form intake shared by `/rank_resumes_upload` and multipart Lambda events.

use axum::extract::multipart::{Multipart, MultipartError};
use bytes::Bytes;
use tracing::debug;

use crate::errors::AppError;
use crate::intake::validation::{
    check_job_description_length, check_resume_count, documents_from_files, top_k_from_text,
};
use crate::intake::{IntakeLimits, RankRequest};

/// One `resumes` file part.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub bytes: Bytes,
}

/// Every form field the ranking surfaces understand.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub job_description: Option<String>,
    pub top_k: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
    pub files: Vec<UploadedFile>,
}

/// Drains the multipart stream. Unknown fields are skipped.
pub async fn collect_form(multipart: &mut Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resumes" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(invalid_multipart)?;
                form.files.push(UploadedFile { filename, bytes });
            }
            "job_description" => form.job_description = Some(field.text().await.map_err(invalid_multipart)?),
            "top_k" => form.top_k = Some(field.text().await.map_err(invalid_multipart)?),
            "s3_bucket" => form.s3_bucket = Some(field.text().await.map_err(invalid_multipart)?),
            "s3_prefix" => form.s3_prefix = Some(field.text().await.map_err(invalid_multipart)?),
            other => debug!("Ignoring form field '{other}'"),
        }
    }

    Ok(form)
}

impl RankRequest {
    /// Validates a `POST /rank_resumes_upload` form.
    pub fn from_upload(form: UploadForm, limits: &IntakeLimits) -> Result<Self, AppError> {
        let job_description = form
            .job_description
            .filter(|jd| !jd.is_empty())
            .ok_or_else(|| AppError::validation("Missing 'job_description' field"))?;
        check_job_description_length(&job_description)?;

        let top_k = top_k_from_text(form.top_k.as_deref(), limits.default_top_k)?;
        check_resume_count(form.files.len(), limits, "No resume files provided")?;

        let (documents, rejected) = documents_from_files(form.files);
        Ok(RankRequest {
            job_description,
            top_k,
            documents,
            rejected,
        })
    }
}

fn invalid_multipart(err: MultipartError) -> AppError {
    AppError::validation(format!("Invalid multipart body: {}", err.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const JD: &str = "Seeking a frontend developer with React and TypeScript, 2 years of experience.";

    fn limits() -> IntakeLimits {
        IntakeLimits {
            max_resumes: 2,
            default_top_k: 10,
        }
    }

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            filename: Some(name.to_string()),
            bytes: Bytes::from_static(b"content"),
        }
    }

    #[test]
    fn test_upload_requires_job_description() {
        let form = UploadForm {
            files: vec![file("a.pdf")],
            ..Default::default()
        };
        assert!(matches!(
            RankRequest::from_upload(form, &limits()),
            Err(AppError::Validation(m)) if m == "Missing 'job_description' field"
        ));
    }

    #[test]
    fn test_upload_requires_files() {
        let form = UploadForm {
            job_description: Some(JD.to_string()),
            ..Default::default()
        };
        assert!(matches!(
            RankRequest::from_upload(form, &limits()),
            Err(AppError::Validation(m)) if m == "No resume files provided"
        ));
    }

    #[test]
    fn test_upload_caps_file_count() {
        let form = UploadForm {
            job_description: Some(JD.to_string()),
            files: vec![file("a.pdf"), file("b.pdf"), file("c.pdf")],
            ..Default::default()
        };
        assert!(matches!(
            RankRequest::from_upload(form, &limits()),
            Err(AppError::Validation(m)) if m == "Too many resumes (maximum 2)"
        ));
    }

    #[test]
    fn test_upload_builds_request() {
        let form = UploadForm {
            job_description: Some(JD.to_string()),
            top_k: Some("1".to_string()),
            files: vec![file("cv.docx"), file("cv.odt")],
            ..Default::default()
        };
        let request = RankRequest::from_upload(form, &limits()).unwrap();
        assert_eq!(request.top_k, 1);
        assert_eq!(request.documents.len(), 1);
        assert_eq!(request.rejected.len(), 1);
        assert_eq!(request.rejected[0].index, 1);
    }
}
