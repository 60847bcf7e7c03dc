//! Server-side resume sourcing from an S3 bucket.
//!
//! Listing and downloading are separate steps so a caller can check the key count
//! against its request cap before any object body is fetched.

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::extraction::ResumeFormat;

#[derive(Debug, Clone, PartialEq)]
pub struct ResumeKey {
    pub key: String,
    pub format: ResumeFormat,
}

#[derive(Debug, Clone)]
pub struct StoredResume {
    pub key: String,
    pub bytes: Bytes,
    pub format: ResumeFormat,
}

/// Format of an object key, or `None` for folders and non-resume files.
pub fn resume_key_format(key: &str) -> Option<ResumeFormat> {
    if key.ends_with('/') {
        return None;
    }
    ResumeFormat::from_filename(key)
}

/// Appends resume keys from one listing page to `found` until it holds `limit` keys.
/// Returns true once the limit is reached, so listing can stop.
fn collect_resume_keys<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    found: &mut Vec<ResumeKey>,
    limit: usize,
) -> bool {
    for key in keys {
        if found.len() >= limit {
            break;
        }
        match resume_key_format(key) {
            Some(format) => found.push(ResumeKey {
                key: key.to_string(),
                format,
            }),
            None => debug!("Skipping non-resume object {key}"),
        }
    }
    found.len() >= limit
}

/// Lists `.pdf`/`.docx` keys under `prefix` in listing order, stopping after `limit` keys.
pub async fn list_resume_keys(
    s3: &S3Client,
    bucket: &str,
    prefix: &str,
    limit: usize,
) -> Result<Vec<ResumeKey>, AppError> {
    info!("Listing resumes in S3 bucket: {bucket}, prefix: {prefix}");

    let mut pages = s3
        .list_objects_v2()
        .bucket(bucket)
        .prefix(prefix)
        .into_paginator()
        .send();

    let mut found = Vec::new();
    while let Some(page) = pages.next().await {
        let page = page.map_err(|e| AppError::Storage(DisplayErrorContext(&e).to_string()))?;
        let keys = page.contents().iter().filter_map(|object| object.key());
        if collect_resume_keys(keys, &mut found, limit) {
            debug!("Stopped listing s3://{bucket}/{prefix} after {limit} resume keys");
            break;
        }
    }

    Ok(found)
}

/// Downloads the listed objects, in order.
pub async fn download_resumes(
    s3: &S3Client,
    bucket: &str,
    keys: Vec<ResumeKey>,
) -> Result<Vec<StoredResume>, AppError> {
    let mut resumes = Vec::with_capacity(keys.len());
    for ResumeKey { key, format } in keys {
        info!("Downloading {key} from S3");
        let response = s3
            .get_object()
            .bucket(bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| AppError::Storage(DisplayErrorContext(&e).to_string()))?;
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("reading {key}: {e}")))?
            .into_bytes();

        resumes.push(StoredResume { key, bytes, format });
    }

    info!("Fetched {} resumes from s3://{bucket}", resumes.len());
    Ok(resumes)
}
