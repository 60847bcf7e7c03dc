//! Lambda-style entry point.
//!
//! Accepts an API Gateway proxy event (JSON or base64 multipart body) or a direct
//! invocation whose event is the payload itself. When no resumes are supplied and a
//! bucket is named, resumes are pulled from S3. Always answers with a
//! `{statusCode, headers, body}` envelope whose body is a JSON string.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{FromRequest, Multipart};
use axum::http::{header::CONTENT_TYPE, Extensions, Request};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::errors::AppError;
use crate::intake::multipart::collect_form;
use crate::intake::storage::{download_resumes, list_resume_keys};
use crate::intake::validation::{
    check_entries, check_resume_count, decode_entries, documents_from_files, job_description_text,
    top_k_from_json, top_k_from_text, MIN_JOB_DESCRIPTION_CHARS,
};
use crate::intake::{run_ranking, IntakeLimits, RankRequest, RankResponse};
use crate::ranking::{DroppedResume, ResumeDocument};
use crate::state::AppState;

/// Filename assumed for a multipart resume part that carries none.
const FALLBACK_FILENAME: &str = "unknown.pdf";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl LambdaResponse {
    fn json(status_code: u16, body: &impl Serialize) -> Self {
        let body = serde_json::to_string(body).unwrap_or_else(|e| {
            error!("Failed to serialize Lambda response body: {e}");
            r#"{"success":false,"error":"An internal server error occurred","code":"INTERNAL_ERROR"}"#
                .to_string()
        });
        Self {
            status_code,
            headers: BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body,
        }
    }

    pub fn from_error(err: &AppError) -> Self {
        match err {
            AppError::Internal(e) => error!("Lambda handler error: {e:?}"),
            other => info!("Lambda request rejected: {other}"),
        }
        Self::json(err.status().as_u16(), &err.body())
    }
}

/// Resumes and options pulled out of an event, before request-level validation.
#[derive(Debug, Default)]
struct EventPayload {
    job_description: Option<Value>,
    top_k: usize,
    s3_bucket: Option<String>,
    s3_prefix: String,
    documents: Vec<ResumeDocument>,
    rejected: Vec<DroppedResume>,
}

impl EventPayload {
    fn supplied(&self) -> usize {
        self.documents.len() + self.rejected.len()
    }
}

/// Handles one event. `extensions` come from the carrying HTTP request and keep the
/// configured body limit in force for multipart parsing.
pub async fn handle_event(state: &AppState, event: Value, extensions: &Extensions) -> LambdaResponse {
    let started = Instant::now();
    match rank_event(state, event, extensions, started).await {
        Ok(response) => LambdaResponse::json(200, &response),
        Err(e) => LambdaResponse::from_error(&e),
    }
}

async fn rank_event(
    state: &AppState,
    event: Value,
    extensions: &Extensions,
    started: Instant,
) -> Result<RankResponse, AppError> {
    let limits = IntakeLimits::from(&state.config);
    let mut payload = match multipart_content_type(&event) {
        Some(content_type) => parse_multipart_event(&event, &content_type, extensions, &limits).await?,
        None => parse_json_event(event, &limits)?,
    };

    let job_description = payload
        .job_description
        .take()
        .ok_or_else(|| AppError::validation("Missing required field: job_description"))?;

    let bucket = payload
        .s3_bucket
        .clone()
        .or_else(|| state.config.storage.resume_bucket.clone());
    if let (Some(bucket), 0) = (bucket, payload.supplied()) {
        // One key past the cap is enough to reject the request before any download.
        let keys =
            list_resume_keys(&state.s3, &bucket, &payload.s3_prefix, limits.max_resumes + 1).await?;
        check_resume_count(
            keys.len(),
            &limits,
            "No resumes provided (uploaded or found in S3)",
        )?;
        let stored = download_resumes(&state.s3, &bucket, keys).await?;
        payload.documents = stored
            .into_iter()
            .enumerate()
            .map(|(index, resume)| {
                debug!(resume_index = index, key = %resume.key, "Queued resume from S3");
                ResumeDocument {
                    index,
                    bytes: resume.bytes,
                    format: resume.format,
                }
            })
            .collect();
    }

    check_resume_count(
        payload.supplied(),
        &limits,
        "No resumes provided (uploaded or found in S3)",
    )?;

    let job_description = job_description_text(&job_description)?;
    if job_description.trim().chars().count() < MIN_JOB_DESCRIPTION_CHARS {
        return Err(AppError::validation(
            "Job description must be at least 50 characters",
        ));
    }

    info!("Processing {} resumes for Lambda request", payload.supplied());

    let request = RankRequest {
        job_description: job_description.to_string(),
        top_k: payload.top_k,
        documents: payload.documents,
        rejected: payload.rejected,
    };
    run_ranking(&state.engine, request, started).await
}

/// The event's content type when it carries a multipart body. Header names are
/// matched case-insensitively.
fn multipart_content_type(event: &Value) -> Option<String> {
    event
        .get("headers")
        .and_then(Value::as_object)?
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .and_then(|(_, value)| value.as_str())
        .filter(|value| value.to_ascii_lowercase().contains("multipart/form-data"))
        .map(str::to_string)
}

async fn parse_multipart_event(
    event: &Value,
    content_type: &str,
    extensions: &Extensions,
    limits: &IntakeLimits,
) -> Result<EventPayload, AppError> {
    let raw = event.get("body").and_then(Value::as_str).unwrap_or_default();
    let is_base64 = event
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let body = if is_base64 {
        STANDARD
            .decode(raw)
            .map_err(|e| AppError::validation(format!("Invalid base64 body: {e}")))?
    } else {
        raw.as_bytes().to_vec()
    };

    let mut request = Request::builder()
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {e}")))?;
    *request.extensions_mut() = extensions.clone();

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e.body_text())))?;
    let mut form = collect_form(&mut multipart).await?;

    for file in &mut form.files {
        file.filename.get_or_insert_with(|| FALLBACK_FILENAME.to_string());
    }
    let (documents, rejected) = documents_from_files(form.files);

    Ok(EventPayload {
        job_description: form.job_description.map(Value::String),
        top_k: top_k_from_text(form.top_k.as_deref(), limits.default_top_k)?,
        s3_bucket: form.s3_bucket.filter(|b| !b.trim().is_empty()),
        s3_prefix: form.s3_prefix.unwrap_or_default(),
        documents,
        rejected,
    })
}

/// API Gateway events carry the payload in `body` (a JSON string or an object);
/// direct invocations pass the payload as the event itself.
fn parse_json_event(event: Value, limits: &IntakeLimits) -> Result<EventPayload, AppError> {
    let body = match event {
        Value::Object(mut map) if map.contains_key("body") => match map.remove("body") {
            Some(Value::String(text)) => serde_json::from_str(&text)
                .map_err(|e| AppError::validation(format!("Invalid JSON body: {e}")))?,
            Some(other) => other,
            None => Value::Null,
        },
        other => other,
    };

    let Value::Object(mut body) = body else {
        return Err(AppError::validation("Request body must be a JSON object"));
    };

    let entries = match body.remove("resumes") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(AppError::validation("'resumes' must be a list")),
    };
    check_entries(&entries)?;
    let (documents, rejected) = decode_entries(&entries);

    Ok(EventPayload {
        top_k: top_k_from_json(body.get("top_k"), limits.default_top_k)?,
        s3_bucket: string_field(&body, "s3_bucket"),
        s3_prefix: string_field(&body, "s3_prefix").unwrap_or_default(),
        job_description: body.remove("job_description"),
        documents,
        rejected,
    })
}

fn string_field(body: &Map<String, Value>, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::build_docx;
    use crate::state::test_state;
    use serde_json::json;

    const JD: &str = "We need a machine learning engineer with PyTorch and Python, \
        3 years of experience training production models.";

    fn docx_resume() -> Vec<u8> {
        build_docx(&[
            "Samira Haddad",
            "Machine learning engineer with 4 years of experience in PyTorch and Python.",
            "Master of Science, Computer Science",
        ])
    }

    fn parse_body(response: &LambdaResponse) -> Value {
        serde_json::from_str(&response.body).unwrap()
    }

    #[test]
    fn test_content_type_lookup_is_case_insensitive() {
        let event = json!({"headers": {"Content-TYPE": "multipart/form-data; boundary=xyz"}});
        assert_eq!(
            multipart_content_type(&event).as_deref(),
            Some("multipart/form-data; boundary=xyz")
        );
        assert_eq!(multipart_content_type(&json!({"headers": {"content-type": "application/json"}})), None);
        assert_eq!(multipart_content_type(&json!({})), None);
    }

    #[test]
    fn test_json_event_variants() {
        let limits = IntakeLimits {
            max_resumes: 5,
            default_top_k: 4,
        };
        let payload = json!({"job_description": JD, "resumes": [{"file_base64": "aGVsbG8="}]});

        let direct = parse_json_event(payload.clone(), &limits).unwrap();
        assert_eq!(direct.documents.len(), 1);
        assert_eq!(direct.top_k, 4);

        let as_string = json!({"body": payload.to_string()});
        assert_eq!(parse_json_event(as_string, &limits).unwrap().documents.len(), 1);

        let as_object = json!({"body": payload});
        assert_eq!(parse_json_event(as_object, &limits).unwrap().documents.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_job_description() {
        let state = test_state();
        let response = handle_event(&state, json!({"resumes": []}), &Extensions::new()).await;
        assert_eq!(response.status_code, 400);
        assert_eq!(parse_body(&response)["error"], "Missing required field: job_description");
    }

    #[tokio::test]
    async fn test_no_resumes_and_no_bucket() {
        let state = test_state();
        let response = handle_event(&state, json!({"job_description": JD}), &Extensions::new()).await;
        assert_eq!(response.status_code, 400);
        assert_eq!(
            parse_body(&response)["error"],
            "No resumes provided (uploaded or found in S3)"
        );
    }

    #[tokio::test]
    async fn test_short_job_description() {
        let state = test_state();
        let event = json!({"job_description": "ML engineer", "resumes": [{"file_base64": "aGVsbG8="}]});
        let response = handle_event(&state, event, &Extensions::new()).await;
        assert_eq!(response.status_code, 400);
        assert_eq!(
            parse_body(&response)["error"],
            "Job description must be at least 50 characters"
        );
    }

    #[tokio::test]
    async fn test_json_event_ranks_resumes() {
        let state = test_state();
        let event = json!({
            "body": json!({
                "job_description": JD,
                "resumes": [{"file_base64": STANDARD.encode(docx_resume()), "file_type": "docx"}],
                "top_k": 3,
            }).to_string(),
        });

        let response = handle_event(&state, event, &Extensions::new()).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers["Content-Type"], "application/json");

        let body = parse_body(&response);
        assert_eq!(body["success"], true);
        assert_eq!(body["top_candidates"], 1);
        assert_eq!(body["ranked_resumes"][0]["name"], "Samira Haddad");
        assert_eq!(body["ranked_resumes"][0]["has_degree"], true);
    }

    #[tokio::test]
    async fn test_multipart_event_ranks_resumes() {
        let state = test_state();
        let boundary = "lambda-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"job_description\"\r\n\r\n{JD}\r\n\
                 --{boundary}\r\nContent-Disposition: form-data; name=\"top_k\"\r\n\r\n2\r\n\
                 --{boundary}\r\nContent-Disposition: form-data; name=\"resumes\"; filename=\"samira.docx\"\r\n\
                 Content-Type: application/vnd.openxmlformats-officedocument.wordprocessingml.document\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&docx_resume());
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let event = json!({
            "headers": {"content-type": format!("multipart/form-data; boundary={boundary}")},
            "isBase64Encoded": true,
            "body": STANDARD.encode(&body),
        });

        let response = handle_event(&state, event, &Extensions::new()).await;
        assert_eq!(response.status_code, 200, "body: {}", response.body);
        let body = parse_body(&response);
        assert_eq!(body["total_resumes_processed"], 1);
        assert_eq!(body["ranked_resumes"][0]["index"], 0);
    }
}
