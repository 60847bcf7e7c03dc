pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::intake::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/rank_resumes", post(handlers::handle_rank_resumes))
        .route("/rank_resumes_upload", post(handlers::handle_rank_upload))
        .route("/lambda", post(handlers::handle_lambda))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::build_docx;
    use crate::state::test_state;
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const JD: &str = "Backend engineer needed: Python, Django and PostgreSQL, with 5 years of \
        experience running web services in production.";

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn strong_resume() -> Vec<u8> {
        build_docx(&[
            "Dana Whitfield",
            "dana.whitfield@example.com",
            "Backend engineer with 7 years of experience in Python, Django and PostgreSQL.",
            "Bachelor of Engineering, Technical University",
        ])
    }

    fn weak_resume() -> Vec<u8> {
        build_docx(&[
            "Omar Bakri",
            "Landscape gardener maintaining parks, hedges and flower beds for the city council.",
        ])
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "Resume Ranking API");
    }

    #[tokio::test]
    async fn test_empty_resume_list_is_rejected() {
        let app = build_router(test_state());
        let (status, body) =
            send(app, post_json("/rank_resumes", &json!({"job_description": JD, "resumes": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No resumes provided");
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let app = build_router(test_state());
        let request = Request::builder()
            .method("POST")
            .uri("/rank_resumes")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_rank_resumes_orders_candidates() {
        let app = build_router(test_state());
        let payload = json!({
            "job_description": JD,
            "resumes": [
                {"file_base64": STANDARD.encode(weak_resume()), "file_type": "docx"},
                {"file_base64": STANDARD.encode(strong_resume()), "file_type": "docx"},
            ],
            "top_k": 5,
        });

        let (status, body) = send(app, post_json("/rank_resumes", &payload)).await;
        assert_eq!(status, StatusCode::OK, "body: {body}");
        assert_eq!(body["success"], true);
        assert_eq!(body["total_resumes_processed"], 2);
        assert_eq!(body["top_candidates"], 2);

        let best = &body["ranked_resumes"][0];
        assert_eq!(best["index"], 1);
        assert_eq!(best["name"], "Dana Whitfield");
        assert_eq!(best["email"], "dana.whitfield@example.com");
        assert_eq!(best["years_of_experience"], 7.0);
        assert_eq!(best["score_breakdown"]["skills_match"], 100.0);
        assert_eq!(best["score_breakdown"]["experience_match"], 100.0);
        assert!(best["matched_skills"]
            .as_array()
            .unwrap()
            .contains(&json!("Postgresql")));
        assert!(body["processing_time_seconds"].as_f64().is_some());
    }

    #[tokio::test]
    async fn test_unreadable_resumes_yield_empty_batch() {
        let app = build_router(test_state());
        let payload = json!({
            "job_description": JD,
            "resumes": [
                {"file_base64": STANDARD.encode(build_docx(&["Too short"])), "file_type": "docx"},
                {"file_base64": STANDARD.encode(build_docx(&["0123456789"])), "file_type": "docx"},
            ],
        });

        let (status, body) = send(app, post_json("/rank_resumes", &payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "EMPTY_BATCH");
        assert_eq!(
            body["error"],
            "No valid resumes could be processed. Please check file formats and content."
        );
    }

    #[tokio::test]
    async fn test_upload_ranks_files() {
        let app = build_router(test_state());
        let boundary = "upload-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"job_description\"\r\n\r\n{JD}\r\n\
                 --{boundary}\r\nContent-Disposition: form-data; name=\"top_k\"\r\n\r\n1\r\n"
            )
            .as_bytes(),
        );
        for (name, bytes) in [("weak.docx", weak_resume()), ("strong.docx", strong_resume())] {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"resumes\"; filename=\"{name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(&bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/rank_resumes_upload")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK, "body: {body}");
        assert_eq!(body["total_resumes_processed"], 2);
        assert_eq!(body["top_candidates"], 1);
        assert_eq!(body["ranked_resumes"][0]["index"], 1);
    }

    #[tokio::test]
    async fn test_upload_without_multipart_is_rejected() {
        let app = build_router(test_state());
        let (status, body) = send(app, post_json("/rank_resumes_upload", &json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_lambda_route_wraps_envelope() {
        let app = build_router(test_state());
        let event = json!({"body": json!({"job_description": JD}).to_string()});
        let (status, envelope) = send(app, post_json("/lambda", &event)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope["statusCode"], 400);
        let inner: Value = serde_json::from_str(envelope["body"].as_str().unwrap()).unwrap();
        assert_eq!(inner["error"], "No resumes provided (uploaded or found in S3)");
    }
}
