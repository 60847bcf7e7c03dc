use std::time::Instant;

use axum::{
    body::to_bytes,
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, Request, State},
    Json,
};
use serde_json::Value;

use crate::errors::AppError;
use crate::intake::lambda::{handle_event, LambdaResponse};
use crate::intake::multipart::collect_form;
use crate::intake::{run_ranking, IntakeLimits, RankRequest, RankResponse};
use crate::state::AppState;

/// POST /rank_resumes
pub async fn handle_rank_resumes(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RankResponse>, AppError> {
    let started = Instant::now();
    let Json(body) = body.map_err(|e| AppError::validation(e.body_text()))?;

    let request = RankRequest::from_json(&body, &IntakeLimits::from(&state.config))?;
    let response = run_ranking(&state.engine, request, started).await?;
    Ok(Json(response))
}

/// POST /rank_resumes_upload
pub async fn handle_rank_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RankResponse>, AppError> {
    let started = Instant::now();
    let mut multipart = multipart.map_err(|e| AppError::validation(e.body_text()))?;

    let form = collect_form(&mut multipart).await?;
    let request = RankRequest::from_upload(form, &IntakeLimits::from(&state.config))?;
    let response = run_ranking(&state.engine, request, started).await?;
    Ok(Json(response))
}

/// POST /lambda
///
/// Always 200 at the HTTP level; the event outcome is in the envelope's `statusCode`.
pub async fn handle_lambda(State(state): State<AppState>, request: Request) -> Json<LambdaResponse> {
    let (parts, body) = request.into_parts();

    let event = match to_bytes(body, state.config.max_upload_bytes).await {
        Ok(bytes) => serde_json::from_slice::<Value>(&bytes)
            .map_err(|e| AppError::validation(format!("Invalid event JSON: {e}"))),
        Err(e) => Err(AppError::validation(format!("Unable to read event body: {e}"))),
    };

    match event {
        Ok(event) => Json(handle_event(&state, event, &parts.extensions).await),
        Err(e) => Json(LambdaResponse::from_error(&e)),
    }
}
