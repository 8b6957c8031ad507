use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use convertly_core::models::{BatchConvertRequest, BatchConvertResponse};
use convertly_core::AppError;
use std::sync::Arc;
use validator::Validate;

/// Runs every conversion to completion inside the request, one file at a time.
#[utoipa::path(
    post,
    path = "/convert/batch",
    tag = "conversions",
    request_body = BatchConvertRequest,
    responses(
        (status = 200, description = "One result per file, in request order", body = BatchConvertResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(files = request.file_ids.len(), target = %request.target_format))]
pub async fn convert_batch(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<BatchConvertRequest>,
) -> Result<Json<BatchConvertResponse>, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let response = state
        .conversions
        .orchestrator
        .convert_batch(
            &request.file_ids,
            &request.target_format,
            request.options.as_ref(),
            &state.shutdown,
        )
        .await?;

    Ok(Json(response))
}
